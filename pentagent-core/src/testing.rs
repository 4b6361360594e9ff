//! Test doubles: a scripted language model and in-process tool backends.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration tests under `tests/`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::{FnTool, McpServer, McpToolResult};
use crate::providers::{CompletionRequest, CompletionResponse, LlmProvider, TokenUsage};
use crate::state::{MetricsTracker, estimate_tokens};
use crate::tools::known_operations;
use crate::{Error, Result};

struct Rule {
    needle: String,
    replies: VecDeque<String>,
}

/// Provider that answers from a script.
///
/// Each request's transcript is matched against the rules in insertion
/// order; the first rule whose needle occurs in it supplies the reply. A rule
/// with several replies hands them out in order and repeats the last one.
pub struct ScriptedProvider {
    default_reply: String,
    rules: Mutex<Vec<Rule>>,
    prompts: Mutex<Vec<String>>,
    fail_after: Option<usize>,
    metrics: MetricsTracker,
}

impl ScriptedProvider {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            rules: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            fail_after: None,
            metrics: MetricsTracker::new(),
        }
    }

    pub fn reply_when(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.reply_sequence(needle, [reply.into()])
    }

    pub fn reply_sequence<I, S>(self, needle: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.into(),
            replies: replies.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Fail every call after the first `calls` succeed
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Transcripts of every request received, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of requests whose transcript contains `needle`
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    fn reply_for(&self, transcript: &str) -> String {
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if !transcript.contains(&rule.needle) {
                continue;
            }
            if rule.replies.len() > 1 {
                return rule.replies.pop_front().unwrap_or_default();
            }
            return rule.replies.front().cloned().unwrap_or_default();
        }
        self.default_reply.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let transcript = request.transcript();
        let call_index = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(transcript.clone());
            prompts.len() - 1
        };

        if let Some(limit) = self.fail_after
            && call_index >= limit
        {
            return Err(Error::Provider("scripted provider failure".into()));
        }

        let content = self.reply_for(&transcript);
        let usage = TokenUsage {
            input_tokens: estimate_tokens(&transcript),
            output_tokens: estimate_tokens(&content),
        };
        self.metrics
            .record_tokens(usage.input_tokens, usage.output_tokens);
        Ok(CompletionResponse { content, usage })
    }

    fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }
}

/// Backend exposing `name`'s known operations, each replying
/// `"<operation> <arguments>"`
pub async fn echo_backend(name: &str) -> Arc<McpServer> {
    let server = Arc::new(McpServer::new(name, "0.0.0-test"));
    for op in known_operations(name) {
        let op_name = op.to_string();
        server
            .register_tool(Arc::new(FnTool::new(*op, "echo", move |args: Value| {
                let op_name = op_name.clone();
                async move { Ok(McpToolResult::text(format!("{} {}", op_name, args))) }
            })))
            .await;
    }
    server
}

/// Backend whose operations reply with fixed text. Operations not listed
/// report an in-band error.
pub async fn scripted_backend(name: &str, outputs: &[(&str, &str)]) -> Arc<McpServer> {
    let server = Arc::new(McpServer::new(name, "0.0.0-test"));
    for op in known_operations(name) {
        let output = outputs
            .iter()
            .find(|(listed, _)| listed == op)
            .map(|(_, out)| out.to_string());
        server
            .register_tool(Arc::new(FnTool::new(*op, "scripted", move |_args: Value| {
                let output = output.clone();
                async move {
                    Ok(match output {
                        Some(text) => McpToolResult::text(text),
                        None => McpToolResult::error("operation failed"),
                    })
                }
            })))
            .await;
    }
    server
}

/// Backend whose operations sleep for `delay` before replying
pub async fn slow_backend(name: &str, delay: Duration) -> Arc<McpServer> {
    let server = Arc::new(McpServer::new(name, "0.0.0-test"));
    for op in known_operations(name) {
        server
            .register_tool(Arc::new(FnTool::new(*op, "slow", move |_args: Value| async move {
                tokio::time::sleep(delay).await;
                Ok(McpToolResult::text("done"))
            })))
            .await;
    }
    server
}
