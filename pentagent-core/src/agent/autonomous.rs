//! Autonomous think → act → observe loop.
//!
//! A run triages the input, plans steps, then iterates until one of the stop
//! conditions fires:
//!
//! 1. the wall-clock budget is spent
//! 2. the latest (action, result) pair repeats inside the repetition window
//! 3. the model answers STOP to the continue check
//! 4. the step ceiling is reached
//!
//! The report step always runs afterwards unless the run was cancelled.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::capability::{ToolBox, dispatch};
use crate::config::AgentLoopConfig;
use crate::decision::DecisionStep;
use crate::decision::parse::{
    extract_url, indicates_xss, mentions_xss, missing_command, parse_plan_steps,
    parse_tool_command, substitute_query_param, wants_investigation, wants_stop,
};
use crate::prompts::Prompts;
use crate::providers::LlmProvider;
use crate::state::AgentSession;
use crate::state::session::truncate;
use crate::{Error, Result};

/// Reflected-XSS payloads, tried front to back
pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert(1)</script>",
    "\" onmouseover=alert(1) \"",
    "'><img src=x onerror=alert(1)>",
    "<svg/onload=alert(1)>",
    "<body onload=alert(1)>",
    "<iframe src=javascript:alert(1)>",
    "<math href=\"javascript:alert(1)\">CLICK",
];

/// Page characters shown to the payload analysis
const ANALYSIS_CHARS: usize = 4_000;

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimeBudget,
    Repetition,
    ModelStop,
    StepLimit,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TimeBudget => "time budget exhausted",
            Self::Repetition => "repeated action detected",
            Self::ModelStop => "model requested stop",
            Self::StepLimit => "step limit reached",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Completed investigation
#[derive(Debug, Clone)]
pub struct Investigation {
    pub session: AgentSession,
    pub stop_reason: StopReason,
    /// `None` only when cancelled
    pub report: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Seconds spent in the loop
    pub duration: f64,
}

/// Result of one agent run
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// The input was conversational and got a single reply
    Chat { reply: String },
    Investigation(Box<Investigation>),
}

/// Bounded autonomous pentesting agent
pub struct AutonomousAgent {
    decision: DecisionStep,
    prompts: Prompts,
    tools: ToolBox,
    config: AgentLoopConfig,
}

impl AutonomousAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolBox, config: &AgentLoopConfig) -> Self {
        Self {
            decision: DecisionStep::new(provider),
            prompts: Prompts::default(),
            tools,
            config: config.clone(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Handle one input end to end
    pub async fn run(
        &self,
        input: &str,
        job_id: &str,
        cancel: CancellationToken,
    ) -> Result<AgentOutcome> {
        let span = info_span!("agent", job_id = %job_id);
        async move {
            if !guarded(&cancel, self.should_investigate(input)).await? {
                info!("Input is conversational");
                let reply = guarded(&cancel, self.pirate_reply(input)).await?;
                return Ok(AgentOutcome::Chat { reply });
            }

            let steps = guarded(&cancel, self.plan(input)).await?;
            info!(steps = steps.len(), "Plan ready");
            let mut session = AgentSession::new(input, steps)
                .with_repetition_window(self.config.repetition_window);

            let started_at = Utc::now();
            let started = Instant::now();
            let mut stop_reason = tokio::select! {
                biased;
                _ = cancel.cancelled() => StopReason::Cancelled,
                result = self.investigate(&mut session, started) => result?,
            };
            let duration = started.elapsed().as_secs_f64();
            info!(reason = %stop_reason, iterations = session.history.len(), "Loop finished");

            let report = if stop_reason == StopReason::Cancelled {
                warn!("Investigation cancelled, skipping report");
                None
            } else {
                match guarded(&cancel, self.report(&session)).await {
                    Ok(report) => Some(report),
                    Err(Error::Cancelled) => {
                        warn!("Cancelled before the report, skipping it");
                        stop_reason = StopReason::Cancelled;
                        None
                    }
                    Err(e) => return Err(e),
                }
            };

            Ok(AgentOutcome::Investigation(Box::new(Investigation {
                session,
                stop_reason,
                report,
                started_at,
                duration,
            })))
        }
        .instrument(span)
        .await
    }

    /// Triage: only an explicit INVESTIGATE reply starts an investigation
    pub async fn should_investigate(&self, input: &str) -> Result<bool> {
        let prompt = self.prompts.agent_triage.render(&[("input", input)]);
        let reply = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        Ok(wants_investigation(&reply))
    }

    async fn pirate_reply(&self, input: &str) -> Result<String> {
        let prompt = self.prompts.agent_pirate.render(&[("input", input)]);
        self.decision.ask(&self.prompts.system.prompt, &prompt).await
    }

    /// Break the goal into steps
    pub async fn plan(&self, goal: &str) -> Result<Vec<String>> {
        let prompt = self.prompts.agent_plan.render(&[("goal", goal)]);
        let reply = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        Ok(parse_plan_steps(&reply))
    }

    async fn investigate(&self, session: &mut AgentSession, started: Instant) -> Result<StopReason> {
        let budget = Duration::from_secs(self.config.time_budget_secs);
        let mut iteration = 0;

        loop {
            let step = session.current_step(iteration).to_string();
            debug!(iteration, step = %step, "Iteration");

            if session.probe_url.is_none()
                && mentions_xss(&step)
                && let Some(url) = xss_target_url(&step, session)
            {
                info!(url = %url, payloads = XSS_PAYLOADS.len(), "Starting XSS probe");
                session.start_probe(url, XSS_PAYLOADS);
            }

            if let Some(payload) = session.next_payload() {
                self.probe(&payload, session).await?;
            } else {
                let thought = self.think(&step, session).await?;
                self.act(&thought, session).await;
            }
            iteration += 1;

            if started.elapsed() >= budget {
                warn!(budget_secs = budget.as_secs(), "Time budget exhausted");
                return Ok(StopReason::TimeBudget);
            }
            if session.is_repeating() {
                warn!(action = ?session.last_action, "Repeated action detected");
                return Ok(StopReason::Repetition);
            }
            if self.model_says_stop(session).await? {
                info!("Model requested stop");
                return Ok(StopReason::ModelStop);
            }
            if iteration >= self.config.max_steps {
                info!(max_steps = self.config.max_steps, "Step limit reached");
                return Ok(StopReason::StepLimit);
            }
        }
    }

    async fn think(&self, step: &str, session: &AgentSession) -> Result<String> {
        let rendered = session.render();
        let prompt = self
            .prompts
            .agent_think
            .render(&[("step", step), ("session", &rendered)]);
        let thought = self
            .decision
            .ask(&self.prompts.agent_system.prompt, &prompt)
            .await?;
        debug!(thought = %thought.trim(), "Thought");
        Ok(thought)
    }

    /// Carry out the tool line in `thought`, record it, and return the final
    /// observation. A missing program triggers one install and one retry.
    async fn act(&self, thought: &str, session: &mut AgentSession) -> String {
        let Some((name, argument)) = parse_tool_command(thought) else {
            let observation = json!({ "error": "No tool/action specified" }).to_string();
            session.record(thought, "none", observation.clone());
            return observation;
        };
        let action = format!("{}: {}", name, argument);

        let Some(tool) = self.tools.get(&name).cloned() else {
            let observation = json!({
                "error": format!("Tool {} not found", name),
                "available": self.tools.names(),
            })
            .to_string();
            session.record(thought, action, observation.clone());
            return observation;
        };

        info!(tool = %name, argument = %argument, "Action");
        let observation = observe(dispatch(tool.as_ref(), &argument).await);
        session.record(thought, action.clone(), observation.clone());

        if let Some(program) = missing_command(&observation)
            && let Some(install) = tool.install_command(&program)
        {
            info!(program = %program, "Installing missing program and retrying");
            let installed = observe(dispatch(tool.as_ref(), &install).await);
            session.record(
                format!("Install missing program {}", program),
                format!("{}: {}", name, install),
                installed,
            );

            let retry = observe(dispatch(tool.as_ref(), &argument).await);
            session.record(
                format!("Retry after installing {}", program),
                action,
                retry.clone(),
            );
            return retry;
        }
        observation
    }

    /// One payload of the active probe: browse, analyse, record a hit
    async fn probe(&self, payload: &str, session: &mut AgentSession) -> Result<()> {
        let base = session.probe_url.clone().unwrap_or_default();
        let url = substitute_query_param(&base, payload);
        let thought = format!("Use WebBrowserTool: browse {}", url);
        let page = self.act(&thought, session).await;

        let content = truncate(&page, ANALYSIS_CHARS);
        let prompt = self.prompts.xss_analysis.render(&[
            ("url", &url),
            ("payload", payload),
            ("content", &content),
        ]);
        let analysis = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        debug!(payload, analysis = %analysis.trim(), "Payload analysis");

        if indicates_xss(&analysis) {
            info!(url = %url, payload, "Reflected XSS found");
            session
                .findings
                .push(format!("Reflected XSS at {} with payload {}", url, payload));
            session.finish_probe();
        }
        Ok(())
    }

    /// CONTINUE/STOP check over the whole session
    async fn model_says_stop(&self, session: &AgentSession) -> Result<bool> {
        let rendered = session.render();
        let prompt = self
            .prompts
            .agent_stop
            .render(&[("goal", &session.goal), ("session", &rendered)]);
        let reply = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        debug!(reply = %reply.trim(), "Continue check");
        Ok(wants_stop(&reply))
    }

    async fn report(&self, session: &AgentSession) -> Result<String> {
        let history = session.render();
        let findings = if session.findings.is_empty() {
            "none".to_string()
        } else {
            session
                .findings
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = self.prompts.agent_report.render(&[
            ("goal", &session.goal),
            ("history", &history),
            ("findings", &findings),
        ]);
        self.decision.ask(&self.prompts.system.prompt, &prompt).await
    }
}

impl fmt::Debug for AutonomousAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutonomousAgent")
            .field("decision", &self.decision)
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

/// URL an XSS step should probe: its own, else the first one in the plan,
/// else the goal's
fn xss_target_url(step: &str, session: &AgentSession) -> Option<String> {
    extract_url(step)
        .or_else(|| session.steps.iter().find_map(|s| extract_url(s)))
        .or_else(|| extract_url(&session.goal))
}

/// Tool outcome as observation text
fn observe(result: Result<String>) -> String {
    match result {
        Ok(text) if text.trim().is_empty() => "(no output)".to_string(),
        Ok(text) => text,
        Err(e) => json!({ "error": e.to_string() }).to_string(),
    }
}

async fn guarded<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::agent::capability::{AgentTool, ToolKind};
    use crate::testing::ScriptedProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Execute tool that reports its first call's program as missing
    struct FlakyKali {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AgentTool for FlakyKali {
        fn name(&self) -> &str {
            "KaliContainerTool"
        }

        fn kind(&self) -> ToolKind {
            ToolKind::Execute
        }

        async fn execute(&self, command: &str) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(command.to_string());
            if calls.len() == 1 {
                Ok("bash: line 1: gobuster: command not found\n[exit code 127]".into())
            } else {
                Ok(format!("ran {}", command))
            }
        }

        fn install_command(&self, program: &str) -> Option<String> {
            Some(format!("apt-get install -y {}", program))
        }
    }

    struct Browser;

    #[async_trait]
    impl AgentTool for Browser {
        fn name(&self) -> &str {
            "WebBrowserTool"
        }

        fn kind(&self) -> ToolKind {
            ToolKind::Browse
        }

        async fn browse(&self, url: &str) -> Result<String> {
            Ok(format!("HTTP 200\n<p>{}</p>", url))
        }
    }

    fn config(max_steps: usize) -> AgentLoopConfig {
        AgentLoopConfig {
            max_steps,
            ..AgentLoopConfig::default()
        }
    }

    fn investigation(outcome: AgentOutcome) -> Investigation {
        match outcome {
            AgentOutcome::Investigation(inv) => *inv,
            AgentOutcome::Chat { reply } => panic!("unexpected chat reply: {}", reply),
        }
    }

    #[tokio::test]
    async fn test_install_recovery_records_both_attempts() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when("Break the following", "1. Enumerate directories")
            .reply_when(
                "Current step:",
                "Use KaliContainerTool: gobuster dir -u https://example.com",
            )
            .reply_when("penetration test report", "report");
        let kali = Arc::new(FlakyKali {
            calls: Mutex::new(Vec::new()),
        });
        let agent = AutonomousAgent::new(
            Arc::new(provider),
            ToolBox::new().with_tool(kali.clone()),
            &config(1),
        );

        let inv = investigation(
            agent
                .run("enumerate example.com", "job", CancellationToken::new())
                .await
                .unwrap(),
        );
        let calls = kali.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "gobuster dir -u https://example.com",
                "apt-get install -y gobuster",
                "gobuster dir -u https://example.com",
            ]
        );
        assert_eq!(inv.session.history.len(), 3);
        assert!(inv.session.history[0].observation.contains("command not found"));
        assert_eq!(
            inv.session.history[2].observation,
            "ran gobuster dir -u https://example.com"
        );
        assert_eq!(inv.stop_reason, StopReason::StepLimit);
        assert_eq!(inv.report.as_deref(), Some("report"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_observation() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when("Current step:", "Use NmapTool: -sV example.com");
        let agent = AutonomousAgent::new(Arc::new(provider), ToolBox::new(), &config(1));

        let inv = investigation(agent.run("scan", "job", CancellationToken::new()).await.unwrap());
        let observation: serde_json::Value =
            serde_json::from_str(&inv.session.history[0].observation).unwrap();
        assert_eq!(observation["error"], "Tool NmapTool not found");
    }

    #[tokio::test]
    async fn test_thought_without_tool_line() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when("Current step:", "I would scan the host first.");
        let agent = AutonomousAgent::new(Arc::new(provider), ToolBox::new(), &config(1));

        let inv = investigation(agent.run("scan", "job", CancellationToken::new()).await.unwrap());
        assert_eq!(inv.session.history[0].action, "none");
        assert!(inv.session.history[0].observation.contains("No tool/action specified"));
    }

    #[tokio::test]
    async fn test_xss_probe_stops_at_first_hit() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when(
                "Break the following",
                "1. Test for XSS on https://example.com/search?q=test",
            )
            .reply_sequence(
                "A reflected XSS payload was sent",
                ["No reflection found.", "The page is vulnerable: payload executes."],
            )
            .reply_when("Current step:", "Use WebBrowserTool: browse https://example.com");
        let agent = AutonomousAgent::new(
            Arc::new(provider),
            ToolBox::new().with_tool(Arc::new(Browser)),
            &config(3),
        );

        let inv = investigation(
            agent
                .run("find xss on example.com", "job", CancellationToken::new())
                .await
                .unwrap(),
        );
        let session = &inv.session;
        assert_eq!(session.tested, vec![XSS_PAYLOADS[0], XSS_PAYLOADS[1]]);
        assert!(session.payloads_left.is_empty());
        assert_eq!(session.findings.len(), 1);
        assert!(session.findings[0].contains(XSS_PAYLOADS[1]));
        assert_eq!(
            session.history[0].action,
            format!(
                "WebBrowserTool: browse https://example.com/search?q={}",
                XSS_PAYLOADS[0]
            )
        );
        // third iteration falls back to a model thought
        assert_eq!(session.history.len(), 3);
    }

    #[tokio::test]
    async fn test_xss_payloads_take_url_from_earlier_step() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when(
                "Break the following",
                "1. Open https://example.com/search?q=test\n2. Test the search box for XSS",
            )
            .reply_when("A reflected XSS payload was sent", "No reflection found.")
            .reply_when("Current step:", "Use WebBrowserTool: browse https://example.com");
        let agent = AutonomousAgent::new(
            Arc::new(provider),
            ToolBox::new().with_tool(Arc::new(Browser)),
            &config(2),
        );

        let inv = investigation(
            agent
                .run("check example.com search", "job", CancellationToken::new())
                .await
                .unwrap(),
        );
        let session = &inv.session;
        assert_eq!(
            session.probe_url.as_deref(),
            Some("https://example.com/search?q=test")
        );
        assert_eq!(session.tested, vec![XSS_PAYLOADS[0]]);
        assert_eq!(session.history[0].action, "WebBrowserTool: browse https://example.com");
        assert!(session.history[1].action.contains(XSS_PAYLOADS[0]));
    }

    /// Browser that cancels the run on its first page
    struct CancellingBrowser {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl AgentTool for CancellingBrowser {
        fn name(&self) -> &str {
            "WebBrowserTool"
        }

        fn kind(&self) -> ToolKind {
            ToolKind::Browse
        }

        async fn browse(&self, _url: &str) -> Result<String> {
            self.cancel.cancel();
            Ok("HTTP 200\n<p>ok</p>".into())
        }
    }

    #[tokio::test]
    async fn test_cancel_after_loop_skips_report() {
        let provider = Arc::new(
            ScriptedProvider::new("CONTINUE")
                .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
                .reply_when("Current step:", "Use WebBrowserTool: browse https://example.com")
                .reply_when("penetration test report", "report"),
        );
        let cancel = CancellationToken::new();
        let agent = AutonomousAgent::new(
            provider.clone(),
            ToolBox::new().with_tool(Arc::new(CancellingBrowser {
                cancel: cancel.clone(),
            })),
            &config(1),
        );

        let inv = investigation(agent.run("scan", "job", cancel).await.unwrap());
        assert_eq!(inv.stop_reason, StopReason::Cancelled);
        assert!(inv.report.is_none());
        assert_eq!(provider.calls_containing("penetration test report"), 0);
    }

    #[tokio::test]
    async fn test_time_budget_stops_after_first_iteration() {
        let provider = ScriptedProvider::new("CONTINUE")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when("Current step:", "Use WebBrowserTool: browse https://example.com");
        let cfg = AgentLoopConfig {
            time_budget_secs: 0,
            ..config(10)
        };
        let agent = AutonomousAgent::new(
            Arc::new(provider),
            ToolBox::new().with_tool(Arc::new(Browser)),
            &cfg,
        );

        let inv = investigation(agent.run("scan", "job", CancellationToken::new()).await.unwrap());
        assert_eq!(inv.stop_reason, StopReason::TimeBudget);
        assert_eq!(inv.session.history.len(), 1);
        assert!(inv.report.is_some());
    }

    #[tokio::test]
    async fn test_model_stop() {
        let provider = ScriptedProvider::new("")
            .reply_when("Answer with exactly one word: INVESTIGATE", "INVESTIGATE")
            .reply_when("CONTINUE or STOP", "STOP")
            .reply_when("Current step:", "Use WebBrowserTool: browse https://example.com");
        let agent = AutonomousAgent::new(
            Arc::new(provider),
            ToolBox::new().with_tool(Arc::new(Browser)),
            &config(10),
        );

        let inv = investigation(agent.run("scan", "job", CancellationToken::new()).await.unwrap());
        assert_eq!(inv.stop_reason, StopReason::ModelStop);
        assert_eq!(inv.session.history.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_gets_pirate_reply() {
        let provider = ScriptedProvider::new("")
            .reply_when("Answer with exactly one word: INVESTIGATE", "chat")
            .reply_when("pirate", "Arr, all be well!");
        let agent = AutonomousAgent::new(Arc::new(provider), ToolBox::new(), &config(10));

        match agent.run("hi there", "job", CancellationToken::new()).await.unwrap() {
            AgentOutcome::Chat { reply } => assert_eq!(reply, "Arr, all be well!"),
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let agent = AutonomousAgent::new(
            Arc::new(ScriptedProvider::new("INVESTIGATE")),
            ToolBox::new(),
            &config(10),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            agent.run("scan", "job", cancel).await,
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_observe_formats_errors() {
        assert_eq!(observe(Ok("  ".into())), "(no output)");
        let err = observe(Err(Error::Tool("boom".into())));
        assert!(err.starts_with("{\"error\""));
        assert!(err.contains("boom"));
    }
}
