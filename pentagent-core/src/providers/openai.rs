//! OpenAI-compatible provider implementation using rig-core

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use crate::state::{MetricsTracker, estimate_tokens};
use crate::{Error, Result};

use super::{CompletionRequest, CompletionResponse, LlmProvider, TokenUsage};

/// OpenAI provider using rig-core. Also serves LiteLLM and other
/// OpenAI-compatible proxies through a custom base URL.
pub struct OpenAiProvider {
    client: openai::Client,
    name: &'static str,
    model: String,
    metrics: MetricsTracker,
}

impl OpenAiProvider {
    /// Create with an explicit API key against api.openai.com
    pub fn with_api_key(
        api_key: impl Into<String>,
        model: impl Into<String>,
        metrics: MetricsTracker,
    ) -> Result<Self> {
        let client = openai::Client::builder()
            .api_key(api_key.into())
            .build()
            .map_err(|e| Error::Provider(format!("Failed to build OpenAI client: {}", e)))?;

        Ok(Self {
            client,
            name: "openai",
            model: model.into(),
            metrics,
        })
    }

    /// Create with custom base URL (for LiteLLM proxy or compatible APIs)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        metrics: MetricsTracker,
    ) -> Result<Self> {
        let client = openai::Client::builder()
            .api_key(api_key.into())
            .base_url(base_url.into())
            .build()
            .map_err(|e| Error::Provider(format!("Failed to build OpenAI client: {}", e)))?;

        Ok(Self {
            client,
            name: "openai",
            model: model.into(),
            metrics,
        })
    }

    /// Report under a different provider name
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let prompt = request.transcript();
        let system = request
            .system
            .as_deref()
            .unwrap_or("You are a helpful assistant.");

        let mut builder = self
            .client
            .agent(&self.model)
            .preamble(system)
            .max_tokens(request.max_tokens.unwrap_or(4096) as u64);
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        let agent = builder.build();

        debug!(provider = self.name, model = %self.model, "openai completion");
        let response = agent
            .prompt(&prompt)
            .await
            .map_err(|e| Error::Provider(format!("{} completion failed: {}", self.name, e)))?;

        let usage = TokenUsage {
            input_tokens: estimate_tokens(system) + estimate_tokens(&prompt),
            output_tokens: estimate_tokens(&response),
        };
        self.metrics
            .record_tokens(usage.input_tokens, usage.output_tokens);

        Ok(CompletionResponse {
            content: response,
            usage,
        })
    }

    fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }
}
