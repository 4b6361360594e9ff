//! Ollama provider implementation using rig-core

use async_trait::async_trait;
use rig::client::{CompletionClient, Nothing};
use rig::completion::Prompt;
use rig::providers::ollama;
use tracing::debug;

use crate::state::{MetricsTracker, estimate_tokens};
use crate::{Error, Result};

use super::{CompletionRequest, CompletionResponse, LlmProvider, TokenUsage};

/// Ollama provider using rig-core
pub struct OllamaProvider {
    client: ollama::Client,
    model: String,
    metrics: MetricsTracker,
}

impl OllamaProvider {
    /// Create with default localhost URL (http://localhost:11434)
    pub fn new(model: impl Into<String>, metrics: MetricsTracker) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .build()
            .map_err(|e| Error::Provider(format!("Failed to build Ollama client: {}", e)))?;

        Ok(Self {
            client,
            model: model.into(),
            metrics,
        })
    }

    /// Create with custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        metrics: MetricsTracker,
    ) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url.into())
            .build()
            .map_err(|e| Error::Provider(format!("Failed to build Ollama client: {}", e)))?;

        Ok(Self {
            client,
            model: model.into(),
            metrics,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
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

        debug!(model = %self.model, prompt_len = prompt.len(), "ollama completion");
        let response = agent
            .prompt(&prompt)
            .await
            .map_err(|e| Error::Provider(format!("Ollama completion failed: {}", e)))?;

        // Ollama responses through rig carry no usage block; estimate instead
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_name_and_model() {
        let provider = OllamaProvider::new("llama3", MetricsTracker::new()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3");
    }

    #[test]
    fn test_ollama_with_base_url() {
        let provider = OllamaProvider::with_base_url(
            "http://ollama.internal:11434",
            "mistral",
            MetricsTracker::new(),
        )
        .unwrap();
        assert_eq!(provider.model(), "mistral");
    }
}
