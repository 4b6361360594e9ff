//! Provider factory for creating LLM provider instances

use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderName};
use crate::state::MetricsTracker;
use crate::{Error, Result};

use super::{LlmProvider, OllamaProvider, OpenAiProvider};

/// Create a provider from configuration
pub fn create_provider(
    config: &ProviderConfig,
    metrics: MetricsTracker,
) -> Result<Arc<dyn LlmProvider>> {
    match config.name {
        ProviderName::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .or_else(|| std::env::var("OLLAMA_API_BASE_URL").ok());
            let provider = match base_url {
                Some(url) => OllamaProvider::with_base_url(url, &config.model, metrics)?,
                None => OllamaProvider::new(&config.model, metrics)?,
            };
            Ok(Arc::new(provider))
        }
        ProviderName::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| Error::Provider("OPENAI_API_KEY not set".to_string()))?;

            let provider = match config.base_url {
                Some(ref base_url) => {
                    OpenAiProvider::with_base_url(api_key, base_url, &config.model, metrics)?
                }
                None => OpenAiProvider::with_api_key(api_key, &config.model, metrics)?,
            };
            Ok(Arc::new(provider))
        }
        ProviderName::LiteLlm => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:4000".to_string());
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("LITELLM_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| {
                    Error::Provider("LITELLM_API_KEY or OPENAI_API_KEY not set".to_string())
                })?;
            let provider =
                OpenAiProvider::with_base_url(api_key, base_url, &config.model, metrics)?
                    .named("litellm");
            Ok(Arc::new(provider))
        }
    }
}
