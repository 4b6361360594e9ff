//! A single language-model call

use std::sync::Arc;

use tracing::debug;

use crate::providers::{CompletionRequest, LlmProvider, Message};
use crate::{Error, Result};

/// Reply length cap for every decision
const MAX_TOKENS: u32 = 4096;

/// One prompt in, one free-text reply out.
///
/// There is no retry: a failed call is returned as [`Error::Provider`] and the
/// caller aborts its run.
#[derive(Clone)]
pub struct DecisionStep {
    provider: Arc<dyn LlmProvider>,
}

impl DecisionStep {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Send `prompt` under `system` and return the reply text
    pub async fn ask(&self, system: &str, prompt: &str) -> Result<String> {
        let request = CompletionRequest::new(vec![Message::user(prompt)])
            .with_system(system)
            .with_max_tokens(MAX_TOKENS);

        let response = self.provider.complete(request).await.map_err(|e| match e {
            Error::Provider(_) => e,
            other => Error::Provider(other.to_string()),
        })?;

        debug!(
            provider = self.provider.name(),
            reply_len = response.content.len(),
            "decision step completed"
        );
        Ok(response.content)
    }
}

impl std::fmt::Debug for DecisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionStep")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_ask_returns_reply() {
        let provider = Arc::new(ScriptedProvider::new("fallback").reply_when("ports", "22 open"));
        let step = DecisionStep::new(provider.clone());

        assert_eq!(step.ask("sys", "which ports?").await.unwrap(), "22 open");
        assert_eq!(step.ask("sys", "anything").await.unwrap(), "fallback");
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_failure_is_provider_error() {
        let provider = Arc::new(ScriptedProvider::new("x").failing_after(0));
        let step = DecisionStep::new(provider);

        let err = step.ask("sys", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
