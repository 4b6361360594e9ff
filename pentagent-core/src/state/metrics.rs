//! Metrics tracking for tool calls and token usage

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Token usage counters
#[derive(Debug, Default)]
pub struct TokenCounter {
    pub input: AtomicU64,
    pub output: AtomicU64,
}

impl TokenCounter {
    /// Add input tokens
    pub fn add_input(&self, count: u64) {
        self.input.fetch_add(count, Ordering::Relaxed);
    }

    /// Add output tokens
    pub fn add_output(&self, count: u64) {
        self.output.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current counts
    pub fn get(&self) -> TokenCounts {
        TokenCounts {
            input: self.input.load(Ordering::Relaxed),
            output: self.output.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of token counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
}

/// Snapshot of one run's metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub model_calls: u64,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub tokens: TokenCounts,
}

/// Thread-safe metrics tracker shared by a provider and the tool layer
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    model_calls: AtomicU64,
    tool_calls: AtomicU64,
    tool_failures: AtomicU64,
    tokens: TokenCounter,
}

impl MetricsTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one model call with (estimated) token usage
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.inner.model_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.tokens.add_input(input);
        self.inner.tokens.add_output(output);
    }

    /// Record a tool invocation
    pub fn record_tool_call(&self, success: bool) {
        self.inner.tool_calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.inner.tool_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> Metrics {
        Metrics {
            model_calls: self.inner.model_calls.load(Ordering::Relaxed),
            tool_calls: self.inner.tool_calls.load(Ordering::Relaxed),
            tool_failures: self.inner.tool_failures.load(Ordering::Relaxed),
            tokens: self.inner.tokens.get(),
        }
    }
}

/// Estimate token count from text (roughly 4 characters per token for English)
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_tracker_shared_between_clones() {
        let tracker = MetricsTracker::new();
        let clone = tracker.clone();

        tracker.record_tokens(100, 20);
        clone.record_tool_call(true);
        clone.record_tool_call(false);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.model_calls, 1);
        assert_eq!(snapshot.tool_calls, 2);
        assert_eq!(snapshot.tool_failures, 1);
        assert_eq!(snapshot.tokens.input, 100);
        assert_eq!(snapshot.tokens.output, 20);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }
}
