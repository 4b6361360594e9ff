//! State management module

pub mod metrics;
pub mod models;
pub mod session;

pub use metrics::{Metrics, MetricsTracker, TokenCounts, estimate_tokens};
pub use models::{
    Intent, IntentDecision, Phase, PhaseResult, Priority, SecurityPlan, ToolResult, UserInput,
    WorkflowState,
};
pub use session::{AgentSession, HistoryEntry};
