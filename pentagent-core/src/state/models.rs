//! Workflow data model for the phase orchestrator

use std::fmt;

use serde::{Deserialize, Serialize};

/// Security assessment phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Infrastructure, subdomain and technology discovery
    InformationGathering,
    /// Mapping web applications and endpoints
    Spidering,
    /// Probing for vulnerabilities
    ActiveScanning,
    /// Analysing what the earlier phases found
    Evaluation,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 4] = [
        Phase::InformationGathering,
        Phase::Spidering,
        Phase::ActiveScanning,
        Phase::Evaluation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InformationGathering => "information_gathering",
            Self::Spidering => "spidering",
            Self::ActiveScanning => "active_scanning",
            Self::Evaluation => "evaluation",
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Self::InformationGathering => "Information Gathering",
            Self::Spidering => "Spidering",
            Self::ActiveScanning => "Active Scanning",
            Self::Evaluation => "Evaluation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user wants from this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Chat,
    SecurityTesting,
}

/// Plan priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Original request. Never modified after the run starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInput {
    pub message: String,
    pub target: Option<String>,
}

impl UserInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Parsed outcome of the intent decision step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDecision {
    pub intent: Intent,
    /// Always in `[0, 1]`
    pub confidence: f32,
    pub reasoning: String,
    pub target: Option<String>,
}

/// Assessment plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPlan {
    pub target: String,
    pub phases: Vec<Phase>,
    pub priority: Priority,
    pub scope: String,
}

impl SecurityPlan {
    /// The full four-phase plan used for every assessment
    pub fn comprehensive(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            phases: Phase::ALL.to_vec(),
            priority: Priority::Medium,
            scope: "comprehensive".to_string(),
        }
    }
}

/// Outcome of one backend operation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    /// Empty on failure
    pub output: String,
    pub error: Option<String>,
    /// Seconds
    pub duration: f64,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>, duration: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
            error: None,
            duration,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>, duration: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
            duration,
        }
    }
}

/// Aggregated outcome of one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: Phase,
    /// True iff at least one finding was produced
    pub success: bool,
    pub findings: Vec<String>,
    pub tools_used: Vec<String>,
    /// Seconds
    pub duration: f64,
    pub error: Option<String>,
}

/// State threaded through one orchestrator run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    pub user_input: UserInput,
    pub intent_decision: Option<IntentDecision>,
    pub security_plan: Option<SecurityPlan>,
    pub current_phase: Option<Phase>,
    pub phase_results: Vec<PhaseResult>,
    pub chat_response: Option<String>,
    pub final_report: Option<String>,
    pub errors: Vec<String>,
    pub job_id: Option<String>,
    /// Set when an external cancel stopped the run early
    #[serde(default)]
    pub cancelled: bool,
}

impl WorkflowState {
    pub fn new(user_input: UserInput) -> Self {
        Self {
            user_input,
            ..Default::default()
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Findings from every completed phase, in phase order
    pub fn all_findings(&self) -> Vec<String> {
        self.phase_results
            .iter()
            .flat_map(|r| r.findings.iter().cloned())
            .collect()
    }

    /// Error text of every phase that recorded one
    pub fn phase_errors(&self) -> Vec<(Phase, &str)> {
        self.phase_results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.phase, e)))
            .collect()
    }
}
