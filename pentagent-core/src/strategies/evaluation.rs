use super::PhaseStrategy;
use crate::state::Phase;

/// Severity assessment, prioritisation and remediation advice
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationStrategy;

impl PhaseStrategy for EvaluationStrategy {
    fn phase(&self) -> Phase {
        Phase::Evaluation
    }

    fn objectives(&self) -> &'static [&'static str] {
        &[
            "Analyze and evaluate all security findings",
            "Assess the severity and impact of discovered vulnerabilities",
            "Provide detailed recommendations for remediation",
            "Prioritize findings based on risk and business impact",
        ]
    }

    fn tools(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("rag_search", "Search knowledge base for remediation guidance"),
            ("rag_get_category", "Retrieve stored findings for analysis"),
            ("websearch", "Search for additional context and remediation information"),
            ("shell_command", "Execute analysis commands if needed"),
        ]
    }

    fn guidelines(&self) -> &'static [&'static str] {
        &[
            "Thoroughly analyze all findings from previous phases",
            "Assess the business impact of each vulnerability",
            "Provide actionable remediation recommendations",
            "Prioritize findings by severity and exploitability",
        ]
    }

    fn goals(&self) -> &'static [&'static str] {
        &[
            "Analyze and evaluate all security findings",
            "Assess severity and impact of vulnerabilities",
            "Provide detailed remediation recommendations",
            "Generate comprehensive security assessment report",
            "Prioritize findings based on risk and business impact",
        ]
    }

    fn success_criteria(&self) -> &'static [&'static str] {
        &[
            "All findings analyzed and evaluated",
            "Severity and impact assessed",
            "Remediation recommendations provided",
            "Comprehensive report generated",
            "Findings prioritized by risk",
        ]
    }

    fn completion_questions(&self) -> &'static [&'static str] {
        &[
            "Severity assessment for each finding",
            "Potential business impact",
            "Risk prioritization",
            "Remediation recommendations",
        ]
    }
}
