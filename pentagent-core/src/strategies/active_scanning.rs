use super::PhaseStrategy;
use crate::state::Phase;

/// Vulnerability scanning and validation of earlier leads
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveScanningStrategy;

impl PhaseStrategy for ActiveScanningStrategy {
    fn phase(&self) -> Phase {
        Phase::ActiveScanning
    }

    fn objectives(&self) -> &'static [&'static str] {
        &[
            "Actively test for vulnerabilities in discovered services and applications",
            "Perform vulnerability scanning against identified targets",
            "Test for common security weaknesses and misconfigurations",
            "Validate potential security issues discovered in previous phases",
            "Identify exploitable vulnerabilities and security gaps",
        ]
    }

    fn tools(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("nuclei", "Vulnerability scanning with predefined templates"),
            ("nikto", "Web server vulnerability scanning"),
            ("hydra", "Password brute forcing (use responsibly)"),
            ("metasploit", "Exploitation framework (use responsibly)"),
            ("websearch", "Search for target-specific vulnerabilities"),
            ("rag_store", "Store findings for analysis"),
        ]
    }

    fn guidelines(&self) -> &'static [&'static str] {
        &[
            "Focus on targets discovered in previous phases",
            "Use appropriate scanning intensity based on scope",
            "Document all vulnerabilities and findings",
            "Be responsible with exploitation tools",
            "Respect the target's infrastructure and rate limits",
            "Store all findings for the Evaluation phase",
        ]
    }

    fn goals(&self) -> &'static [&'static str] {
        &[
            "Actively test for vulnerabilities in discovered services",
            "Perform vulnerability scanning against identified targets",
            "Test for common security weaknesses and misconfigurations",
            "Validate potential security issues from previous phases",
            "Identify exploitable vulnerabilities and security gaps",
        ]
    }

    fn success_criteria(&self) -> &'static [&'static str] {
        &[
            "Vulnerabilities identified and documented",
            "Security weaknesses and misconfigurations found",
            "Potential exploitation paths identified",
            "All discovered services tested",
            "Findings prepared for evaluation",
        ]
    }

    fn completion_questions(&self) -> &'static [&'static str] {
        &[
            "Summary of discovered vulnerabilities and their severity",
            "Identified security weaknesses and misconfigurations",
            "Potential exploitation paths and risks",
            "Recommendations for the Evaluation phase",
            "Any critical security issues that need immediate attention",
        ]
    }
}
