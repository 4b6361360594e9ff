use super::PhaseStrategy;
use crate::state::Phase;

/// Infrastructure, subdomain and technology discovery
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationGatheringStrategy;

impl PhaseStrategy for InformationGatheringStrategy {
    fn phase(&self) -> Phase {
        Phase::InformationGathering
    }

    fn objectives(&self) -> &'static [&'static str] {
        &[
            "Discover the target's network infrastructure and services",
            "Identify subdomains and web applications",
            "Gather publicly available information about the target",
            "Understand the target's technology stack and potential attack vectors",
        ]
    }

    fn tools(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("nmap", "Network scanning and service detection"),
            ("sublist3r", "Subdomain enumeration"),
            ("whatweb", "Web technology identification"),
            ("google_dork", "Advanced search queries for sensitive information"),
            ("websearch", "General web search for target information"),
            ("rag_search", "Knowledge base search for relevant methodologies"),
        ]
    }

    fn guidelines(&self) -> &'static [&'static str] {
        &[
            "Be thorough but respectful of the target's infrastructure",
            "Focus on publicly accessible information",
            "Document all findings for the next phases",
            "Use appropriate scan intensity based on target scope",
            "Look for common misconfigurations and exposed services",
        ]
    }

    fn goals(&self) -> &'static [&'static str] {
        &[
            "Discover target's network infrastructure and open services",
            "Identify subdomains and web applications",
            "Gather publicly available information about the target",
            "Understand technology stack and potential vulnerabilities",
            "Document findings for subsequent phases",
        ]
    }

    fn success_criteria(&self) -> &'static [&'static str] {
        &[
            "Target's network infrastructure mapped",
            "Subdomains and web applications identified",
            "Technology stack and services documented",
            "Potential attack vectors identified",
            "Findings documented for next phases",
        ]
    }

    fn completion_questions(&self) -> &'static [&'static str] {
        &[
            "Summary of discovered infrastructure and services",
            "Identified potential attack vectors",
            "Recommendations for the Spidering phase",
            "Any immediate security concerns that need attention",
        ]
    }
}
