use super::PhaseStrategy;
use crate::state::Phase;

/// Web application crawling and endpoint discovery
#[derive(Debug, Clone, Copy, Default)]
pub struct SpideringStrategy;

impl PhaseStrategy for SpideringStrategy {
    fn phase(&self) -> Phase {
        Phase::Spidering
    }

    fn objectives(&self) -> &'static [&'static str] {
        &[
            "Crawl and map the target's web applications",
            "Discover directories, files, and endpoints",
            "Identify web technologies and frameworks in use",
            "Map the application structure and functionality",
            "Identify potential entry points for testing",
        ]
    }

    fn tools(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("gobuster", "Directory and file enumeration"),
            ("nikto", "Web server vulnerability scanning"),
            ("whatweb", "Web technology identification"),
            ("websearch", "Search for target-specific information"),
            ("rag_store", "Store findings for later analysis"),
        ]
    }

    fn guidelines(&self) -> &'static [&'static str] {
        &[
            "Build on the hosts and services found during information gathering",
            "Keep request rates low enough not to disrupt the application",
            "Record every discovered endpoint for active scanning",
        ]
    }

    fn goals(&self) -> &'static [&'static str] {
        &[
            "Crawl and map target's web applications",
            "Discover directories, files, and endpoints",
            "Identify web technologies and frameworks",
            "Map application structure and functionality",
            "Identify potential entry points for testing",
        ]
    }

    fn success_criteria(&self) -> &'static [&'static str] {
        &[
            "Web applications fully mapped",
            "Directories and files discovered",
            "Web technologies identified",
            "Application structure documented",
            "Entry points identified for active testing",
        ]
    }

    fn completion_questions(&self) -> &'static [&'static str] {
        &[
            "Summary of discovered web applications and structure",
            "Identified web technologies and frameworks",
            "Potential entry points for active testing",
            "Recommendations for the Active Scanning phase",
            "Any immediate web security concerns",
        ]
    }
}
