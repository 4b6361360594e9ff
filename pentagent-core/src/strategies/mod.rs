//! Phase strategy catalog.
//!
//! One stateless policy object per [`Phase`]. Each declares what the phase
//! is after and renders the guidance text handed to the model around it.

mod active_scanning;
mod evaluation;
mod information_gathering;
mod spidering;

pub use active_scanning::ActiveScanningStrategy;
pub use evaluation::EvaluationStrategy;
pub use information_gathering::InformationGatheringStrategy;
pub use spidering::SpideringStrategy;

use crate::state::Phase;

/// Guidance and completion criteria for one phase
pub trait PhaseStrategy: Send + Sync {
    fn phase(&self) -> Phase;

    /// What the phase sets out to do
    fn objectives(&self) -> &'static [&'static str];

    /// Tools the phase relies on, with a short note each
    fn tools(&self) -> &'static [(&'static str, &'static str)];

    fn guidelines(&self) -> &'static [&'static str];

    fn goals(&self) -> &'static [&'static str];

    fn success_criteria(&self) -> &'static [&'static str];

    /// Questions answered when the phase closes
    fn completion_questions(&self) -> &'static [&'static str];

    /// Guidance for running the phase against `target`
    fn phase_prompt(&self, target: &str, previous_findings: &[String]) -> String {
        let phase = self.phase().title();
        let mut prompt = format!(
            "You are conducting the {} phase of a security assessment for target: {}\n",
            phase, target
        );

        if self.phase() != Phase::InformationGathering {
            prompt.push_str("\nPrevious findings:\n");
            prompt.push_str(&bullets(previous_findings));
        }

        prompt.push_str("\nYour objectives:\n");
        prompt.push_str(&numbered(self.objectives()));

        prompt.push_str("\nAvailable tools:\n");
        for (tool, note) in self.tools() {
            prompt.push_str(&format!("- {}: {}\n", tool, note));
        }

        prompt.push_str("\nGuidelines:\n");
        prompt.push_str(&bullets(self.guidelines()));

        prompt.push_str(&format!("\nProceed with the {} phase for {}.", phase, target));
        prompt
    }

    /// Wrap-up request once the phase's tools have run
    fn completion_prompt(&self, target: &str, findings: &[String]) -> String {
        format!(
            "{} phase completed for target: {}\n\nFindings:\n{}\nEvaluate the results and provide:\n{}",
            self.phase().title(),
            target,
            bullets(findings),
            numbered(self.completion_questions())
        )
    }
}

/// Strategy for `phase`
pub fn strategy_for(phase: Phase) -> &'static dyn PhaseStrategy {
    match phase {
        Phase::InformationGathering => &InformationGatheringStrategy,
        Phase::Spidering => &SpideringStrategy,
        Phase::ActiveScanning => &ActiveScanningStrategy,
        Phase::Evaluation => &EvaluationStrategy,
    }
}

fn bullets<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "- none\n".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}\n", item.as_ref()))
        .collect()
}

fn numbered(items: &[&str]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}\n", i + 1, item))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_phase() {
        for phase in Phase::ALL {
            let strategy = strategy_for(phase);
            assert_eq!(strategy.phase(), phase);
            assert!(!strategy.goals().is_empty());
            assert!(!strategy.success_criteria().is_empty());
            assert!(!strategy.objectives().is_empty());
        }
    }

    #[test]
    fn test_phase_prompt_lists_findings_after_first_phase() {
        let findings = vec!["nmap: 22/tcp open ssh".to_string()];

        let first = strategy_for(Phase::InformationGathering).phase_prompt("example.com", &findings);
        assert!(first.contains("Information Gathering phase"));
        assert!(!first.contains("22/tcp"));

        let second = strategy_for(Phase::Spidering).phase_prompt("example.com", &findings);
        assert!(second.contains("- nmap: 22/tcp open ssh"));
        assert!(second.contains("- gobuster:"));
        assert!(second.ends_with("Proceed with the Spidering phase for example.com."));
    }

    #[test]
    fn test_completion_prompt_handles_no_findings() {
        let prompt = strategy_for(Phase::Evaluation).completion_prompt("10.0.0.5", &[]);
        assert!(prompt.starts_with("Evaluation phase completed for target: 10.0.0.5"));
        assert!(prompt.contains("- none"));
        assert!(prompt.contains("1. "));
    }
}
