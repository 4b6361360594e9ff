//! Session state for the autonomous agent loop

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Characters of an observation kept when comparing actions for repetition
pub const REPETITION_RESULT_CHARS: usize = 200;

/// One think → act → observe triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub thought: String,
    pub action: String,
    pub observation: String,
}

/// Mutable state owned by one autonomous run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    pub goal: String,
    pub steps: Vec<String>,
    pub history: Vec<HistoryEntry>,
    /// Probe payloads still to try, consumed front to back
    pub payloads_left: VecDeque<String>,
    /// Probe payloads already tried, in order
    pub tested: Vec<String>,
    /// URL the active probe substitutes payloads into
    pub probe_url: Option<String>,
    /// Confirmed probe hits
    pub findings: Vec<String>,
    pub last_action: Option<String>,
    pub last_observation: Option<String>,
    repetition_window: usize,
    recent_actions: VecDeque<(String, String)>,
}

impl AgentSession {
    pub fn new(goal: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            goal: goal.into(),
            steps,
            history: Vec::new(),
            payloads_left: VecDeque::new(),
            tested: Vec::new(),
            probe_url: None,
            findings: Vec::new(),
            last_action: None,
            last_observation: None,
            repetition_window: 4,
            recent_actions: VecDeque::new(),
        }
    }

    /// Number of recent actions considered by the repetition guard
    pub fn with_repetition_window(mut self, window: usize) -> Self {
        self.repetition_window = window.max(2);
        self
    }

    /// Step the loop should work on at `iteration`; past the plan's end the
    /// agent follows up on what it found.
    pub fn current_step(&self, iteration: usize) -> &str {
        self.steps
            .get(iteration)
            .map(String::as_str)
            .unwrap_or("Follow up on the most promising findings toward the goal")
    }

    /// Append a completed triple and update repetition tracking
    pub fn record(
        &mut self,
        thought: impl Into<String>,
        action: impl Into<String>,
        observation: impl Into<String>,
    ) {
        let action = action.into();
        let observation = observation.into();

        self.recent_actions
            .push_back((action.clone(), truncate(&observation, REPETITION_RESULT_CHARS)));
        while self.recent_actions.len() > self.repetition_window {
            self.recent_actions.pop_front();
        }

        self.last_action = Some(action.clone());
        self.last_observation = Some(observation.clone());
        self.history.push(HistoryEntry {
            thought: thought.into(),
            action,
            observation,
        });
    }

    /// True when the most recent (command, truncated result) pair occurs more
    /// than once in the recent-action window
    pub fn is_repeating(&self) -> bool {
        let Some(latest) = self.recent_actions.back() else {
            return false;
        };
        self.recent_actions.iter().filter(|a| *a == latest).count() > 1
    }

    /// Queue payloads for a parametric probe against `url`
    pub fn start_probe(&mut self, url: impl Into<String>, payloads: &[&str]) {
        self.probe_url = Some(url.into());
        self.payloads_left = payloads.iter().map(|p| p.to_string()).collect();
    }

    /// Take the next payload, moving it to `tested`
    pub fn next_payload(&mut self) -> Option<String> {
        let payload = self.payloads_left.pop_front()?;
        self.tested.push(payload.clone());
        Some(payload)
    }

    /// Abandon the remaining payloads
    pub fn finish_probe(&mut self) {
        self.payloads_left.clear();
    }

    /// Text rendering used in prompts
    pub fn render(&self) -> String {
        let mut out = format!("Goal: {}\n", self.goal);

        out.push_str("Plan:\n");
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, step));
        }

        if !self.tested.is_empty() {
            out.push_str(&format!("Payloads tested: {}\n", self.tested.join(" | ")));
        }
        if !self.findings.is_empty() {
            out.push_str("Findings so far:\n");
            for finding in &self.findings {
                out.push_str(&format!("- {}\n", finding));
            }
        }

        out.push_str("History:\n");
        if self.history.is_empty() {
            out.push_str("(none yet)\n");
        }
        for (i, entry) in self.history.iter().enumerate() {
            out.push_str(&format!(
                "[{}] Thought: {}\n    Action: {}\n    Observation: {}\n",
                i + 1,
                entry.thought.trim(),
                entry.action,
                entry.observation.trim()
            ));
        }
        out
    }
}

/// Truncate to at most `max` characters on a char boundary
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_last_action() {
        let mut session = AgentSession::new("scan", vec!["step".into()]);
        session.record("t", "ShellTool: id", "uid=0(root)");
        assert_eq!(session.last_action.as_deref(), Some("ShellTool: id"));
        assert_eq!(session.last_observation.as_deref(), Some("uid=0(root)"));
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_repetition_detected_on_second_identical_pair() {
        let mut session = AgentSession::new("scan", vec![]);
        session.record("t1", "ShellTool: nmap x", "same");
        assert!(!session.is_repeating());
        session.record("t2", "ShellTool: nmap x", "same");
        assert!(session.is_repeating());
    }

    #[test]
    fn test_repetition_ignores_differing_results() {
        let mut session = AgentSession::new("scan", vec![]);
        session.record("t", "ShellTool: curl x", "first");
        session.record("t", "ShellTool: curl x", "second");
        assert!(!session.is_repeating());
    }

    #[test]
    fn test_repetition_compares_truncated_results() {
        let mut session = AgentSession::new("scan", vec![]);
        let prefix = "x".repeat(REPETITION_RESULT_CHARS);
        session.record("t", "ShellTool: a", format!("{}tail-one", prefix));
        session.record("t", "ShellTool: a", format!("{}tail-two", prefix));
        assert!(session.is_repeating());
    }

    #[test]
    fn test_repetition_window_forgets_old_actions() {
        let mut session = AgentSession::new("scan", vec![]).with_repetition_window(4);
        session.record("t", "A", "r");
        for cmd in ["B", "C", "D", "E"] {
            session.record("t", cmd, "r");
        }
        session.record("t", "A", "r");
        assert!(!session.is_repeating());
    }

    #[test]
    fn test_payloads_consumed_front_to_back() {
        let mut session = AgentSession::new("xss", vec![]);
        session.start_probe("https://t/?q=1", &["one", "two"]);
        assert_eq!(session.next_payload().as_deref(), Some("one"));
        assert_eq!(session.next_payload().as_deref(), Some("two"));
        assert_eq!(session.next_payload(), None);
        assert_eq!(session.tested, vec!["one", "two"]);
    }

    #[test]
    fn test_current_step_past_plan_end() {
        let session = AgentSession::new("g", vec!["only".into()]);
        assert_eq!(session.current_step(0), "only");
        assert!(session.current_step(5).contains("Follow up"));
    }

    #[test]
    fn test_render_includes_history() {
        let mut session = AgentSession::new("find open ports", vec!["scan".into()]);
        session.record("Use ShellTool: nmap t", "ShellTool: nmap t", "80/tcp open");
        let rendered = session.render();
        assert!(rendered.contains("Goal: find open ports"));
        assert!(rendered.contains("80/tcp open"));
    }
}
