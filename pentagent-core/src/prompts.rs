//! Prompt templates for the decision steps

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;

use crate::{Error, Result};

#[allow(clippy::expect_used)]
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex"));

/// One prompt template
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub prompt: String,
}

impl PromptTemplate {
    /// Substitute `{name}` placeholders in one pass, so values are never
    /// re-expanded. Unknown placeholders are left as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        PLACEHOLDER_REGEX
            .replace_all(&self.prompt, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let name = caps.get(1).map_or("", |m| m.as_str());
                vars.iter()
                    .find(|(var, _)| *var == name)
                    .map_or(whole, |(_, value)| *value)
                    .to_string()
            })
            .into_owned()
    }
}

/// All prompt templates
#[derive(Debug, Clone, Deserialize)]
pub struct Prompts {
    pub system: PromptTemplate,
    pub intent: PromptTemplate,
    pub chat: PromptTemplate,
    pub plan: PromptTemplate,
    pub report: PromptTemplate,
    pub agent_system: PromptTemplate,
    pub agent_triage: PromptTemplate,
    pub agent_pirate: PromptTemplate,
    pub agent_plan: PromptTemplate,
    pub agent_think: PromptTemplate,
    pub agent_stop: PromptTemplate,
    pub agent_report: PromptTemplate,
    pub xss_analysis: PromptTemplate,
}

impl Prompts {
    /// Load prompts from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse prompts from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse prompts: {}", e)))
    }

    /// Load from default location (embedded)
    #[allow(clippy::expect_used)]
    pub fn default_prompts() -> Self {
        let content = include_str!("../prompts.toml");
        Self::parse(content).expect("Embedded prompts.toml should be valid")
    }

    /// Get a prompt by key
    pub fn get(&self, key: &str) -> Option<&str> {
        let template = match key {
            "system" => &self.system,
            "intent" => &self.intent,
            "chat" => &self.chat,
            "plan" => &self.plan,
            "report" => &self.report,
            "agent_system" => &self.agent_system,
            "agent_triage" => &self.agent_triage,
            "agent_pirate" => &self.agent_pirate,
            "agent_plan" => &self.agent_plan,
            "agent_think" => &self.agent_think,
            "agent_stop" => &self.agent_stop,
            "agent_report" => &self.agent_report,
            "xss_analysis" => &self.xss_analysis,
            _ => return None,
        };
        Some(&template.prompt)
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self::default_prompts()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_prompts_parse() {
        let prompts = Prompts::default_prompts();
        assert!(prompts.intent.prompt.contains("{message}"));
        assert!(prompts.get("agent_think").is_some());
        assert!(prompts.get("unknown").is_none());
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let template = PromptTemplate {
            prompt: "Target: {target}, findings: {findings} {other}".into(),
        };
        let rendered = template.render(&[("target", "10.0.0.5"), ("findings", "none")]);
        assert_eq!(rendered, "Target: 10.0.0.5, findings: none {other}");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let template = PromptTemplate {
            prompt: "Goal: {goal}\nSession:\n{session}".into(),
        };
        let rendered = template.render(&[
            ("goal", "find {session} leaks"),
            ("session", "observed {goal} in page"),
        ]);
        assert_eq!(
            rendered,
            "Goal: find {session} leaks\nSession:\nobserved {goal} in page"
        );
    }

    #[test]
    fn test_from_file_rejects_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[intent]\nprompt = \"x\"\n").unwrap();
        let err = Prompts::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
