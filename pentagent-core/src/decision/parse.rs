//! Deterministic parsers for model replies.
//!
//! Nothing here fails: every parser has a fallback for replies that do not
//! follow the requested format.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::state::Intent;

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static TARGET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"https?://[^\s/$.?#][^\s]*",
        r"|\b(?:\d{1,3}\.){3}\d{1,3}\b",
        r"|\b(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}\b",
    ))
    .expect("Hardcoded target regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static TARGET_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s\-*•]*\**\s*target\s*\**\s*:\s*\**\s*(.*?)\s*$")
        .expect("Hardcoded target line regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+\s*[.):-]?|[-*•])\s*(.*\S)")
        .expect("Hardcoded list item regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static TOOL_COMMAND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Use (\w+): (.+)").expect("Hardcoded tool command regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static MISSING_COMMAND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_.+-]+): command not found")
        .expect("Hardcoded missing command regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s"'<>]+"#).expect("Hardcoded url regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static QUERY_PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(q=)[^&]*").expect("Hardcoded query param regex pattern should be valid")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

/// CHAT anywhere in the reply (any case) means conversation
pub fn classify_intent(reply: &str) -> Intent {
    if reply.to_uppercase().contains("CHAT") {
        Intent::Chat
    } else {
        Intent::SecurityTesting
    }
}

/// First URL, IPv4 address or domain in `text`
pub fn find_target(text: &str) -> Option<String> {
    TARGET_REGEX
        .find(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the assessment target.
///
/// Order: a valid `Target:` line in the reply, a target mentioned in the
/// message, the declared target, then `default`.
pub fn extract_target(
    reply: &str,
    message: &str,
    declared: Option<&str>,
    default: &str,
) -> String {
    TARGET_LINE_REGEX
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .find_map(|value| find_target(value.as_str()))
        .or_else(|| find_target(message))
        .or_else(|| {
            declared
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| default.to_string())
}

/// Numbered or bulleted lines become steps; a reply without any list items
/// becomes a single step.
pub fn parse_plan_steps(reply: &str) -> Vec<String> {
    let steps: Vec<String> = reply
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '•'))
        })
        .filter_map(|line| LIST_ITEM_REGEX.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|step| !step.is_empty())
        .collect();

    if steps.is_empty() {
        vec![reply.trim().to_string()]
    } else {
        steps
    }
}

/// First `Use <ToolName>: <argument>` in a thought
pub fn parse_tool_command(thought: &str) -> Option<(String, String)> {
    let caps = TOOL_COMMAND_REGEX.captures(thought)?;
    let tool = caps.get(1)?.as_str().to_string();
    let argument = caps.get(2)?.as_str().trim().to_string();
    Some((tool, argument))
}

/// INVESTIGATE anywhere in the reply (any case)
pub fn wants_investigation(reply: &str) -> bool {
    reply.to_uppercase().contains("INVESTIGATE")
}

/// Decision of a CONTINUE/STOP reply.
///
/// The first non-empty line carries the verdict; the justification after it
/// may mention either word. Without a verdict line, STOP anywhere (any case)
/// stops.
pub fn wants_stop(reply: &str) -> bool {
    let verdict = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_uppercase();
    if verdict.contains("STOP") {
        true
    } else if verdict.contains("CONTINUE") {
        false
    } else {
        reply.to_uppercase().contains("STOP")
    }
}

/// Name of the program a shell reported as missing
pub fn missing_command(output: &str) -> Option<String> {
    MISSING_COMMAND_REGEX
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First http(s) URL in `text`
pub fn extract_url(text: &str) -> Option<String> {
    URL_REGEX
        .find(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string())
}

/// Put `payload` into the `q=` query parameter, adding one if absent
pub fn substitute_query_param(url: &str, payload: &str) -> String {
    if QUERY_PARAM_REGEX.is_match(url) {
        let replacement = format!("q={}", payload);
        QUERY_PARAM_REGEX
            .replace(url, NoExpand(&replacement))
            .into_owned()
    } else if url.contains('?') {
        format!("{}&q={}", url, payload)
    } else {
        format!("{}?q={}", url, payload)
    }
}

/// Whether a payload analysis reports a hit
pub fn indicates_xss(analysis: &str) -> bool {
    let lower = analysis.to_lowercase();
    lower.contains("xss") || lower.contains("vulnerab") || lower.contains("alert(1)")
}

/// Whether a plan step asks for an XSS probe
pub fn mentions_xss(step: &str) -> bool {
    let lower = step.to_lowercase();
    lower.contains("xss") || lower.contains("cross-site scripting")
}
