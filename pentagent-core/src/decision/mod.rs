//! Language-model decision steps and the parsers that read their replies

pub mod parse;
pub mod step;

pub use parse::{classify_intent, extract_target, parse_plan_steps, parse_tool_command};
pub use step::DecisionStep;
