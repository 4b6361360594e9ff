//! Error types for pentagent-core

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using pentagent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for pentagent
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(pentagent::config))]
    Config(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(pentagent::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(pentagent::serde))]
    Serde(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    #[diagnostic(code(pentagent::toml))]
    Toml(#[from] toml::de::Error),

    /// Language-model call failed. Fatal to the current run.
    #[error("Provider error: {0}")]
    #[diagnostic(
        code(pentagent::provider),
        help("check that the model backend is running and the model name is correct")
    )]
    Provider(String),

    #[error("Tool execution error: {0}")]
    #[diagnostic(code(pentagent::tool))]
    Tool(String),

    #[error("Backend {0} not connected")]
    #[diagnostic(code(pentagent::not_connected))]
    NotConnected(String),

    #[error("MCP protocol error: {0}")]
    #[diagnostic(code(pentagent::protocol))]
    Protocol(String),

    #[error("Docker error: {0}")]
    #[diagnostic(code(pentagent::docker))]
    Docker(#[from] bollard::errors::Error),

    #[error("HTTP error: {0}")]
    #[diagnostic(code(pentagent::http))]
    Http(#[from] reqwest::Error),

    #[error("Agent error: {0}")]
    #[diagnostic(code(pentagent::agent))]
    Agent(String),

    #[error("Run cancelled")]
    #[diagnostic(code(pentagent::cancelled))]
    Cancelled,
}
