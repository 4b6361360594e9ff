//! MCP (Model Context Protocol) plumbing for tool backends
//!
//! Backends are reached either as child processes speaking newline-delimited
//! JSON-RPC on stdio, or as an [`McpServer`] living in the same process.

mod client;
mod protocol;
mod server;
mod transport;

pub use client::*;
pub use protocol::*;
pub use server::*;
pub use transport::*;
