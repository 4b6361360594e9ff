//! pentagent-core: LLM-driven security assessment library.
//!
//! Two drivers share one tool layer: the phase [`orchestrator`] runs a fixed
//! four-phase assessment, the [`agent`] loop plans and picks tools itself.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod agent;
pub mod config;
pub mod decision;
pub mod docker;
pub mod error;
pub mod mcp;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod state;
pub mod strategies;
pub mod tools;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Error, Result};
