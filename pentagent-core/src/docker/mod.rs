//! Docker integration module

pub mod container;

pub use container::{ExecResult, KaliContainer};
