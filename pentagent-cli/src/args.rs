//! CLI argument parsing

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pentagent")]
#[command(author, version, about = "LLM-driven security assessment orchestrator")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Load prompt templates from this file instead of the built-in set
    #[arg(long, global = true)]
    pub prompts: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a four-phase security assessment of a target
    Scan {
        /// Domain, IP address or URL
        target: String,

        /// Custom instructions; defaults to a comprehensive assessment request
        #[arg(short, long)]
        message: Option<String>,

        /// Model as provider/model, e.g. ollama/llama3
        #[arg(long)]
        model: Option<String>,
    },

    /// Send a message; conversational input gets a direct reply
    Chat {
        message: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Let the autonomous agent work toward a goal
    Agent {
        /// High-level goal, e.g. "Scan https://example.com/search?q=x for reflected XSS"
        #[arg(long)]
        task: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// List the operations each tool backend exposes
    Tools {
        /// Only this backend
        #[arg(long)]
        backend: Option<String>,
    },
}

impl Command {
    /// Model override given on the command line
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Scan { model, .. } | Self::Chat { model, .. } | Self::Agent { model, .. } => {
                model.as_deref()
            }
            Self::Tools { .. } => None,
        }
    }
}
