//! Static catalog of tool backends

use std::fmt;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::mcp::McpServer;

/// How a backend is reached
#[derive(Clone)]
pub enum BackendEndpoint {
    /// Child process speaking MCP on stdio
    Stdio { command: String, args: Vec<String> },
    /// Server living in this process
    InProcess(Arc<McpServer>),
}

impl fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio { command, args } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .finish(),
            Self::InProcess(server) => f.debug_tuple("InProcess").field(&server.name()).finish(),
        }
    }
}

/// One backend: connection parameters plus the operations it is known to expose
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub name: String,
    pub endpoint: BackendEndpoint,
    pub operations: Vec<String>,
}

/// Operations the reference backends expose
pub fn known_operations(backend: &str) -> &'static [&'static str] {
    match backend {
        "kali" => &[
            "nmap",
            "sublist3r",
            "whatweb",
            "google_dork",
            "gobuster",
            "nikto",
            "nuclei",
            "hydra",
            "metasploit",
            "shell_command",
            "recon-ng",
        ],
        "websearch" => &["search", "search_news"],
        "rag" => &["search", "store", "get_category", "list_categories"],
        "zap" => &[
            "spider",
            "active_scan",
            "passive_scan",
            "alerts",
            "urls",
            "report",
        ],
        _ => &[],
    }
}

/// Registry of tool backends. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<BackendSpec>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured stdio backends
    pub fn from_config(backends: &[BackendConfig]) -> Self {
        backends.iter().fold(Self::new(), |registry, b| {
            registry.with_backend(
                &b.name,
                BackendEndpoint::Stdio {
                    command: b.command.clone(),
                    args: b.args.clone(),
                },
            )
        })
    }

    /// Add a backend, replacing any backend with the same name
    pub fn with_backend(mut self, name: &str, endpoint: BackendEndpoint) -> Self {
        let spec = BackendSpec {
            name: name.to_string(),
            endpoint,
            operations: known_operations(name)
                .iter()
                .map(|op| op.to_string())
                .collect(),
        };
        match self.backends.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = spec,
            None => self.backends.push(spec),
        }
        self
    }

    /// Add an in-process backend
    pub fn with_in_process(self, name: &str, server: Arc<McpServer>) -> Self {
        self.with_backend(name, BackendEndpoint::InProcess(server))
    }

    /// Get a backend by name
    pub fn get(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Get all backends, in registration order
    pub fn all(&self) -> &[BackendSpec] {
        &self.backends
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name.as_str()).collect()
    }
}
