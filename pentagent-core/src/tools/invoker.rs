//! Tool invocation layer: backend connections, per-phase operation tables
//! and result collection

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ToolsConfig;
use crate::mcp::{McpClient, McpToolDefinition};
use crate::state::{MetricsTracker, Phase, ToolResult};
use crate::tools::arguments::{ArgumentContext, prepare_arguments};
use crate::tools::registry::{BackendEndpoint, BackendRegistry};
use crate::{Error, Result};

/// Upper bound on one backend's handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend → operations run during a phase
pub type PhaseOperations = &'static [(&'static str, &'static [&'static str])];

/// What a phase knows when its operations are prepared
#[derive(Debug, Clone, Default)]
pub struct PhaseContext {
    /// Findings of every earlier phase, in order
    pub previous_findings: Vec<String>,
    /// Target host without scheme, credentials, path or port
    pub domain: String,
    /// Resolved IP, or the original target when resolution failed
    pub address: String,
}

/// Operation name and description as listed by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
}

impl From<McpToolDefinition> for OperationInfo {
    fn from(def: McpToolDefinition) -> Self {
        Self {
            name: def.name,
            description: def.description,
        }
    }
}

/// Owns the live connections for one session
pub struct ToolInvoker {
    registry: BackendRegistry,
    connections: HashMap<String, McpClient>,
    session_open: bool,
    call_timeout: Duration,
    address_operations: Vec<String>,
    metrics: MetricsTracker,
}

impl ToolInvoker {
    pub fn new(registry: BackendRegistry, config: &ToolsConfig, metrics: MetricsTracker) -> Self {
        Self {
            registry,
            connections: HashMap::new(),
            session_open: false,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            address_operations: config.address_operations.clone(),
            metrics,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn is_connected(&self, backend: &str) -> bool {
        self.connections.contains_key(backend)
    }

    /// Connected backend names, in registry order
    pub fn connected_backends(&self) -> Vec<&str> {
        self.registry
            .names()
            .into_iter()
            .filter(|name| self.connections.contains_key(*name))
            .collect()
    }

    /// Open a connection to every registered backend.
    ///
    /// Failures are logged and the backend stays unavailable until the next
    /// session. Calling this again before [`disconnect_all`](Self::disconnect_all)
    /// does nothing.
    pub async fn connect_all(&mut self) {
        if self.session_open {
            return;
        }
        self.session_open = true;

        let backends = self.registry.all().to_vec();
        for backend in backends {
            let connect = async {
                match &backend.endpoint {
                    BackendEndpoint::Stdio { command, args } => {
                        McpClient::connect_stdio(&backend.name, command, args).await
                    }
                    BackendEndpoint::InProcess(server) => {
                        McpClient::connect_in_process(&backend.name, server.clone()).await
                    }
                }
            };

            match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
                Ok(Ok(client)) => {
                    info!(backend = %backend.name, "Connected to tool backend");
                    self.connections.insert(backend.name.clone(), client);
                }
                Ok(Err(e)) => {
                    warn!(backend = %backend.name, "Failed to connect to tool backend: {}", e);
                }
                Err(_) => {
                    warn!(
                        backend = %backend.name,
                        "Timed out connecting to tool backend after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    );
                }
            }
        }
    }

    /// Close every open connection. Safe to call repeatedly.
    pub async fn disconnect_all(&mut self) {
        for (name, mut client) in self.connections.drain() {
            if let Err(e) = client.close().await {
                warn!(backend = %name, "Error closing tool backend: {}", e);
            } else {
                debug!(backend = %name, "Disconnected tool backend");
            }
        }
        self.session_open = false;
    }

    /// Operations a connected backend exposes
    pub async fn list_operations(&mut self, backend: &str) -> Result<Vec<OperationInfo>> {
        let client = self
            .connections
            .get_mut(backend)
            .ok_or_else(|| Error::NotConnected(backend.to_string()))?;

        let tools = tokio::time::timeout(self.call_timeout, client.list_tools())
            .await
            .map_err(|_| Error::Tool(format!("Listing operations of {} timed out", backend)))??;
        Ok(tools.into_iter().map(OperationInfo::from).collect())
    }

    /// Call one operation. Every failure is folded into the returned result.
    pub async fn invoke(&mut self, backend: &str, operation: &str, arguments: Value) -> ToolResult {
        let start = Instant::now();
        debug!(backend, operation, %arguments, "Invoking operation");

        let outcome = match self.connections.get_mut(backend) {
            None => Err(Error::NotConnected(backend.to_string())),
            Some(client) => {
                match tokio::time::timeout(self.call_timeout, client.call_tool(operation, arguments))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::Tool(format!(
                        "{} timed out after {}s",
                        operation,
                        self.call_timeout.as_secs()
                    ))),
                }
            }
        };

        let duration = start.elapsed().as_secs_f64();
        self.metrics.record_tool_call(outcome.is_ok());

        match outcome {
            Ok(output) => {
                info!(backend, operation, duration, "Operation succeeded");
                ToolResult::success(operation, output, duration)
            }
            Err(e) => {
                warn!(backend, operation, duration, "Operation failed: {}", e);
                ToolResult::failure(operation, e.to_string(), duration)
            }
        }
    }

    /// Backend/operation pairs run during `phase`
    pub fn operations_for_phase(phase: Phase) -> PhaseOperations {
        match phase {
            Phase::InformationGathering => &[
                ("kali", &["nmap", "sublist3r", "whatweb", "google_dork"]),
                ("websearch", &["search", "search_news"]),
                ("rag", &["search", "list_categories"]),
            ],
            Phase::Spidering => &[
                ("kali", &["gobuster", "nikto", "whatweb"]),
                ("websearch", &["search"]),
                ("rag", &["search", "store"]),
            ],
            Phase::ActiveScanning => &[
                ("kali", &["nuclei", "nikto", "hydra", "metasploit"]),
                ("websearch", &["search"]),
                ("rag", &["search", "store"]),
            ],
            Phase::Evaluation => &[
                ("kali", &["shell_command"]),
                ("websearch", &["search"]),
                ("rag", &["search", "get_category", "list_categories"]),
            ],
        }
    }

    /// Run every operation of `phase` in table order, one result per pair
    pub async fn execute_phase_operations(
        &mut self,
        phase: Phase,
        target: &str,
        context: &PhaseContext,
    ) -> Vec<ToolResult> {
        let address_operations = self.address_operations.clone();
        let args_ctx = ArgumentContext {
            target,
            domain: &context.domain,
            address: &context.address,
            phase,
            previous_findings: &context.previous_findings,
            address_operations: &address_operations,
        };

        let mut results = Vec::new();
        for (backend, operations) in Self::operations_for_phase(phase) {
            for operation in operations.iter() {
                let arguments = prepare_arguments(operation, &args_ctx);
                results.push(self.invoke(backend, operation, arguments).await);
            }
        }
        results
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("backends", &self.registry.names())
            .field("connected", &self.connected_backends())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
