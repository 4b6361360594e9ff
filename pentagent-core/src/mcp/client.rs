//! MCP client: handshake, operation listing and calls over a [`Transport`]

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::mcp::McpServer;
use crate::mcp::protocol::{JsonRpcRequest, McpToolDefinition, McpToolResult, PROTOCOL_VERSION};
use crate::mcp::transport::{InProcessTransport, StdioTransport, Transport};
use crate::{Error, Result};

/// Connection to one tool backend
pub struct McpClient {
    name: String,
    transport: Box<dyn Transport>,
    next_id: u64,
    server_info: Option<Value>,
}

impl McpClient {
    pub fn new(name: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            next_id: 1,
            server_info: None,
        }
    }

    /// Spawn a stdio backend and run the handshake
    pub async fn connect_stdio(name: &str, command: &str, args: &[String]) -> Result<Self> {
        let transport = StdioTransport::spawn(name, command, args)?;
        let mut client = Self::new(name, Box::new(transport));
        if let Err(e) = client.initialize().await {
            let _ = client.close().await;
            return Err(e);
        }
        Ok(client)
    }

    /// Attach to an in-process server and run the handshake
    pub async fn connect_in_process(name: &str, server: Arc<McpServer>) -> Result<Self> {
        let mut client = Self::new(name, Box::new(InProcessTransport::new(server)));
        client.initialize().await?;
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `serverInfo` from the handshake
    pub fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    /// `initialize` followed by `notifications/initialized`
    pub async fn initialize(&mut self) -> Result<()> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "pentagent",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self.call("initialize", Some(params)).await?;
        self.server_info = result.get("serverInfo").cloned();

        self.transport
            .notify(JsonRpcRequest::new("notifications/initialized"))
            .await?;
        debug!(backend = %self.name, "handshake complete");
        Ok(())
    }

    /// Operations the backend exposes
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolDefinition>> {
        let result = self.call("tools/list", None).await?;
        let tools = result.get("tools").cloned().unwrap_or(Value::Array(vec![]));
        Ok(serde_json::from_value(tools)?)
    }

    /// Call an operation and return its text output.
    ///
    /// An `isError` result becomes [`Error::Tool`] carrying the error text.
    pub async fn call_tool(&mut self, operation: &str, arguments: Value) -> Result<String> {
        let params = serde_json::json!({
            "name": operation,
            "arguments": arguments,
        });
        let result = self.call("tools/call", Some(params)).await?;
        let result: McpToolResult = serde_json::from_value(result)?;

        if result.is_error() {
            let text = result.text_output();
            let message = if text.is_empty() {
                format!("{} reported an error", operation)
            } else {
                text
            };
            return Err(Error::Tool(message));
        }
        Ok(result.text_output())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut request = JsonRpcRequest::new(method).with_id(id);
        if let Some(params) = params {
            request = request.with_params(params);
        }
        self.transport.request(request).await?.into_result()
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("name", &self.name)
            .field("next_id", &self.next_id)
            .finish()
    }
}
