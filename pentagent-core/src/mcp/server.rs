//! In-process MCP server.
//!
//! Backs the in-process transport: tool backends embedded in the host
//! application, and stand-in backends for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Result;
use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, McpToolCall, McpToolDefinition, McpToolResult,
    PROTOCOL_VERSION, error_codes,
};

/// Trait for MCP tools
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (must be unique)
    fn name(&self) -> &str;

    /// Tool description
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool with given arguments
    async fn execute(&self, arguments: Value) -> Result<McpToolResult>;
}

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<McpToolResult>> + Send + Sync>;

/// Tool backed by a closure
pub struct FnTool {
    name: String,
    description: String,
    schema: Value,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<McpToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({ "type": "object" }),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

#[async_trait]
impl McpTool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<McpToolResult> {
        (self.handler)(arguments).await
    }
}

/// MCP Server that manages tools and handles requests
pub struct McpServer {
    tools: RwLock<BTreeMap<String, Arc<dyn McpTool>>>,
    server_name: String,
    server_version: String,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            server_name: name.into(),
            server_version: version.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.server_name
    }

    /// Register a tool, replacing any tool with the same name
    pub async fn register_tool(&self, tool: Arc<dyn McpTool>) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name().to_string(), tool);
    }

    /// Handle an incoming JSON-RPC message. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(server = %self.server_name, method = %request.method, "notification");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
            "tools/list" => self.handle_list_tools(request.id).await,
            "tools/call" => self.handle_call_tool(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            }),
        )
    }

    async fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = self.tools.read().await;
        let tool_defs: Vec<McpToolDefinition> = tools
            .values()
            .map(|t| McpToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();

        JsonRpcResponse::success(id, serde_json::json!({ "tools": tool_defs }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing params for tools/call",
            );
        };

        let call: McpToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid tool call params: {}", e),
                );
            }
        };

        let tool = {
            let tools = self.tools.read().await;
            match tools.get(&call.name) {
                Some(t) => Arc::clone(t),
                None => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::METHOD_NOT_FOUND,
                        format!("Unknown tool: {}", call.name),
                    );
                }
            }
        };

        // Tool failures are reported in-band with isError, as MCP servers do
        let result = tool
            .execute(call.arguments)
            .await
            .unwrap_or_else(|e| McpToolResult::error(e.to_string()));

        match serde_json::to_value(result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => JsonRpcResponse::error(
                id,
                error_codes::INTERNAL_ERROR,
                format!("Failed to serialize tool result: {}", e),
            ),
        }
    }
}
