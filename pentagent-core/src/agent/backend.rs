//! Agent tools that reach MCP backends through the shared [`ToolInvoker`]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::capability::{AgentTool, ToolKind};
use crate::tools::{ToolInvoker, with_scheme};
use crate::{Error, Result};

/// One backend operation exposed as an agent tool
pub struct BackendTool {
    name: &'static str,
    kind: ToolKind,
    backend: &'static str,
    operation: &'static str,
    invoker: Arc<Mutex<ToolInvoker>>,
}

impl BackendTool {
    /// `WebSearchTool`: `websearch/search`
    pub fn web_search(invoker: Arc<Mutex<ToolInvoker>>) -> Self {
        Self {
            name: "WebSearchTool",
            kind: ToolKind::Search,
            backend: "websearch",
            operation: "search",
            invoker,
        }
    }

    /// `RAGTool`: `rag/search`
    pub fn rag(invoker: Arc<Mutex<ToolInvoker>>) -> Self {
        Self {
            name: "RAGTool",
            kind: ToolKind::Retrieve,
            backend: "rag",
            operation: "search",
            invoker,
        }
    }

    /// `SpiderTool`: `zap/spider`
    pub fn spider(invoker: Arc<Mutex<ToolInvoker>>) -> Self {
        Self {
            name: "SpiderTool",
            kind: ToolKind::Spider,
            backend: "zap",
            operation: "spider",
            invoker,
        }
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String> {
        let mut invoker = self.invoker.lock().await;
        invoker.connect_all().await;
        let result = invoker
            .invoke(self.backend, self.operation, arguments)
            .await;
        if result.success {
            Ok(result.output)
        } else {
            Err(Error::Tool(result.error.unwrap_or_else(|| {
                format!("{}/{} failed", self.backend, self.operation)
            })))
        }
    }
}

#[async_trait]
impl AgentTool for BackendTool {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn search(&self, query: &str) -> Result<String> {
        if self.kind != ToolKind::Search {
            return Err(self.unsupported(ToolKind::Search));
        }
        self.call(json!({ "query": query })).await
    }

    async fn retrieve(&self, query: &str) -> Result<String> {
        if self.kind != ToolKind::Retrieve {
            return Err(self.unsupported(ToolKind::Retrieve));
        }
        self.call(json!({ "query": query })).await
    }

    async fn spider(&self, url: &str) -> Result<String> {
        if self.kind != ToolKind::Spider {
            return Err(self.unsupported(ToolKind::Spider));
        }
        self.call(json!({ "url": with_scheme(url) })).await
    }
}

impl std::fmt::Debug for BackendTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendTool")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("operation", &self.operation)
            .finish()
    }
}
