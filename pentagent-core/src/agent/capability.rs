//! Capability interface for the tools the autonomous loop can drive

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, Result};

/// Which capability method a tool is driven through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Execute,
    Browse,
    Search,
    Retrieve,
    Spider,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Execute => "execute",
            Self::Browse => "browse",
            Self::Search => "search",
            Self::Retrieve => "retrieve",
            Self::Spider => "spider",
        };
        f.write_str(name)
    }
}

/// A tool the agent names in `Use <ToolName>: <argument>` lines.
///
/// Implementors override the method matching their [`ToolKind`]; the
/// others report the capability as unsupported.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ToolKind;

    async fn execute(&self, _command: &str) -> Result<String> {
        Err(self.unsupported(ToolKind::Execute))
    }

    async fn browse(&self, _url: &str) -> Result<String> {
        Err(self.unsupported(ToolKind::Browse))
    }

    async fn search(&self, _query: &str) -> Result<String> {
        Err(self.unsupported(ToolKind::Search))
    }

    async fn retrieve(&self, _query: &str) -> Result<String> {
        Err(self.unsupported(ToolKind::Retrieve))
    }

    async fn spider(&self, _url: &str) -> Result<String> {
        Err(self.unsupported(ToolKind::Spider))
    }

    /// Command that installs `program`, for tools that can recover from
    /// a missing binary
    fn install_command(&self, _program: &str) -> Option<String> {
        None
    }

    fn unsupported(&self, kind: ToolKind) -> Error {
        Error::Tool(format!("{} does not support {}", self.name(), kind))
    }
}

/// Route `argument` to the capability method selected by the tool's kind
pub async fn dispatch(tool: &dyn AgentTool, argument: &str) -> Result<String> {
    let argument = argument.trim();
    match tool.kind() {
        ToolKind::Execute => tool.execute(argument).await,
        ToolKind::Browse => {
            let url = argument
                .strip_prefix("browse ")
                .map(str::trim)
                .unwrap_or(argument);
            tool.browse(url).await
        }
        ToolKind::Search => tool.search(argument).await,
        ToolKind::Retrieve => tool.retrieve(argument).await,
        ToolKind::Spider => tool.spider(argument).await,
    }
}

/// Tools available to one agent, looked up by name
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing one with the same name
    pub fn with_tool(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
