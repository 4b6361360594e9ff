//! Autonomous agent loop and the tools it drives

pub mod autonomous;
pub mod backend;
pub mod browser;
pub mod capability;
pub mod kali;
pub mod shell;

pub use autonomous::{AgentOutcome, AutonomousAgent, Investigation, StopReason, XSS_PAYLOADS};
pub use backend::BackendTool;
pub use browser::WebBrowserTool;
pub use capability::{AgentTool, ToolBox, ToolKind, dispatch};
pub use kali::KaliContainerTool;
pub use shell::ShellTool;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AgentLoopConfig;
use crate::docker::KaliContainer;
use crate::tools::ToolInvoker;

/// The full tool set: host shell, Kali container, browser, and the
/// search / knowledge / spider backends.
///
/// Tools whose local prerequisites are missing (no Docker daemon, no TLS
/// backend) are left out with a warning.
pub fn standard_toolbox(config: &AgentLoopConfig, invoker: Arc<Mutex<ToolInvoker>>) -> ToolBox {
    let mut tools = ToolBox::new().with_tool(Arc::new(ShellTool::new(Duration::from_secs(
        config.shell_timeout_secs,
    ))));

    match KaliContainer::connect(
        &config.kali_container,
        Duration::from_secs(config.shell_timeout_secs),
    ) {
        Ok(container) => tools = tools.with_tool(Arc::new(KaliContainerTool::new(container))),
        Err(e) => warn!("KaliContainerTool unavailable: {}", e),
    }

    match WebBrowserTool::new(Duration::from_secs(config.browse_timeout_secs)) {
        Ok(browser) => tools = tools.with_tool(Arc::new(browser)),
        Err(e) => warn!("WebBrowserTool unavailable: {}", e),
    }

    tools
        .with_tool(Arc::new(BackendTool::web_search(invoker.clone())))
        .with_tool(Arc::new(BackendTool::rag(invoker.clone())))
        .with_tool(Arc::new(BackendTool::spider(invoker)))
}
