//! Kali container tool

use async_trait::async_trait;

use super::capability::{AgentTool, ToolKind};
use crate::Result;
use crate::docker::KaliContainer;

/// Runs commands inside the Kali tool container and can install missing
/// packages there
pub struct KaliContainerTool {
    container: KaliContainer,
}

impl KaliContainerTool {
    pub fn new(container: KaliContainer) -> Self {
        Self { container }
    }
}

#[async_trait]
impl AgentTool for KaliContainerTool {
    fn name(&self) -> &str {
        "KaliContainerTool"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Execute
    }

    async fn execute(&self, command: &str) -> Result<String> {
        let result = self.container.exec(command).await?;
        let mut text = result.output();
        if !result.success() {
            text.push_str(&format!("\n[exit code {}]", result.exit_code));
        }
        Ok(text)
    }

    fn install_command(&self, program: &str) -> Option<String> {
        Some(install_command_for(program))
    }
}

/// Package install line for a missing program
pub fn install_command_for(program: &str) -> String {
    format!(
        "apt-get update -qq && DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
        program
    )
}

impl std::fmt::Debug for KaliContainerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaliContainerTool")
            .field("container", &self.container.container())
            .finish()
    }
}
