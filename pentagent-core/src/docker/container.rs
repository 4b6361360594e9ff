//! Command execution inside a running tool container

use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::StreamExt;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::Result;

/// Maximum output size in bytes (10MB)
const MAX_OUTPUT_SIZE: usize = 10_485_760;

/// Handle on an already-running container, addressed by name
pub struct KaliContainer {
    docker: Docker,
    container: String,
    timeout: Duration,
}

impl KaliContainer {
    /// Attach to the local Docker daemon. No request is made until the
    /// first [`exec`](Self::exec).
    pub fn connect(container: impl Into<String>, timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            container: container.into(),
            timeout,
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Run `command` through a login bash shell in the container
    pub async fn exec(&self, command: &str) -> Result<ExecResult> {
        debug!(container = %self.container, "Executing: {}", command);

        let exec_config = CreateExecOptions {
            cmd: Some(vec![
                "/bin/bash".to_string(),
                "-l".to_string(),
                "-c".to_string(),
                command.to_string(),
            ]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self.docker.create_exec(&self.container, exec_config).await?;

        let mut output = OutputBuffer::default();

        if let StartExecResults::Attached {
            output: mut stream, ..
        } = self.docker.start_exec(&exec.id, None).await?
        {
            let stream_result = tokio::time::timeout(self.timeout, async {
                while let Some(msg) = stream.next().await {
                    match msg {
                        Ok(LogOutput::StdOut { message }) => {
                            output.push(&String::from_utf8_lossy(&message), false)
                        }
                        Ok(LogOutput::StdErr { message }) => {
                            output.push(&String::from_utf8_lossy(&message), true)
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Error reading exec output: {}", e),
                    }
                }
            })
            .await;

            if stream_result.is_err() {
                warn!(
                    container = %self.container,
                    "Command execution timed out after {} seconds",
                    self.timeout.as_secs()
                );
                return Ok(ExecResult {
                    stdout: output.stdout,
                    stderr: format!(
                        "Command timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                    exit_code: -1,
                });
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: inspect.exit_code.unwrap_or(-1),
        })
    }
}

#[derive(Default)]
struct OutputBuffer {
    stdout: String,
    stderr: String,
    total_size: usize,
    truncated: bool,
}

impl OutputBuffer {
    fn push(&mut self, chunk: &str, is_stderr: bool) {
        if self.truncated {
            return;
        }
        let target = if is_stderr {
            &mut self.stderr
        } else {
            &mut self.stdout
        };
        self.total_size += chunk.len();
        if self.total_size > MAX_OUTPUT_SIZE {
            self.truncated = true;
            target.push_str("\n[OUTPUT TRUNCATED - exceeded 10MB limit]");
        } else {
            target.push_str(chunk);
        }
    }
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl ExecResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output
    pub fn output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}
