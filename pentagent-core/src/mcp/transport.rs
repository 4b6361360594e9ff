//! MCP transports: newline-delimited JSON over a child's stdio, or direct
//! calls into an in-process [`McpServer`].

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace};

use crate::mcp::McpServer;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::{Error, Result};

/// One channel to a tool backend. Calls are strictly sequential.
#[async_trait]
pub trait Transport: Send {
    /// Send a request and wait for the response carrying the same id
    async fn request(&mut self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification; no response is read
    async fn notify(&mut self, notification: JsonRpcRequest) -> Result<()>;

    /// Release the channel. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Child process speaking MCP on stdin/stdout
pub struct StdioTransport {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Set while a line is being written. Still set on entry means an
    /// earlier write was abandoned partway and the stream is unusable.
    writing: bool,
}

impl StdioTransport {
    /// Spawn `command args...` with piped stdio. The child is killed when the
    /// transport is dropped.
    pub fn spawn(name: &str, command: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Error::Tool(format!(
                "Failed to spawn backend {} ({}): {}",
                name, command, e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Tool(format!("Failed to capture stdin for {}", name)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Tool(format!("Failed to capture stdout for {}", name)))?;

        // Drain stderr so a chatty backend never blocks on a full pipe
        if let Some(stderr) = child.stderr.take() {
            let backend = name.to_string();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    trace!(backend = %backend, "stderr: {}", line);
                }
            });
        }

        Ok(Self {
            name: name.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            writing: false,
        })
    }

    async fn write_line(&mut self, message: &JsonRpcRequest) -> Result<()> {
        if self.writing {
            self.writing = false;
            self.stdin = None;
            let _ = self.child.start_kill();
            return Err(Error::Protocol(format!(
                "Backend {} connection broken by an interrupted write",
                self.name
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::NotConnected(self.name.clone()))?;

        let mut data = serde_json::to_vec(message)?;
        data.push(b'\n');
        self.writing = true;
        stdin.write_all(&data).await?;
        stdin.flush().await?;
        self.writing = false;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&mut self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.write_line(&request).await?;

        // `next_line` is cancel safe, so a call abandoned by a timeout while
        // reading leaves the stream intact and its late reply is skipped
        // here by id.
        loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                Error::Protocol(format!("Backend {} closed its output", self.name))
            })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response: JsonRpcResponse = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => {
                    trace!(backend = %self.name, "skipping non-JSON output: {}", trimmed);
                    continue;
                }
            };

            if response.id == request.id {
                return Ok(response);
            }
            debug!(
                backend = %self.name,
                expected = ?request.id,
                got = ?response.id,
                "discarding stale response"
            );
        }
    }

    async fn notify(&mut self, notification: JsonRpcRequest) -> Result<()> {
        self.write_line(&notification).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        if self.child.id().is_some() {
            let _ = self.child.kill().await;
        }
        Ok(())
    }
}

/// Direct calls into an in-process server
pub struct InProcessTransport {
    server: Arc<McpServer>,
    closed: bool,
}

impl InProcessTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self {
            server,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn request(&mut self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        if self.closed {
            return Err(Error::NotConnected(self.server.name().to_string()));
        }
        self.server
            .handle_request(request)
            .await
            .ok_or_else(|| Error::Protocol("Server returned no response to a request".into()))
    }

    async fn notify(&mut self, notification: JsonRpcRequest) -> Result<()> {
        if !self.closed {
            self.server.handle_request(notification).await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_process_request_and_close() {
        let mut transport = InProcessTransport::new(Arc::new(McpServer::new("rag", "0.1.0")));
        let resp = transport
            .request(JsonRpcRequest::new("initialize").with_id(1))
            .await
            .unwrap();
        assert_eq!(resp.id, Some(serde_json::json!(1)));

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        let err = transport
            .request(JsonRpcRequest::new("tools/list").with_id(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let result = StdioTransport::spawn("kali", "/nonexistent/pentagent-backend", &[]);
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdio_skips_noise_and_stale_replies() {
        // Replies with a stale id, a log line, then the matching id
        let script = r#"read line
echo 'starting up'
echo '{"jsonrpc":"2.0","id":0,"result":{"stale":true}}'
echo '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}'
"#;
        let mut transport =
            StdioTransport::spawn("fake", "sh", &["-c".to_string(), script.to_string()]).unwrap();
        let resp = transport
            .request(JsonRpcRequest::new("ping").with_id(1))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["ok"], true);
        transport.close().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdio_closed_output_is_protocol_error() {
        let mut transport =
            StdioTransport::spawn("fake", "sh", &["-c".to_string(), "read line".to_string()])
                .unwrap();
        let err = transport
            .request(JsonRpcRequest::new("ping").with_id(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupted_write_breaks_the_connection() {
        // Never reads stdin, so a large request fills the pipe and blocks
        let mut transport =
            StdioTransport::spawn("fake", "sh", &["-c".to_string(), "sleep 30".to_string()])
                .unwrap();
        let big = JsonRpcRequest::new("tools/call")
            .with_id(1)
            .with_params(serde_json::json!({ "blob": "x".repeat(1 << 20) }));
        let first =
            tokio::time::timeout(std::time::Duration::from_millis(200), transport.request(big))
                .await;
        assert!(first.is_err(), "write should still be blocked");

        let second = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            transport.request(JsonRpcRequest::new("ping").with_id(2)),
        )
        .await
        .expect("second request must fail fast");
        assert!(matches!(second, Err(Error::Protocol(_))));

        let third = transport
            .request(JsonRpcRequest::new("ping").with_id(3))
            .await
            .unwrap_err();
        assert!(matches!(third, Error::NotConnected(_)));
    }
}
