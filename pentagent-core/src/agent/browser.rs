//! HTTP page fetcher

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::capability::{AgentTool, ToolKind};
use crate::state::session::truncate;
use crate::tools::with_scheme;
use crate::{Error, Result};

/// Page content kept per fetch
pub const MAX_PAGE_CHARS: usize = 20_000;

/// Fetches a page with a plain GET and returns status line plus body
pub struct WebBrowserTool {
    client: reqwest::Client,
}

impl WebBrowserTool {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pentagent/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AgentTool for WebBrowserTool {
    fn name(&self) -> &str {
        "WebBrowserTool"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Browse
    }

    async fn browse(&self, url: &str) -> Result<String> {
        if url.is_empty() {
            return Err(Error::Tool("No URL given".into()));
        }
        let url = with_scheme(url);
        debug!(url = %url, "Fetching page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(format!(
            "HTTP {}\n{}",
            status.as_u16(),
            truncate(&body, MAX_PAGE_CHARS)
        ))
    }
}

impl std::fmt::Debug for WebBrowserTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebBrowserTool").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_browse_returns_status_and_body() {
        let url = serve_once("<p>results for <script>alert(1)</script></p>").await;
        let browser = WebBrowserTool::new(Duration::from_secs(5)).unwrap();

        let page = browser.browse(&format!("{}/search?q=x", url)).await.unwrap();
        assert!(page.starts_with("HTTP 200\n"));
        assert!(page.contains("<script>alert(1)</script>"));
    }

    #[tokio::test]
    async fn test_browse_requires_url() {
        let browser = WebBrowserTool::new(Duration::from_secs(1)).unwrap();
        assert!(matches!(browser.browse("").await, Err(Error::Tool(_))));
    }
}
