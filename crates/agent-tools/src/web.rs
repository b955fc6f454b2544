//! Web Tool Source
//!
//! An external tool collection backed by a shared HTTP session. The session
//! is opened when the tool box is built and closed by its shutdown hook.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use agent_core::{
    tool::ParameterSchema, AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, ToolSource,
};

use crate::error::{Result, ToolkitError};

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Page text beyond this many characters is cut off
    pub max_chars: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("agent-tools/", env!("CARGO_PKG_VERSION")).into(),
            timeout: Duration::from_secs(20),
            max_chars: 8000,
        }
    }
}

type SharedSession = Arc<RwLock<Option<reqwest::Client>>>;

pub struct WebToolSource {
    config: WebConfig,
    session: SharedSession,
}

impl WebToolSource {
    pub fn new(config: WebConfig) -> Self {
        Self {
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl Default for WebToolSource {
    fn default() -> Self {
        Self::new(WebConfig::default())
    }
}

#[async_trait]
impl ToolSource for WebToolSource {
    fn name(&self) -> &str {
        "web"
    }

    async fn load(&self) -> CoreResult<Vec<Arc<dyn Tool>>> {
        let client = reqwest::Client::builder()
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| AgentError::Other(format!("web session failed to start: {}", e)))?;
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
        tracing::info!("Web session opened");

        Ok(vec![Arc::new(FetchPageTool {
            session: self.session.clone(),
            max_chars: self.config.max_chars,
        })])
    }

    async fn shutdown(&self) -> CoreResult<()> {
        self.session.write().unwrap_or_else(PoisonError::into_inner).take();
        tracing::info!("Web session closed");
        Ok(())
    }
}

/// Fetch a page and return its readable text
pub struct FetchPageTool {
    session: SharedSession,
    max_chars: usize,
}

impl FetchPageTool {
    async fn fetch(&self, url: &str) -> Result<String> {
        let client = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ToolkitError::SessionClosed)?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolkitError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("html"));
        let body = response.text().await?;
        let text = if is_html { html_to_text(&body) } else { body };
        Ok(truncate_chars(&text, self.max_chars))
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fetch_page".into(),
            description: "Open a web page and return its text content.".into(),
            parameters: vec![ParameterSchema::required("url", "string", "Absolute http(s) URL")],
            category: Some("search".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let url = call.str_arg("url").unwrap_or_default().trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Ok(ToolResult::failure("fetch_page", format!("not an http(s) URL: '{}'", url)));
        }

        Ok(match self.fetch(url).await {
            Ok(text) => ToolResult::success("fetch_page", text),
            Err(e) => ToolResult::failure("fetch_page", e.to_string()),
        })
    }
}

/// Strip markup, scripts and styles; collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        out.push(' ');
        let tag = &rest[open..];
        let lower = tag.get(..8).unwrap_or(tag).to_ascii_lowercase();
        let skip_to = if lower.starts_with("<script") {
            find_ci(tag, "</script>")
        } else if lower.starts_with("<style") {
            find_ci(tag, "</style>")
        } else {
            None
        };
        let resume = match skip_to {
            Some(end) => tag[end..].find('>').map(|i| end + i + 1),
            None => tag.find('>').map(|i| i + 1),
        };
        match resume {
            Some(i) => rest = &tag[i..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);

    decode_entities(&out).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode character references in one pass. Unknown names are kept as written.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end + 1]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value);
    }
    match name {
        "nbsp" => Some(' '),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => None,
    }
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_html_to_text() {
        let html = r#"<html><head><style>p { color: red; }</style><script>var x = "<b>";</script></head>
            <body><h1>Luis D&iacute;az</h1><p>Plays for   Liverpool &amp; Colombia.</p></body></html>"#;
        assert_eq!(html_to_text(html), "Luis D&iacute;az Plays for Liverpool & Colombia.");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(
            html_to_text("<p>Rock &#39;n&#39; roll &#8212; caf&#xE9; &#X41;&amp;lt;</p>"),
            "Rock 'n' roll \u{2014} caf\u{e9} A&lt;"
        );
        assert_eq!(html_to_text("AT&T &#xZZ; &#99999999;"), "AT&T &#xZZ; &#99999999;");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let source = WebToolSource::default();
        assert!(!source.is_open());

        let tools = source.load().await.unwrap();
        assert_eq!(tools[0].schema().name, "fetch_page");
        assert!(source.is_open());

        source.shutdown().await.unwrap();
        assert!(!source.is_open());

        let result = tools[0]
            .execute(&ToolCall::new("c1", "fetch_page", json!({"url": "http://127.0.0.1:9/"})))
            .await
            .unwrap();
        assert_eq!(result.to_text(), "Error: Web session is closed");
    }

    #[tokio::test]
    async fn test_fetches_local_page() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();

            let body = "<html><body><p>Hello from the test page</p></body></html>";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let source = WebToolSource::default();
        let tools = source.load().await.unwrap();
        let result = tools[0]
            .execute(&ToolCall::new("c1", "fetch_page", json!({"url": format!("http://{}/page", addr)})))
            .await
            .unwrap();

        assert_eq!(result.output, "Hello from the test page");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let source = WebToolSource::default();
        let tools = source.load().await.unwrap();
        let result = tools[0]
            .execute(&ToolCall::new("c1", "fetch_page", json!({"url": "file:///etc/passwd"})))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
