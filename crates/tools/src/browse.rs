//! Browse website tool: fetches a page and hands its text to the model.

use async_trait::async_trait;
use missionclaw_core::error::ToolError;
use missionclaw_core::tool::{Arguments, Tool, ToolOutcome};
use reqwest::Url;
use tracing::debug;

use crate::html;

/// Maximum characters of page text fed back to the model.
const MAX_CONTENT_CHARS: usize = 8000;

const REPLY_HEAD: &str = "content:\n";
const REPLY_TAIL: &str = "\nNow use the page content to continue the tasks and goals, please.";

pub struct BrowseTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl BrowseTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Mozilla/5.0 (compatible; missionclaw/", env!("CARGO_PKG_VERSION"), ")"))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_chars: MAX_CONTENT_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Fetch `url` and return its readable text.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, ToolError> {
        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "browse_website".into(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP error: {status}")));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        debug!(url = %url, bytes = body.len(), "Page fetched");

        Ok(if is_html { html::to_text(&body) } else { body.trim().to_string() })
    }
}

impl Default for BrowseTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept only absolute http(s) URLs.
pub fn parse_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Remove the framing added around a browse reply.
pub fn strip_reply_framing(reply: &str) -> &str {
    let body = reply.strip_prefix(REPLY_HEAD).unwrap_or(reply);
    body.strip_suffix(REPLY_TAIL).unwrap_or(body)
}

#[async_trait]
impl Tool for BrowseTool {
    fn name(&self) -> &str {
        "Browse Website"
    }

    fn command(&self) -> &str {
        "browse_website"
    }

    fn aliases(&self) -> &[&str] {
        &["browse", "browse_web", "visit", "open_url"]
    }

    fn arg_names(&self) -> &[&str] {
        &["url"]
    }

    fn description(&self) -> &str {
        "Open a web page and read its text content"
    }

    async fn execute(&self, args: &Arguments) -> Result<ToolOutcome, ToolError> {
        let raw = args
            .get("url")
            .or_else(|| args.values().find(|v| parse_url(v).is_some()))
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;
        let url = parse_url(raw).ok_or_else(|| ToolError::InvalidArguments(format!("Invalid URL: {raw}")))?;

        let text = self.fetch_text(&url).await?;
        let text = html::truncate_chars(&text, self.max_chars);

        Ok(ToolOutcome::reply(format!("{REPLY_HEAD}{text}{REPLY_TAIL}"))
            .with_speak(format!("Read {} characters from {url}", text.chars().count())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn serve_page(body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/page")
    }

    #[test]
    fn url_validation() {
        assert!(parse_url("https://example.com").is_some());
        assert!(parse_url(" http://example.com/a?b=c ").is_some());
        assert!(parse_url("ftp://example.com").is_none());
        assert!(parse_url("example.com").is_none());
    }

    #[test]
    fn framing_strips_cleanly() {
        let reply = format!("{REPLY_HEAD}PAGE TEXT{REPLY_TAIL}");
        assert_eq!(strip_reply_framing(&reply), "PAGE TEXT");
        assert_eq!(strip_reply_framing("plain"), "plain");
    }

    #[tokio::test]
    async fn invalid_url_is_argument_error() {
        let mut args = Arguments::new();
        args.insert("url".into(), "not a url".into());
        let err = BrowseTool::new().execute(&args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn fetches_and_frames_page_text() {
        let url = serve_page("<html><body><h1>Title</h1><p>Body text</p></body></html>").await;
        let mut args = Arguments::new();
        args.insert("args".into(), url);

        let outcome = BrowseTool::new().execute(&args).await.unwrap();
        let reply = outcome.reply.unwrap();
        assert_eq!(strip_reply_framing(&reply), "Title\nBody text");
        assert!(reply.ends_with("continue the tasks and goals, please."));
        assert!(!outcome.exit);
    }

    #[tokio::test]
    async fn long_pages_are_truncated() {
        let url = serve_page("<p>abcdefghijklmnopqrstuvwxyz</p>").await;
        let mut args = Arguments::new();
        args.insert("url".into(), url);

        let outcome = BrowseTool::new().with_max_chars(5).execute(&args).await.unwrap();
        assert_eq!(strip_reply_framing(&outcome.reply.unwrap()), "abcde");
    }
}
