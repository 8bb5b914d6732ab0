//! Google search tool: scrapes the result page for snippets and links.
//!
//! Every argument whose key looks like a query (`q`, `query`, `search`,
//! `args`, ...) is searched; queries run concurrently. A failed search is
//! reported to the model as a plain "failed" reply, never as an error, so
//! the mission can carry on.

use async_trait::async_trait;
use futures::future::join_all;
use missionclaw_core::error::ToolError;
use missionclaw_core::tool::{Arguments, Tool, ToolOutcome};
use regex_lite::Regex;
use reqwest::Url;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::html;

const DEFAULT_ENDPOINT: &str = "https://www.google.com/search";

static QUERY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(args?|name|q|query|s|search|f|find)\b").expect("static regex"));
static RESULT_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a\s[^>]*?href=["']([^"']*)["'][^>]*>\s*<h3"#).expect("static regex"));

/// One scraped result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub snippet: String,
}

pub struct GoogleSearchTool {
    client: reqwest::Client,
    endpoint: String,
    result_limit: Option<usize>,
}

impl GoogleSearchTool {
    pub fn new() -> Self {
        Self::with_proxy(None)
    }

    /// Build a tool whose requests go through `proxy`, if given.
    pub fn with_proxy(proxy: Option<&str>) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)")
            .timeout(std::time::Duration::from_secs(30));
        if let Some(proxy) = proxy {
            match reqwest::Proxy::all(proxy) {
                Ok(p) => builder = builder.proxy(p),
                Err(e) => warn!(proxy, error = %e, "Ignoring invalid search proxy"),
            }
        }
        Self {
            client: builder.build().unwrap_or_default(),
            endpoint: DEFAULT_ENDPOINT.into(),
            result_limit: None,
        }
    }

    pub fn with_result_limit(mut self, limit: Option<usize>) -> Self {
        self.result_limit = limit.filter(|l| *l > 0);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, query: &str) -> Result<String, String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("hl", "en")])
            .header("Accept", "text/html,application/xhtml+xml,application/xml")
            .header("Accept-Language", "en")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }
        let body = response.text().await.map_err(|e| e.to_string())?;

        let hits = parse_results(&body, self.result_limit);
        debug!(query, hits = hits.len(), "Search finished");
        Ok(format_hits(&hits))
    }
}

impl Default for GoogleSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Queries in argument order, taken from every query-like key.
pub fn queries(args: &Arguments) -> Vec<&str> {
    args.iter()
        .filter(|(key, value)| QUERY_KEY.is_match(key) && !value.trim().is_empty())
        .map(|(_, value)| value.as_str())
        .collect()
}

/// Extract results from a search result page.
pub fn parse_results(page: &str, limit: Option<usize>) -> Vec<SearchHit> {
    let anchors: Vec<(usize, String)> = RESULT_ANCHOR
        .captures_iter(page)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let href = html::decode_entities(caps.get(1)?.as_str());
            Some((start, href))
        })
        .collect();

    let mut hits = Vec::new();
    for (i, (start, href)) in anchors.iter().enumerate() {
        let end = anchors.get(i + 1).map_or(page.len(), |(next, _)| *next);
        let Some(url) = target_url(href) else {
            continue;
        };

        let section = &page[*start..end];
        let section = match section.find("Related searches") {
            Some(cut) => &section[..cut],
            None => section,
        };
        let snippet = html::to_text(section)
            .lines()
            .map(|l| l.trim_start_matches('-').trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n  ");
        if snippet.is_empty() {
            continue;
        }

        hits.push(SearchHit { url, snippet });
        if limit.is_some_and(|l| hits.len() >= l) {
            break;
        }
    }
    hits
}

/// Result links are either direct, or `/url?q=<target>&...` redirects.
fn target_url(href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        let url = Url::parse(href).ok()?;
        let is_google = url.host_str().is_some_and(|h| h.contains(".google."));
        return (!is_google).then(|| url.to_string());
    }
    if !href.starts_with("/url?") {
        return None;
    }
    let redirect = Url::parse(&format!("https://www.google.com{href}")).ok()?;
    redirect
        .query_pairs()
        .map(|(_, v)| v.into_owned())
        .find(|v| v.starts_with("http://") || v.starts_with("https://"))
}

fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "nothing found.".into();
    }
    hits.iter()
        .map(|h| format!("- {}\n  link: {}", h.snippet, h.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "Search"
    }

    fn command(&self) -> &str {
        "google_search"
    }

    fn aliases(&self) -> &[&str] {
        &["google", "search", "google search"]
    }

    fn arg_names(&self) -> &[&str] {
        &["query"]
    }

    fn description(&self) -> &str {
        "Search the web with Google and get snippets with links"
    }

    async fn execute(&self, args: &Arguments) -> Result<ToolOutcome, ToolError> {
        let queries = queries(args);
        if queries.is_empty() {
            return Err(ToolError::InvalidArguments("Missing 'query' argument".into()));
        }

        let results = join_all(queries.iter().map(|q| self.search(q))).await;

        let mut sections = Vec::with_capacity(results.len());
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(text) => sections.push(format!("Search Google for \"{query}\" got:\n{text}")),
                Err(reason) => {
                    warn!(query, %reason, "Search failed");
                    return Ok(ToolOutcome::reply("failed")
                        .with_speak(format!("Search Google for \"{}\" failed.", queries.join(", "))));
                }
            }
        }

        let reply = sections.join("\n\n");
        Ok(ToolOutcome::reply(reply.clone()).with_speak(reply))
    }
}
