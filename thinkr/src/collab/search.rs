//! Web search through DuckDuckGo's HTML endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::Search;
use crate::error::SearchError;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("thinkr/", env!("CARGO_PKG_VERSION"));

static SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Scrapes result snippets from DuckDuckGo.
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }
}

#[async_trait]
impl Search for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(SearchError::Status(resp.status().as_u16()));
        }

        let html = resp.text().await?;
        let snippets = parse_snippets(&html, max_results);
        tracing::debug!(query, results = snippets.len(), "web search finished");
        Ok(snippets)
    }
}

/// Extract up to `max` plain-text snippets from a result page.
fn parse_snippets(html: &str, max: usize) -> Vec<String> {
    SNIPPET
        .captures_iter(html)
        .filter_map(|cap| {
            let inner = cap.get(1)?.as_str();
            let text = decode_entities(&TAG.replace_all(inner, ""));
            let text = WHITESPACE.replace_all(text.trim(), " ").into_owned();
            (!text.is_empty()).then_some(text)
        })
        .take(max)
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
