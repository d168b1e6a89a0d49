//! Web evidence source: search and page fetching
//!
//! Neither operation fails. A failed search yields a single error-marked
//! entry; a failed fetch yields an empty string.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Title of the degenerate entry returned when search fails
pub const SEARCH_ERROR_TITLE: &str = "Search error";

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Many sites refuse non-browser agents
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    /// Degenerate entry standing in for a failed search
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: SEARCH_ERROR_TITLE.to_string(),
            url: String::new(),
            snippet: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.url.is_empty() && self.title == SEARCH_ERROR_TITLE
    }
}

/// Search provider plus page fetcher
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Ordered results; never empty (a failure yields one error entry)
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;

    /// Page text; empty on any failure
    async fn fetch(&self, url: &str) -> String;
}

/// DuckDuckGo HTML search + reqwest page fetch
pub struct WebEvidenceSource {
    http_client: Client,
    fetch_max_chars: usize,
}

impl WebEvidenceSource {
    pub fn new(fetch_max_chars: usize) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(SEARCH_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            fetch_max_chars,
        })
    }

    async fn try_search(&self, query: &str) -> anyhow::Result<String> {
        let response = self
            .http_client
            .post(DUCKDUCKGO_HTML_URL)
            .form(&[("q", query)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .http_client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(html_to_text(&bytes, self.fetch_max_chars))
    }
}

#[async_trait]
impl EvidenceSource for WebEvidenceSource {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        debug!(query = %query, max_results, "Web search");
        match self.try_search(query).await {
            Ok(html) => {
                let results = parse_duckduckgo_results(&html, max_results);
                if results.is_empty() {
                    warn!(query = %query, "Search returned no parseable results");
                    vec![SearchResult::error("No results found")]
                } else {
                    results
                }
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed");
                vec![SearchResult::error(e.to_string())]
            }
        }
    }

    async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(text) => text,
            Err(e) => {
                debug!(url = %url, error = %e, "Fetch failed, continuing without page text");
                String::new()
            }
        }
    }
}

/// Extract results from a DuckDuckGo HTML results page
pub fn parse_duckduckgo_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let url = unwrap_redirect(link.value().attr("href")?)?;
            let title = collapse_whitespace(&link.text().collect::<String>());
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchResult { title, url, snippet })
        })
        .take(max_results)
        .collect()
}

/// Resolve DuckDuckGo `/l/?uddg=<target>` redirect links to their target
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    matches!(parsed.scheme(), "http" | "https").then_some(absolute)
}

/// Convert HTML to single-spaced plain text capped at `max_chars`
pub fn html_to_text(html: &[u8], max_chars: usize) -> String {
    let text = html2text::from_read(html, 120);
    collapse_whitespace(&text).chars().take(max_chars).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
        <div class="result results_links">
          <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.nasa.gov%2Fgreat-wall&rut=x">
            Great Wall   from Space</a></h2>
          <a class="result__snippet">Not visible to the <b>naked eye</b>.</a>
        </div>
        <div class="result">
          <h2><a class="result__a" href="https://en.wikipedia.org/wiki/Great_Wall_of_China">Great Wall - Wikipedia</a></h2>
        </div>
        <div class="result">
          <h2><a class="result__a" href="javascript:void(0)">Ad</a></h2>
        </div>
        <div class="result">
          <h2><a class="result__a" href="https://third.example/">Third</a></h2>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_results_page() {
        let results = parse_duckduckgo_results(RESULTS_PAGE, 5);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].url, "https://www.nasa.gov/great-wall");
        assert_eq!(results[0].title, "Great Wall from Space");
        assert_eq!(results[0].snippet, "Not visible to the naked eye.");
        assert_eq!(results[1].url, "https://en.wikipedia.org/wiki/Great_Wall_of_China");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_parse_respects_limit() {
        assert_eq!(parse_duckduckgo_results(RESULTS_PAGE, 1).len(), 1);
        assert!(parse_duckduckgo_results("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_error_entry() {
        let entry = SearchResult::error("timeout");
        assert!(entry.is_error());
        assert_eq!(entry.snippet, "timeout");
        assert!(!SearchResult {
            title: SEARCH_ERROR_TITLE.to_string(),
            url: "https://a.org".to_string(),
            snippet: String::new(),
        }
        .is_error());
    }

    #[test]
    fn test_html_to_text_truncates() {
        let html = b"<html><body><p>The   Great Wall</p><p>is long.</p></body></html>";
        let text = html_to_text(html, 14);
        assert_eq!(text.chars().count(), 14);
        assert!(text.starts_with("The Great Wall"));
    }
}
