//! MediaWiki HTTP client.
//!
//! Search goes through `w/api.php?action=query&list=search`; page text comes
//! from `w/index.php?action=raw`, which returns wikitext without rendering.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{PageContent, PageSource, SearchHit};
use crate::error::{RunError, TransportError};

/// Default MediaWiki host.
pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";
/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-backed [`PageSource`].
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    markup: Regex,
}

impl WikipediaClient {
    /// Creates a client for `base_url` (e.g. [`DEFAULT_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Configuration`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, RunError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| RunError::Configuration(format!("HTTP client: {e}")))?;
        let markup = Regex::new(r"<[^>]*>")
            .map_err(|e| RunError::Configuration(format!("snippet pattern: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            markup,
        })
    }

    /// Public URL of the page titled `title`.
    #[must_use]
    pub fn page_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.base_url, title.replace(' ', "_"))
    }

    fn map_error(&self, operation: &str, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                operation: operation.to_string(),
                after: self.timeout,
            }
        } else if let Some(status) = err.status() {
            TransportError::RemoteApi {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else {
            TransportError::Network {
                message: err.to_string(),
            }
        }
    }

    async fn get(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, TransportError> {
        let url = format!("{}{path}", self.base_url);
        debug!(operation, %url, "MediaWiki request");
        self.http
            .get(&url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.map_error(operation, &e))
    }
}

#[async_trait]
impl PageSource for WikipediaClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TransportError> {
        let response = self
            .get(
                "search",
                "/w/api.php",
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("list", "search"),
                    ("srsearch", query),
                ],
            )
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.map_error("search", &e))?;
        parse_search_response(&body, &self.markup)
    }

    async fn get_page(&self, title: &str) -> Result<PageContent, TransportError> {
        let page_title = title.replace(' ', "_");
        let response = self
            .get(
                "get_page",
                "/w/index.php",
                &[("title", page_title.as_str()), ("action", "raw")],
            )
            .await?;
        let content = response
            .text()
            .await
            .map_err(|e| self.map_error("get_page", &e))?;

        Ok(PageContent {
            title: title.to_string(),
            content,
            url: self.page_url(title),
        })
    }
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(default)]
    title: String,
    snippet: Option<String>,
    pageid: Option<u64>,
    size: Option<u64>,
    wordcount: Option<u64>,
}

/// Parses an `action=query&list=search` body into hits.
///
/// A body without a `query.search` list yields no hits. Snippet markup is
/// removed and the common HTML entities are decoded.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the body is not valid JSON.
pub fn parse_search_response(body: &str, markup: &Regex) -> Result<Vec<SearchHit>, TransportError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })?;

    Ok(envelope
        .query
        .map(|q| q.search)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| SearchHit {
            title: hit.title,
            snippet: hit.snippet.map(|s| clean_snippet(&s, markup)),
            page_id: hit.pageid,
            size: hit.size,
            word_count: hit.wordcount,
        })
        .collect())
}

fn clean_snippet(snippet: &str, markup: &Regex) -> String {
    markup
        .replace_all(snippet, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
