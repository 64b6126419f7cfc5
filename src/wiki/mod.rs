//! Page collaborators the agent's tools call into.
//!
//! [`PageSource`] is the seam between the tool executor and the outside
//! world. [`WikipediaClient`] talks to the public MediaWiki API; tests plug
//! in in-memory sources.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub use client::WikipediaClient;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Plain-text excerpt around the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Numeric page id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<u64>,
    /// Page size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Page word count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
}

/// Full content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Title as requested.
    pub title: String,
    /// Raw page text.
    pub content: String,
    /// Canonical page URL.
    pub url: String,
}

/// Searches and fetches encyclopedia pages.
///
/// Implementations report failures as tagged [`TransportError`]s so callers
/// can classify them without inspecting message text.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Finds pages matching `query`.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TransportError>;

    /// Fetches the page titled `title`.
    async fn get_page(&self, title: &str) -> Result<PageContent, TransportError>;
}
