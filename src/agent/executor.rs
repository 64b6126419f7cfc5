//! Tool executor that dispatches tool calls to the page collaborators.
//!
//! Argument problems are reported back to the model as error results so it
//! can correct itself. Transport failures are not: they abort the run and
//! surface as a classified [`AgentError`](crate::agent::AgentError).

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::tool::{ToolCall, ToolResult, WikiTool};
use crate::error::{RunError, TransportError};
use crate::wiki::{PageContent, PageSource};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum page content handed back to the model, in grapheme clusters.
pub const MAX_PAGE_CONTENT_LEN: usize = 15_000;

/// Executes tool calls against a [`PageSource`].
#[derive(Clone)]
pub struct ToolExecutor {
    pages: Arc<dyn PageSource>,
    timeout: Duration,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// Creates an executor whose collaborator calls time out after `timeout`.
    #[must_use]
    pub fn new(pages: Arc<dyn PageSource>, timeout: Duration) -> Self {
        Self { pages, timeout }
    }

    /// Dispatches a tool call.
    ///
    /// Validates raw argument size before dispatch to prevent oversized payloads.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Transport`] when the collaborator fails or times
    /// out. Invalid arguments and unknown tools produce an error
    /// [`ToolResult`] instead.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, RunError> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Ok(ToolResult::error(
                &call.id,
                format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            ));
        }

        let Some(tool) = WikiTool::from_name(&call.name) else {
            return Ok(ToolResult::error(
                &call.id,
                RunError::ToolExecution {
                    name: call.name.clone(),
                    message: "unknown tool".to_string(),
                }
                .to_string(),
            ));
        };

        let outcome = match argument(tool, &call.arguments) {
            Ok(value) => match tool {
                WikiTool::Search => self.search(&value).await,
                WikiTool::GetPage => self.get_page(&value).await,
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(content) => Ok(ToolResult::ok(&call.id, content)),
            Err(e @ RunError::ToolExecution { .. }) => {
                Ok(ToolResult::error(&call.id, e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> Result<T, RunError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(RunError::from),
            Err(_) => Err(TransportError::Timeout {
                operation: operation.to_string(),
                after: self.timeout,
            }
            .into()),
        }
    }

    async fn search(&self, query: &str) -> Result<String, RunError> {
        let hits = self.with_timeout("search", self.pages.search(query)).await?;
        debug!(query, hits = hits.len(), "search complete");
        encode(WikiTool::Search, &hits)
    }

    async fn get_page(&self, title: &str) -> Result<String, RunError> {
        let page = self
            .with_timeout("get_page", self.pages.get_page(title))
            .await?;
        let page = PageContent {
            content: truncate_graphemes(&page.content, MAX_PAGE_CONTENT_LEN),
            ..page
        };
        debug!(title, bytes = page.content.len(), "page fetched");
        encode(WikiTool::GetPage, &page)
    }
}

fn invalid(tool: WikiTool, message: String) -> RunError {
    RunError::ToolExecution {
        name: tool.name().to_string(),
        message,
    }
}

/// Extracts and trims the tool's single string argument.
fn argument(tool: WikiTool, raw: &str) -> Result<String, RunError> {
    let args: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| invalid(tool, format!("invalid arguments: {e}")))?;
    let field = tool.argument();
    let value = args
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            invalid(tool, format!("invalid arguments: missing string field `{field}`"))
        })?
        .trim();

    let len = value.chars().count();
    let max = tool.max_len();
    if len == 0 || len > max {
        return Err(invalid(
            tool,
            format!("{field} must be 1-{max} characters (got {len})"),
        ));
    }
    Ok(value.to_string())
}

fn encode<T: Serialize>(tool: WikiTool, value: &T) -> Result<String, RunError> {
    serde_json::to_string(value).map_err(|e| invalid(tool, format!("serialization error: {e}")))
}

/// Returns at most `max` grapheme clusters of `text`.
#[must_use]
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    match text.grapheme_indices(true).nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
