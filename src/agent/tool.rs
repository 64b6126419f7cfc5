//! Function-calling types and the two Wikipedia tools.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the page-search tool.
pub const SEARCH_TOOL: &str = "wikipedia_search";
/// Name of the page-content tool.
pub const GET_PAGE_TOOL: &str = "wikipedia_get_page";

/// Maximum search query length in characters.
pub const MAX_QUERY_LEN: usize = 300;
/// Maximum page title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Function declaration sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name.
    pub name: String,
    /// When the model should use it.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: serde_json::Value,
}

/// A call the model asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Raw JSON arguments, not yet validated.
    pub arguments: String,
}

/// What goes back to the model for one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call being answered.
    pub tool_call_id: String,
    /// JSON payload, or a message the model can act on.
    pub content: String,
    /// The call was refused or its arguments were invalid.
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result.
    #[must_use]
    pub fn ok(tool_call_id: &str, content: String) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            content,
            is_error: false,
        }
    }

    /// Error result reported back to the model.
    #[must_use]
    pub fn error(tool_call_id: &str, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// The tools offered to the search agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiTool {
    /// Full-text search returning page titles.
    Search,
    /// Wikitext of one page by exact title.
    GetPage,
}

impl WikiTool {
    /// Every tool, in the order they are offered.
    pub const ALL: [Self; 2] = [Self::Search, Self::GetPage];

    /// Looks a tool up by its function name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Function name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Search => SEARCH_TOOL,
            Self::GetPage => GET_PAGE_TOOL,
        }
    }

    /// The single string argument the tool takes.
    #[must_use]
    pub const fn argument(self) -> &'static str {
        match self {
            Self::Search => "query",
            Self::GetPage => "title",
        }
    }

    /// Character limit of [`WikiTool::argument`].
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::Search => MAX_QUERY_LEN,
            Self::GetPage => MAX_TITLE_LEN,
        }
    }

    const fn describe(self) -> (&'static str, &'static str) {
        match self {
            Self::Search => (
                "Search Wikipedia for pages matching a query. Returns title, snippet, \
                 page id, size and word count for each hit. Pass a returned title to \
                 wikipedia_get_page to read it.",
                "Search terms. Spaces are allowed.",
            ),
            Self::GetPage => (
                "Fetch the raw wikitext of a Wikipedia page by its exact title. \
                 Long pages are truncated.",
                "Page title as returned by wikipedia_search.",
            ),
        }
    }

    /// Declaration sent to the model.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        let (description, hint) = self.describe();
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.argument().to_string(),
            json!({
                "type": "string",
                "minLength": 1,
                "maxLength": self.max_len(),
                "description": hint,
            }),
        );
        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": [self.argument()],
                "additionalProperties": false,
            }),
        }
    }

    /// Declarations for every tool.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.into_iter().map(Self::definition).collect()
    }
}
