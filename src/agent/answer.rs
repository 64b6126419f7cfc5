//! Structured agent output and the per-query result envelope.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::failure::AgentError;
use super::guardrail::GuardrailEvent;
use super::message::OutputSchema;
use super::tracker::ToolInvocation;
use crate::core::TokenUsage;
use crate::error::RunError;

/// The agent's final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAgentAnswer {
    /// Answer text.
    pub answer: String,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// Titles of the pages the answer relies on, most relevant first.
    #[serde(default)]
    pub sources_used: Vec<String>,
    /// How the answer was reached.
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl SearchAgentAnswer {
    /// Creates an answer, clamping `confidence` into `[0, 1]`.
    #[must_use]
    pub fn new(
        answer: impl Into<String>,
        confidence: f64,
        sources_used: Vec<String>,
        reasoning: Option<String>,
    ) -> Self {
        Self {
            answer: answer.into(),
            confidence: clamp_unit(confidence),
            sources_used,
            reasoning,
        }
    }

    /// JSON schema the model must answer with.
    #[must_use]
    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "search_agent_answer".to_string(),
            description: "Final answer grounded in Wikipedia pages".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "answer": {
                        "type": "string",
                        "description": "Answer to the user's question."
                    },
                    "confidence": {
                        "type": "number",
                        "minimum": 0.0,
                        "maximum": 1.0,
                        "description": "Confidence in the answer, 0.0 to 1.0."
                    },
                    "sources_used": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Wikipedia page titles used, most relevant first."
                    },
                    "reasoning": {
                        "type": ["string", "null"],
                        "description": "Short explanation of how the answer was found."
                    }
                },
                "required": ["answer", "confidence", "sources_used", "reasoning"],
                "additionalProperties": false
            }),
        }
    }

    /// Parses model output, tolerating a surrounding markdown code fence.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ResponseParse`] if the content is not a valid answer.
    pub fn parse(content: &str) -> Result<Self, RunError> {
        let json = strip_code_fence(content);
        let parsed: Self = serde_json::from_str(json).map_err(|e| RunError::ResponseParse {
            message: e.to_string(),
            content: content.to_string(),
        })?;
        Ok(Self {
            confidence: clamp_unit(parsed.confidence),
            ..parsed
        })
    }
}

/// Clamps `value` into `[0, 1]`; non-finite values become `0.0`.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Returns the JSON inside a markdown code fence, or the trimmed input.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

/// Outcome of one agent run.
///
/// Exactly one of `answer` and `error` is set; the constructors are the only
/// way to build one.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    answer: Option<SearchAgentAnswer>,
    tool_calls: Vec<ToolInvocation>,
    usage: Option<TokenUsage>,
    error: Option<AgentError>,
    guardrail_events: Vec<GuardrailEvent>,
}

impl AgentResult {
    /// A completed run.
    #[must_use]
    pub const fn success(
        answer: SearchAgentAnswer,
        tool_calls: Vec<ToolInvocation>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            answer: Some(answer),
            tool_calls,
            usage: Some(usage),
            error: None,
            guardrail_events: Vec::new(),
        }
    }

    /// A failed run. `usage` is whatever was consumed before the failure.
    #[must_use]
    pub const fn failure(
        error: AgentError,
        tool_calls: Vec<ToolInvocation>,
        usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            answer: None,
            tool_calls,
            usage,
            error: Some(error),
            guardrail_events: Vec::new(),
        }
    }

    /// Attaches guardrail events.
    #[must_use]
    pub fn with_guardrail_events(mut self, events: Vec<GuardrailEvent>) -> Self {
        self.guardrail_events = events;
        self
    }

    /// The answer, if the run succeeded.
    #[must_use]
    pub const fn answer(&self) -> Option<&SearchAgentAnswer> {
        self.answer.as_ref()
    }

    /// Tool calls in invocation order.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolInvocation] {
        &self.tool_calls
    }

    /// Token usage, when known.
    #[must_use]
    pub const fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    /// The error, if the run failed.
    #[must_use]
    pub const fn error(&self) -> Option<&AgentError> {
        self.error.as_ref()
    }

    /// Guardrail events recorded during the run.
    #[must_use]
    pub fn guardrail_events(&self) -> &[GuardrailEvent] {
        &self.guardrail_events
    }

    /// Whether the run produced an answer.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.answer.is_some()
    }

    /// Number of calls to `tool_name`.
    #[must_use]
    pub fn calls_of(&self, tool_name: &str) -> usize {
        self.tool_calls
            .iter()
            .filter(|call| call.tool_name == tool_name)
            .count()
    }
}
