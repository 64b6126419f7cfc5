//! Conversation types exchanged with a model provider.
//!
//! A [`ChatRequest`] is the whole conversation so far. The tool-calling
//! loop grows it one turn at a time through the `push_*` helpers, so the
//! order of assistant calls, tool results and follow-ups stays in one place.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition, ToolResult};
use crate::core::TokenUsage;

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The question, or a follow-up from the loop.
    User,
    /// Model output.
    Assistant,
    /// Output of one tool call.
    Tool,
}

/// One message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender.
    pub role: Role,
    /// Text; empty for an assistant turn that only calls tools.
    pub content: String,
    /// Calls requested in an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call answered by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Instructions message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::text(Role::System, content)
    }

    /// User message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::text(Role::User, content)
    }

    /// Plain assistant output.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requests `calls`.
    #[must_use]
    pub const fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Tool message answering one call.
    #[must_use]
    pub fn tool_result(result: &ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.content.clone(),
            tool_calls: Vec::new(),
            tool_call_id: Some(result.tool_call_id.clone()),
        }
    }
}

/// JSON schema the model's final output must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// Schema name (letters, digits, underscores).
    pub name: String,
    /// What the output represents.
    pub description: String,
    /// JSON Schema object.
    pub schema: serde_json::Value,
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Structured output schema, if any.
    pub output_schema: Option<OutputSchema>,
    /// Stream the response.
    pub stream: bool,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// Starts a conversation from instructions and a question.
    #[must_use]
    pub fn conversation(model: &str, instructions: &str, question: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(instructions), ChatMessage::user(question)],
            temperature: None,
            max_tokens: None,
            output_schema: None,
            stream: false,
            tools: Vec::new(),
        }
    }

    /// Appends an assistant turn requesting `calls`.
    pub fn push_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.messages.push(ChatMessage::tool_calls(calls));
    }

    /// Appends the result of one call.
    pub fn push_tool_result(&mut self, result: &ToolResult) {
        self.messages.push(ChatMessage::tool_result(result));
    }

    /// Records a draft answer the loop did not accept, followed by what the
    /// model should do instead.
    pub fn push_rejected_draft(&mut self, draft: &str, follow_up: &str) {
        self.messages.push(ChatMessage::assistant(draft));
        self.messages.push(ChatMessage::user(follow_up));
    }

    /// Tool calls requested so far, in order.
    pub fn requested_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.messages.iter().flat_map(|m| &m.tool_calls)
    }
}

/// A chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Output text.
    pub content: String,
    /// Tokens billed for this completion.
    pub usage: TokenUsage,
    /// Calls requested instead of (or alongside) output.
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped, e.g. `stop` or `tool_calls`.
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tool::{GET_PAGE_TOOL, SEARCH_TOOL};

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_conversation_starts_with_instructions_and_question() {
        let request = ChatRequest::conversation("gpt-4o-mini", "Answer from Wikipedia.", "Who?");
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User]);
        assert_eq!(request.messages[1].content, "Who?");
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_turn_bookkeeping_keeps_order() {
        let mut request = ChatRequest::conversation("m", "sys", "q");
        request.push_tool_calls(vec![
            call("c1", SEARCH_TOOL, r#"{"query":"Ada Lovelace"}"#),
            call("c2", GET_PAGE_TOOL, r#"{"title":"Ada Lovelace"}"#),
        ]);
        request.push_tool_result(&ToolResult::ok("c1", "[]".to_string()));
        request.push_tool_result(&ToolResult::error("c2", "budget exhausted"));
        request.push_rejected_draft("{}", "Keep searching.");

        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Tool,
                Role::Assistant,
                Role::User
            ]
        );
        assert_eq!(request.messages[4].tool_call_id.as_deref(), Some("c2"));
        let names: Vec<&str> = request.requested_calls().map(|c| c.name.as_str()).collect();
        assert_eq!(names, [SEARCH_TOOL, GET_PAGE_TOOL]);
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let json = serde_json::to_string(&ChatMessage::assistant("done")).unwrap_or_default();
        assert!(json.contains("\"assistant\""));
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }
}
