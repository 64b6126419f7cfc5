//! Model backend seam.
//!
//! The coordinator, the tool loop and the judge only see [`LlmProvider`].
//! Tests substitute scripted providers here.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse};
use crate::core::TokenUsage;
use crate::error::RunError;

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// More output text.
    ContentDelta(String),
    /// A fragment of a tool call. Fragments sharing `index` belong to the
    /// same call; `id` and `name` arrive once, `arguments` accumulate.
    ToolCallDelta {
        /// Position of the call within the response.
        index: u32,
        /// Call id, on the first fragment.
        id: Option<String>,
        /// Tool name, on the first fragment.
        name: Option<String>,
        /// Argument text to append.
        arguments: Option<String>,
    },
    /// Usage for the whole completion, sent at the end.
    Usage(TokenUsage),
    /// The model stopped for the given reason.
    Finished(String),
}

/// Boxed stream of completion events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, RunError>> + Send>>;

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Runs one completion and waits for all of it.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ApiRequest`] when the backend rejects the call and
    /// [`RunError::Transport`] for timeouts and connection failures.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, RunError>;

    /// Runs one completion as a stream of [`StreamEvent`]s.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on connection failures. Failures after the
    /// stream opened arrive as stream items.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, RunError>;
}
