//! Model roles.
//!
//! The search agent and the judge share one shape: a model, fixed
//! instructions, sampling settings and an optional output schema. Only the
//! search agent carries tools.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, OutputSchema};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::RunError;

/// Sampling settings sent with every request of a role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// 0.0 is deterministic.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1000,
        }
    }
}

/// A model role with fixed instructions.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role name used in logs.
    fn name(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// System instructions.
    fn system_prompt(&self) -> &str;

    /// Sampling settings.
    fn sampling(&self) -> Sampling {
        Sampling::default()
    }

    /// Schema of the final output, if the role enforces one.
    fn output_schema(&self) -> Option<OutputSchema> {
        None
    }

    /// Tools offered to the model.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Round-trip limit when the role runs the tool loop.
    fn max_tool_iterations(&self) -> usize {
        10
    }

    /// Opening request for `prompt`.
    fn build_request(&self, prompt: &str) -> ChatRequest {
        let sampling = self.sampling();
        ChatRequest {
            temperature: Some(sampling.temperature),
            max_tokens: Some(sampling.max_tokens),
            output_schema: self.output_schema(),
            tools: self.tools(),
            ..ChatRequest::conversation(self.model(), self.system_prompt(), prompt)
        }
    }

    /// Runs `prompt` as a single completion without tools.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    async fn complete(
        &self,
        provider: &dyn LlmProvider,
        prompt: &str,
    ) -> Result<ChatResponse, RunError> {
        tracing::debug!(role = self.name(), model = self.model(), "single completion");
        provider.chat(&self.build_request(prompt)).await
    }
}
