//! Wikipedia search agent.
//!
//! Answers a question by searching and reading Wikipedia pages through the
//! tool-calling loop, then replying with a [`SearchAgentAnswer`].

use async_trait::async_trait;

use super::agentic_loop::{
    LoopContext, LoopOutcome, StreamObserver, agentic_loop, agentic_loop_streaming,
};
use super::answer::SearchAgentAnswer;
use super::config::AgentConfig;
use super::message::OutputSchema;
use super::mode::{ModeInstructions, SearchMode, instructions_for};
use super::provider::LlmProvider;
use super::tool::{ToolDefinition, WikiTool};
use super::traits::{Agent, Sampling};
use crate::error::RunError;

/// Agent that answers questions from Wikipedia.
#[derive(Debug, Clone)]
pub struct WikiSearchAgent {
    model: String,
    mode: SearchMode,
    instructions: ModeInstructions,
    sampling: Sampling,
    max_tool_iterations: usize,
}

impl WikiSearchAgent {
    /// Creates an agent for `mode`, using `model` or the configured default.
    #[must_use]
    pub fn new(config: &AgentConfig, model: Option<&str>, mode: SearchMode) -> Self {
        Self {
            model: model.map_or_else(|| config.agent_model.clone(), str::to_string),
            mode,
            instructions: instructions_for(mode),
            sampling: Sampling {
                temperature: config.agent_temperature,
                max_tokens: config.max_tokens,
            },
            max_tool_iterations: config.max_tool_iterations,
        }
    }

    /// The search mode this agent runs under.
    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Instructions and budget for the active mode.
    #[must_use]
    pub const fn instructions(&self) -> &ModeInstructions {
        &self.instructions
    }

    /// Answers `question`, optionally streaming progress to `observer`.
    ///
    /// `ctx` must carry this agent's budget; see [`WikiSearchAgent::instructions`].
    ///
    /// # Errors
    ///
    /// Propagates loop errors: provider failures, transport failures and
    /// [`RunError::ToolLoopExceeded`].
    pub async fn answer(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        ctx: &LoopContext,
        observer: Option<&StreamObserver>,
    ) -> Result<LoopOutcome, RunError> {
        let mut request = self.build_request(question);
        match observer {
            Some(observer) => {
                request.stream = true;
                agentic_loop_streaming(provider, &mut request, ctx, observer).await
            }
            None => agentic_loop(provider, &mut request, ctx).await,
        }
    }
}

#[async_trait]
impl Agent for WikiSearchAgent {
    fn name(&self) -> &'static str {
        "wiki_search"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.instructions.text
    }

    fn output_schema(&self) -> Option<OutputSchema> {
        Some(SearchAgentAnswer::output_schema())
    }

    fn sampling(&self) -> Sampling {
        self.sampling
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        WikiTool::definitions()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}
