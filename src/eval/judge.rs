//! LLM-as-judge scoring of agent answers.
//!
//! The judge retries failed attempts with exponential backoff and never
//! fails: once attempts run out it returns [`JudgeEvaluation::failed`] with
//! zero usage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::agent::answer::{SearchAgentAnswer, clamp_unit, strip_code_fence};
use crate::agent::config::AgentConfig;
use crate::agent::message::OutputSchema;
use crate::agent::prompt::{JUDGE_SYSTEM_PROMPT, build_judge_prompt};
use crate::agent::provider::LlmProvider;
use crate::agent::tracker::ToolInvocation;
use crate::agent::traits::{Agent, Sampling};
use crate::core::TokenUsage;
use crate::error::RunError;

/// Default number of judge attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The judge's verdict on one answer. All scores are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeEvaluation {
    /// Overall quality.
    pub overall_score: f64,
    /// Factual correctness.
    pub accuracy: f64,
    /// Coverage of the question.
    pub completeness: f64,
    /// Focus on the question.
    pub relevance: f64,
    /// Explanation of the scores.
    pub reasoning: String,
}

impl JudgeEvaluation {
    /// All-zero verdict used when every attempt failed.
    #[must_use]
    pub fn failed(detail: &str) -> Self {
        Self {
            overall_score: 0.0,
            accuracy: 0.0,
            completeness: 0.0,
            relevance: 0.0,
            reasoning: format!("evaluation failed: {detail}"),
        }
    }

    /// JSON schema the judge must answer with.
    #[must_use]
    pub fn output_schema() -> OutputSchema {
        let score = json!({ "type": "number", "minimum": 0.0, "maximum": 1.0 });
        OutputSchema {
            name: "judge_evaluation".to_string(),
            description: "Scores for one answer".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "overall_score": score,
                    "accuracy": score,
                    "completeness": score,
                    "relevance": score,
                    "reasoning": { "type": "string" }
                },
                "required": ["overall_score", "accuracy", "completeness", "relevance", "reasoning"],
                "additionalProperties": false
            }),
        }
    }

    /// Parses judge output, clamping every score into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ResponseParse`] if the content is not a valid verdict.
    pub fn parse(content: &str) -> Result<Self, RunError> {
        let parsed: Self =
            serde_json::from_str(strip_code_fence(content)).map_err(|e| {
                RunError::ResponseParse {
                    message: e.to_string(),
                    content: content.to_string(),
                }
            })?;
        Ok(Self {
            overall_score: clamp_unit(parsed.overall_score),
            accuracy: clamp_unit(parsed.accuracy),
            completeness: clamp_unit(parsed.completeness),
            relevance: clamp_unit(parsed.relevance),
            reasoning: parsed.reasoning,
        })
    }
}

/// Judge role: fixed prompt, low temperature, structured output.
#[derive(Debug, Clone)]
pub struct JudgeAgent {
    model: String,
    sampling: Sampling,
}

impl JudgeAgent {
    /// Creates a judge using `model` or the configured judge model.
    #[must_use]
    pub fn new(config: &AgentConfig, model: Option<&str>) -> Self {
        Self {
            model: model.map_or_else(|| config.judge_model.clone(), str::to_string),
            sampling: Sampling {
                temperature: config.judge_temperature,
                max_tokens: config.max_tokens,
            },
        }
    }
}

#[async_trait]
impl Agent for JudgeAgent {
    fn name(&self) -> &'static str {
        "judge"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        JUDGE_SYSTEM_PROMPT
    }

    fn output_schema(&self) -> Option<OutputSchema> {
        Some(JudgeEvaluation::output_schema())
    }

    fn sampling(&self) -> Sampling {
        self.sampling
    }
}

/// Scores answers with retries.
#[derive(Clone)]
pub struct JudgeEvaluator {
    provider: Arc<dyn LlmProvider>,
    agent: JudgeAgent,
    backoff_base: Duration,
}

impl std::fmt::Debug for JudgeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeEvaluator")
            .field("provider", &self.provider.name())
            .field("agent", &self.agent)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}

impl JudgeEvaluator {
    /// Creates an evaluator with the configured model and backoff.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, model: Option<&str>) -> Self {
        Self {
            provider,
            agent: JudgeAgent::new(config, model),
            backoff_base: config.judge_backoff,
        }
    }

    /// Overrides the delay before the first retry.
    #[must_use]
    pub const fn with_backoff_base(mut self, delay: Duration) -> Self {
        self.backoff_base = delay;
        self
    }

    /// Switches the judge model.
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.agent.model = model.to_string();
        self
    }

    /// Judge model in use.
    #[must_use]
    pub fn model(&self) -> &str {
        self.agent.model()
    }

    /// Scores `answer` to `question`, making up to `max_retries` attempts.
    ///
    /// Attempt `k` (0-based) failing waits `backoff_base * 2^k` before the
    /// next attempt; there is no wait after the last one. `max_retries == 0`
    /// is treated as 1.
    pub async fn evaluate(
        &self,
        question: &str,
        answer: &SearchAgentAnswer,
        tool_calls: Option<&[ToolInvocation]>,
        max_retries: u32,
    ) -> (JudgeEvaluation, TokenUsage) {
        let attempts = max_retries.max(1);
        let prompt = build_judge_prompt(question, answer, tool_calls);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.attempt(&prompt).await {
                Ok((evaluation, usage)) => {
                    debug!(
                        attempt = attempt + 1,
                        overall = evaluation.overall_score,
                        "judge evaluation complete"
                    );
                    return (evaluation, usage);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, attempts, error = %e, "judge attempt failed");
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        let delay = self
                            .backoff_base
                            .saturating_mul(2u32.saturating_pow(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(attempts, error = %last_error, "judge evaluation failed");
        (JudgeEvaluation::failed(&last_error), TokenUsage::zero())
    }

    async fn attempt(&self, prompt: &str) -> Result<(JudgeEvaluation, TokenUsage), RunError> {
        let response = self.agent.complete(self.provider.as_ref(), prompt).await?;
        let evaluation = JudgeEvaluation::parse(&response.content)?;
        Ok((evaluation, response.usage))
    }
}
