//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::time::Duration;

use super::guardrail::{DEFAULT_CHECK_INTERVAL, Pricing};
use super::mode::SearchMode;
use crate::core::WeightedScore;
use crate::error::RunError;
use crate::wiki::client::{DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT};

/// Default model for the search agent.
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";
/// Default model for the judge.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";
/// Default maximum completion tokens per model call.
const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Default sampling temperature for the search agent.
const DEFAULT_AGENT_TEMPERATURE: f32 = 0.3;
/// Default sampling temperature for the judge.
const DEFAULT_JUDGE_TEMPERATURE: f32 = 0.1;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 40;
/// Default cost ceiling per query, in dollars.
const DEFAULT_MAX_COST: f64 = 1.0;
/// Default judge attempts.
const DEFAULT_JUDGE_MAX_RETRIES: u32 = 3;
/// Default delay before the first judge retry.
const DEFAULT_JUDGE_BACKOFF: Duration = Duration::from_secs(1);

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the search agent.
    pub agent_model: String,
    /// Model for the judge.
    pub judge_model: String,
    /// Default search mode.
    pub search_mode: SearchMode,
    /// Maximum completion tokens per model call.
    pub max_tokens: u32,
    /// Search agent temperature.
    pub agent_temperature: f32,
    /// Judge temperature.
    pub judge_temperature: f32,
    /// Model request timeout.
    pub timeout: Duration,
    /// Timeout for each page collaborator call.
    pub tool_timeout: Duration,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Cost ceiling per query, in dollars.
    pub max_cost: f64,
    /// How often the cost guardrail polls.
    pub cost_check_interval: Duration,
    /// Keywords that block a question outright.
    pub blocked_keywords: Vec<String>,
    /// Model prices used for cost tracking.
    pub pricing: Pricing,
    /// Judge attempts before falling back to a zero score.
    pub judge_max_retries: u32,
    /// Delay before the first judge retry; doubles each attempt.
    pub judge_backoff: Duration,
    /// Combined-score weights.
    pub score_weights: WeightedScore,
    /// MediaWiki host.
    pub wiki_base_url: String,
    /// User agent sent to MediaWiki.
    pub user_agent: String,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ApiKeyMissing`] if no API key is found, or
    /// [`RunError::Configuration`] for an unknown search mode.
    pub fn from_env() -> Result<Self, RunError> {
        Self::builder().from_env()?.build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    agent_model: Option<String>,
    judge_model: Option<String>,
    search_mode: Option<SearchMode>,
    max_tokens: Option<u32>,
    agent_temperature: Option<f32>,
    judge_temperature: Option<f32>,
    timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    max_cost: Option<f64>,
    cost_check_interval: Option<Duration>,
    blocked_keywords: Option<Vec<String>>,
    pricing: Option<Pricing>,
    judge_max_retries: Option<u32>,
    judge_backoff: Option<Duration>,
    score_weights: Option<WeightedScore>,
    wiki_base_url: Option<String>,
    user_agent: Option<String>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Configuration`] if `WIKIAGENT_SEARCH_MODE` names
    /// an unknown mode or `GUARDRAIL_MAX_COST` is not a dollar amount.
    pub fn from_env(mut self) -> Result<Self, RunError> {
        if self.provider.is_none() {
            self.provider = std::env::var("WIKIAGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("WIKIAGENT_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL").ok();
        }
        if self.agent_model.is_none() {
            self.agent_model = std::env::var("OPENAI_RAG_MODEL").ok();
        }
        if self.judge_model.is_none() {
            self.judge_model = std::env::var("OPENAI_JUDGE_MODEL").ok();
        }
        if self.search_mode.is_none()
            && let Ok(mode) = std::env::var("WIKIAGENT_SEARCH_MODE")
        {
            self.search_mode = Some(
                mode.parse()
                    .map_err(|e: super::mode::UnknownMode| RunError::Configuration(e.to_string()))?,
            );
        }
        if self.max_cost.is_none()
            && let Ok(raw) = std::env::var("GUARDRAIL_MAX_COST")
        {
            self.max_cost = Some(parse_max_cost(&raw)?);
        }
        if self.blocked_keywords.is_none() {
            self.blocked_keywords = std::env::var("GUARDRAIL_BLOCKED_KEYWORDS")
                .ok()
                .map(|v| parse_keyword_list(&v));
        }
        Ok(self)
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the search agent model.
    #[must_use]
    pub fn agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = Some(model.into());
        self
    }

    /// Sets the judge model.
    #[must_use]
    pub fn judge_model(mut self, model: impl Into<String>) -> Self {
        self.judge_model = Some(model.into());
        self
    }

    /// Sets the default search mode.
    #[must_use]
    pub const fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = Some(mode);
        self
    }

    /// Sets the max completion tokens per call.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the search agent temperature.
    #[must_use]
    pub const fn agent_temperature(mut self, t: f32) -> Self {
        self.agent_temperature = Some(t);
        self
    }

    /// Sets the judge temperature.
    #[must_use]
    pub const fn judge_temperature(mut self, t: f32) -> Self {
        self.judge_temperature = Some(t);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the page collaborator timeout.
    #[must_use]
    pub const fn tool_timeout(mut self, duration: Duration) -> Self {
        self.tool_timeout = Some(duration);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the per-query cost ceiling.
    #[must_use]
    pub const fn max_cost(mut self, dollars: f64) -> Self {
        self.max_cost = Some(dollars);
        self
    }

    /// Sets the cost guardrail polling interval.
    #[must_use]
    pub const fn cost_check_interval(mut self, interval: Duration) -> Self {
        self.cost_check_interval = Some(interval);
        self
    }

    /// Sets the blocked keywords.
    #[must_use]
    pub fn blocked_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets model pricing.
    #[must_use]
    pub const fn pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Sets the judge attempt count.
    #[must_use]
    pub const fn judge_max_retries(mut self, n: u32) -> Self {
        self.judge_max_retries = Some(n);
        self
    }

    /// Sets the judge backoff base.
    #[must_use]
    pub const fn judge_backoff(mut self, delay: Duration) -> Self {
        self.judge_backoff = Some(delay);
        self
    }

    /// Sets the combined-score weights.
    #[must_use]
    pub const fn score_weights(mut self, weights: WeightedScore) -> Self {
        self.score_weights = Some(weights);
        self
    }

    /// Sets the MediaWiki host.
    #[must_use]
    pub fn wiki_base_url(mut self, url: impl Into<String>) -> Self {
        self.wiki_base_url = Some(url.into());
        self
    }

    /// Sets the MediaWiki user agent.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ApiKeyMissing`] if no API key was set and
    /// [`RunError::Configuration`] if the cost ceiling is negative or not finite.
    pub fn build(self) -> Result<AgentConfig, RunError> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(RunError::ApiKeyMissing)?;
        let max_cost = check_max_cost(self.max_cost.unwrap_or(DEFAULT_MAX_COST))?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            agent_model: self
                .agent_model
                .unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
            judge_model: self
                .judge_model
                .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string()),
            search_mode: self.search_mode.unwrap_or_default(),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            agent_temperature: self.agent_temperature.unwrap_or(DEFAULT_AGENT_TEMPERATURE),
            judge_temperature: self.judge_temperature.unwrap_or(DEFAULT_JUDGE_TEMPERATURE),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            tool_timeout: self.tool_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            max_cost,
            cost_check_interval: self.cost_check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL),
            blocked_keywords: self.blocked_keywords.unwrap_or_default(),
            pricing: self.pricing.unwrap_or_default(),
            judge_max_retries: self.judge_max_retries.unwrap_or(DEFAULT_JUDGE_MAX_RETRIES),
            judge_backoff: self.judge_backoff.unwrap_or(DEFAULT_JUDGE_BACKOFF),
            score_weights: self.score_weights.unwrap_or_default(),
            wiki_base_url: self
                .wiki_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_agent: self.user_agent.unwrap_or_else(|| {
                format!("wikiagent/{} (command-line QA agent)", env!("CARGO_PKG_VERSION"))
            }),
        })
    }
}

/// Parses a `GUARDRAIL_MAX_COST` value in dollars.
///
/// # Errors
///
/// Returns [`RunError::Configuration`] unless `raw` is a finite,
/// non-negative number.
pub fn parse_max_cost(raw: &str) -> Result<f64, RunError> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        RunError::Configuration(format!("GUARDRAIL_MAX_COST is not a number: '{raw}'"))
    })?;
    check_max_cost(value)
}

/// A NaN or infinite ceiling never trips; a negative one always does.
fn check_max_cost(value: f64) -> Result<f64, RunError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RunError::Configuration(format!(
            "max cost must be a finite, non-negative dollar amount (got {value})"
        )))
    }
}

/// Splits a comma-separated list, dropping blanks.
#[must_use]
pub fn parse_keyword_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(str::to_string)
        .collect()
}
