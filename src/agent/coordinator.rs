//! Per-query execution of the search agent under guardrails.
//!
//! The coordinator owns the long-lived collaborators (model provider, page
//! source, content guardrail) and creates the per-query state (tracker, cost
//! meter, loop context) fresh for every run. It never returns an error:
//! every failure is classified into an [`AgentResult`].

use std::sync::Arc;

use tracing::{error, info, warn};

use super::agentic_loop::{LoopContext, StreamObserver};
use super::answer::AgentResult;
use super::client::create_provider;
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::failure::{AgentError, ErrorCategory};
use super::guardrail::{
    ContentGuardrail, CostGuardrail, CostMeter, GuardrailEvent, GuardrailSupervisor,
};
use super::mode::SearchMode;
use super::provider::LlmProvider;
use super::tool::{GET_PAGE_TOOL, SEARCH_TOOL};
use super::tracker::ToolInvocationTracker;
use super::traits::Agent;
use super::wiki_agent::WikiSearchAgent;
use crate::error::RunError;
use crate::wiki::{PageSource, WikipediaClient};

/// Runs questions through the search agent.
#[derive(Clone)]
pub struct AgentCoordinator {
    config: Arc<AgentConfig>,
    provider: Arc<dyn LlmProvider>,
    pages: Arc<dyn PageSource>,
    content: ContentGuardrail,
}

impl std::fmt::Debug for AgentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCoordinator")
            .field("provider", &self.provider.name())
            .field("agent_model", &self.config.agent_model)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

impl AgentCoordinator {
    /// Creates a coordinator over explicit collaborators.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        pages: Arc<dyn PageSource>,
    ) -> Self {
        let content = ContentGuardrail::new(&config.blocked_keywords);
        Self {
            config: Arc::new(config),
            provider,
            pages,
            content,
        }
    }

    /// Creates a coordinator with the configured provider and Wikipedia.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the provider is unknown or an HTTP client
    /// cannot be built.
    pub fn from_config(config: AgentConfig) -> Result<Self, RunError> {
        let provider = create_provider(&config)?;
        let pages = WikipediaClient::new(
            &config.wiki_base_url,
            &config.user_agent,
            config.tool_timeout,
        )?;
        Ok(Self::new(config, provider, Arc::new(pages)))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The model provider, shared with the judge.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.provider)
    }

    /// Answers `question` using `model` (or the configured default) under `mode`.
    pub async fn run(&self, question: &str, model: Option<&str>, mode: SearchMode) -> AgentResult {
        self.execute(question, model, mode, None).await
    }

    /// Like [`AgentCoordinator::run`], reporting tool calls and output
    /// deltas to `observer` as they happen.
    pub async fn run_streaming(
        &self,
        question: &str,
        model: Option<&str>,
        mode: SearchMode,
        observer: StreamObserver,
    ) -> AgentResult {
        self.execute(question, model, mode, Some(observer)).await
    }

    async fn execute(
        &self,
        question: &str,
        model: Option<&str>,
        mode: SearchMode,
        observer: Option<StreamObserver>,
    ) -> AgentResult {
        let question = question.trim();
        if question.is_empty() {
            return AgentResult::failure(
                AgentError::new(
                    ErrorCategory::Unknown,
                    "The question is empty.",
                    "Type a question to ask.",
                    "empty question",
                ),
                Vec::new(),
                None,
            );
        }

        let agent = WikiSearchAgent::new(&self.config, model, mode);
        let tracker = Arc::new(ToolInvocationTracker::new());
        let mut events = Vec::new();

        if !self.content.is_empty() {
            if let Err(trip) = self.content.check(question) {
                warn!(reason = %trip.reason, "question blocked before model call");
                let event = trip.event();
                let failure = AgentError::classify(&RunError::Guardrail(trip));
                return AgentResult::failure(failure, Vec::new(), None)
                    .with_guardrail_events(vec![event]);
            }
            events.push(GuardrailEvent::passed(ContentGuardrail::NAME));
        }

        let meter = CostMeter::new();
        let ctx = LoopContext {
            executor: ToolExecutor::new(Arc::clone(&self.pages), self.config.tool_timeout),
            tracker: Arc::clone(&tracker),
            meter: meter.clone(),
            pricing: self.config.pricing,
            budget: agent.instructions().budget,
            max_iterations: agent.max_tool_iterations(),
        };
        let supervisor = GuardrailSupervisor::new().with_guardrail(Arc::new(
            CostGuardrail::new(self.config.max_cost, meter.clone())
                .with_check_interval(self.config.cost_check_interval),
        ));

        info!(
            mode = %mode,
            model = agent.model(),
            streaming = observer.is_some(),
            "agent run started"
        );

        let provider = Arc::clone(&self.provider);
        let owned_question = question.to_string();
        let task = async move {
            agent
                .answer(provider.as_ref(), &owned_question, &ctx, observer.as_ref())
                .await
        };

        match supervisor.run(task).await {
            Ok(outcome) => {
                events.push(GuardrailEvent::passed(CostGuardrail::NAME));
                info!(
                    searches = tracker.calls_of(SEARCH_TOOL),
                    retrievals = tracker.calls_of(GET_PAGE_TOOL),
                    iterations = outcome.iterations,
                    total_tokens = outcome.usage.total_tokens(),
                    cost = meter.total(),
                    "agent run finished"
                );
                AgentResult::success(outcome.answer, tracker.all(), outcome.usage)
                    .with_guardrail_events(events)
            }
            Err(e) => {
                match &e {
                    RunError::Guardrail(trip) => events.push(trip.event()),
                    _ => events.push(GuardrailEvent::passed(CostGuardrail::NAME)),
                }
                let failure = AgentError::classify(&e);
                error!(
                    category = %failure.category,
                    details = %failure.technical_details,
                    tool_calls = tracker.len(),
                    "agent run failed"
                );
                AgentResult::failure(failure, tracker.all(), None).with_guardrail_events(events)
            }
        }
    }
}
