//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final answer the search budget accepts or the
//! iteration limit is reached.
//!
//! Every model call is priced into the shared [`CostMeter`] so a running
//! cost guardrail sees it, and every requested tool call is recorded in the
//! per-query [`ToolInvocationTracker`], including calls the budget refuses.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::debug;

use super::answer::SearchAgentAnswer;
use super::executor::ToolExecutor;
use super::guardrail::{CostMeter, Pricing};
use super::message::ChatRequest;
use super::mode::{BudgetVerdict, CallKind, SearchBudget};
use super::prompt::{OUTPUT_CORRECTION_PROMPT, budget_exhausted};
use super::provider::{LlmProvider, StreamEvent};
use super::tool::{GET_PAGE_TOOL, SEARCH_TOOL, ToolCall, ToolResult};
use super::tracker::{RunEvent, ToolInvocation, ToolInvocationTracker};
use crate::core::TokenUsage;
use crate::error::RunError;

/// Progress reported by the streaming loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamUpdate<'a> {
    /// A tool call was recorded.
    ToolCall(&'a ToolInvocation),
    /// Output text not yet emitted for the current draft answer.
    OutputDelta(&'a str),
    /// The current draft was discarded; following deltas start a new one.
    OutputRestarted,
}

/// Callback receiving [`StreamUpdate`]s.
pub type StreamObserver = Arc<dyn Fn(StreamUpdate<'_>) + Send + Sync>;

/// Everything one loop run needs besides the provider and the request.
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Dispatches tool calls to the page collaborators.
    pub executor: ToolExecutor,
    /// Per-query call log.
    pub tracker: Arc<ToolInvocationTracker>,
    /// Cost counter shared with the cost guardrail.
    pub meter: CostMeter,
    /// Prices used to charge the meter.
    pub pricing: Pricing,
    /// Call budget for the active search mode.
    pub budget: SearchBudget,
    /// Safety limit on model round-trips.
    pub max_iterations: usize,
}

/// Result of a completed loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// The accepted final answer.
    pub answer: SearchAgentAnswer,
    /// Usage summed over every model call.
    pub usage: TokenUsage,
    /// Model round-trips taken.
    pub iterations: usize,
}

/// Executed calls per kind, for budget checks.
#[derive(Debug, Default, Clone, Copy)]
struct CallCounts {
    searches: usize,
    retrievals: usize,
}

impl CallCounts {
    const fn done(self, kind: CallKind) -> usize {
        match kind {
            CallKind::Search => self.searches,
            CallKind::Retrieval => self.retrievals,
        }
    }

    const fn bump(&mut self, kind: CallKind) {
        match kind {
            CallKind::Search => self.searches += 1,
            CallKind::Retrieval => self.retrievals += 1,
        }
    }
}

/// What the loop does after the model answers without tool calls.
enum Conclusion {
    Accept(SearchAgentAnswer),
    Retry,
}

fn call_kind(tool_name: &str) -> Option<CallKind> {
    match tool_name {
        SEARCH_TOOL => Some(CallKind::Search),
        GET_PAGE_TOOL => Some(CallKind::Retrieval),
        _ => None,
    }
}

impl LoopContext {
    fn charge(&self, usage: TokenUsage) {
        self.meter.add(self.pricing.cost(usage));
    }

    /// Executes `calls` in order, refusing any beyond the budget cap.
    async fn run_tools(
        &self,
        request: &mut ChatRequest,
        calls: &[ToolCall],
        counts: &mut CallCounts,
    ) -> Result<(), RunError> {
        for call in calls {
            let result = match call_kind(&call.name) {
                Some(kind) if !self.budget.allows(kind, counts.done(kind)) => {
                    let max = match kind {
                        CallKind::Search => self.budget.max_search,
                        CallKind::Retrieval => self.budget.max_retrieval,
                    }
                    .unwrap_or_default();
                    debug!(tool = %call.name, max, "tool call refused by budget");
                    ToolResult::error(&call.id, budget_exhausted(&call.name, max))
                }
                kind => {
                    let result = self.executor.execute(call).await?;
                    if let Some(kind) = kind {
                        counts.bump(kind);
                    }
                    result
                }
            };
            debug!(
                tool = %call.name,
                call_id = %call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request.push_tool_result(&result);
        }
        Ok(())
    }

    /// Parses and reviews a proposed final answer.
    fn conclude(
        &self,
        request: &mut ChatRequest,
        content: &str,
        counts: CallCounts,
    ) -> Conclusion {
        let answer = match SearchAgentAnswer::parse(content) {
            Ok(answer) => answer,
            Err(e) => {
                debug!(error = %e, "final output did not parse, asking for a correction");
                request.push_rejected_draft(content, OUTPUT_CORRECTION_PROMPT);
                return Conclusion::Retry;
            }
        };

        match self
            .budget
            .review(counts.searches, counts.retrievals, &answer)
        {
            BudgetVerdict::Accept => Conclusion::Accept(answer),
            BudgetVerdict::Continue(nudge) => {
                debug!(
                    searches = counts.searches,
                    retrievals = counts.retrievals,
                    "answer rejected by search budget"
                );
                request.push_rejected_draft(content, &nudge);
                Conclusion::Retry
            }
        }
    }
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// # Errors
///
/// Returns [`RunError::ToolLoopExceeded`] if no acceptable answer arrives
/// within `max_iterations`. Propagates provider and transport errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    ctx: &LoopContext,
) -> Result<LoopOutcome, RunError> {
    let mut usage = TokenUsage::zero();
    let mut counts = CallCounts::default();

    for iteration in 0..ctx.max_iterations {
        let response = provider.chat(request).await?;
        ctx.charge(response.usage);
        usage += response.usage;

        if response.tool_calls.is_empty() {
            match ctx.conclude(request, &response.content, counts) {
                Conclusion::Accept(answer) => {
                    debug!(iteration, "agentic loop completed with final answer");
                    return Ok(LoopOutcome {
                        answer,
                        usage,
                        iterations: iteration + 1,
                    });
                }
                Conclusion::Retry => continue,
            }
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        let event = RunEvent::Batch(
            response
                .tool_calls
                .iter()
                .cloned()
                .map(RunEvent::ToolCall)
                .collect(),
        );
        ctx.tracker.observe(event, |_| {}).await;

        request.push_tool_calls(response.tool_calls.clone());
        ctx.run_tools(request, &response.tool_calls, &mut counts)
            .await?;
    }

    Err(RunError::ToolLoopExceeded {
        max_iterations: ctx.max_iterations,
    })
}

/// A tool call being assembled from stream fragments.
#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Streaming variant of [`agentic_loop`].
///
/// `observer` sees each tool call as it is recorded and the output text of
/// each draft answer as it arrives.
///
/// # Errors
///
/// Same as [`agentic_loop`]; stream failures are propagated.
pub async fn agentic_loop_streaming(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    ctx: &LoopContext,
    observer: &StreamObserver,
) -> Result<LoopOutcome, RunError> {
    let mut usage = TokenUsage::zero();
    let mut counts = CallCounts::default();

    for iteration in 0..ctx.max_iterations {
        let mut events = provider.chat_stream(request).await?;
        let mut draft = String::new();
        let mut emitted = 0;
        let mut partials: BTreeMap<u32, PartialCall> = BTreeMap::new();
        let mut turn_usage = TokenUsage::zero();

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::ContentDelta(text) => {
                    draft.push_str(&text);
                    if let Some(suffix) = draft.get(emitted..).filter(|s| !s.is_empty()) {
                        observer(StreamUpdate::OutputDelta(suffix));
                        emitted = draft.len();
                    }
                }
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    let partial = partials.entry(index).or_default();
                    if let Some(id) = id {
                        partial.id = id;
                    }
                    if let Some(name) = name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
                StreamEvent::Usage(u) => turn_usage = u,
                StreamEvent::Finished(reason) => debug!(iteration, %reason, "stream finished"),
            }
        }

        ctx.charge(turn_usage);
        usage += turn_usage;

        let calls: Vec<ToolCall> = partials
            .into_iter()
            .map(|(index, partial)| ToolCall {
                id: if partial.id.is_empty() {
                    format!("call_{iteration}_{index}")
                } else {
                    partial.id
                },
                name: partial.name,
                arguments: partial.arguments,
            })
            .collect();

        if calls.is_empty() {
            match ctx.conclude(request, &draft, counts) {
                Conclusion::Accept(answer) => {
                    debug!(iteration, "streaming loop completed with final answer");
                    return Ok(LoopOutcome {
                        answer,
                        usage,
                        iterations: iteration + 1,
                    });
                }
                Conclusion::Retry => {
                    observer(StreamUpdate::OutputRestarted);
                    continue;
                }
            }
        }

        if emitted > 0 {
            observer(StreamUpdate::OutputRestarted);
        }

        let source = stream::iter(calls.clone().into_iter().map(RunEvent::ToolCall)).boxed();
        let notify = Arc::clone(observer);
        ctx.tracker
            .observe(RunEvent::Nested(source), move |invocation| {
                notify(StreamUpdate::ToolCall(invocation));
            })
            .await;

        request.push_tool_calls(calls.clone());
        ctx.run_tools(request, &calls, &mut counts).await?;
    }

    Err(RunError::ToolLoopExceeded {
        max_iterations: ctx.max_iterations,
    })
}
