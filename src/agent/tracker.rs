//! Per-query record of the tools the agent invoked.
//!
//! The tool-calling loop reports its activity as a tree of [`RunEvent`]s:
//! single calls, batches of events, and nested event streams. The tracker
//! flattens that tree through [`RunEvent::leaf_events`] and records each
//! leaf call exactly once, in emission order.
//!
//! A tracker belongs to one query. The coordinator creates a fresh one per
//! run and shares it with the agent task through an `Arc`.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tool::ToolCall;

/// One recorded tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// 1-based position within the query.
    pub sequence: usize,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Parsed arguments, or the raw string when they were not valid JSON.
    pub args: serde_json::Value,
}

/// Activity reported by the tool-calling loop.
pub enum RunEvent {
    /// A single tool call.
    ToolCall(ToolCall),
    /// Several events emitted together.
    Batch(Vec<RunEvent>),
    /// A source that yields further events lazily.
    Nested(BoxStream<'static, RunEvent>),
}

impl fmt::Debug for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolCall(call) => f.debug_tuple("ToolCall").field(call).finish(),
            Self::Batch(events) => f.debug_tuple("Batch").field(events).finish(),
            Self::Nested(_) => f.write_str("Nested(<stream>)"),
        }
    }
}

enum Pending {
    Event(RunEvent),
    Source(BoxStream<'static, RunEvent>),
}

impl RunEvent {
    /// Flattens this event into a lazy stream of leaf tool calls.
    ///
    /// Nested sources are drained depth-first: every event a source yields
    /// is fully expanded before the source is polled again.
    #[must_use]
    pub fn leaf_events(self) -> BoxStream<'static, ToolCall> {
        stream::unfold(vec![Pending::Event(self)], |mut stack| async move {
            loop {
                match stack.pop()? {
                    Pending::Event(Self::ToolCall(call)) => return Some((call, stack)),
                    Pending::Event(Self::Batch(events)) => {
                        stack.extend(events.into_iter().rev().map(Pending::Event));
                    }
                    Pending::Event(Self::Nested(source)) => stack.push(Pending::Source(source)),
                    Pending::Source(mut source) => {
                        if let Some(event) = source.next().await {
                            stack.push(Pending::Source(source));
                            stack.push(Pending::Event(event));
                        }
                    }
                }
            }
        })
        .boxed()
    }
}

/// Ordered log of tool calls for one query.
#[derive(Debug, Default)]
pub struct ToolInvocationTracker {
    calls: Mutex<Vec<ToolInvocation>>,
}

impl ToolInvocationTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ToolInvocation>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears all recorded calls.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Appends a call with the next sequence number and returns it.
    pub fn record(&self, tool_name: &str, args: &str) -> ToolInvocation {
        let args = serde_json::from_str(args)
            .unwrap_or_else(|_| serde_json::Value::String(args.to_string()));
        let mut calls = self.lock();
        let invocation = ToolInvocation {
            sequence: calls.len() + 1,
            tool_name: tool_name.to_string(),
            args,
        };
        calls.push(invocation.clone());
        invocation
    }

    /// Number of recorded calls to `tool_name`.
    #[must_use]
    pub fn calls_of(&self, tool_name: &str) -> usize {
        self.lock()
            .iter()
            .filter(|call| call.tool_name == tool_name)
            .count()
    }

    /// All recorded calls in order.
    #[must_use]
    pub fn all(&self) -> Vec<ToolInvocation> {
        self.lock().clone()
    }

    /// Total number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Records every leaf call in `event`, invoking `on_call` after each.
    ///
    /// Returns the number of calls recorded. The lock is not held while
    /// nested sources are polled or while `on_call` runs.
    pub async fn observe<F>(&self, event: RunEvent, mut on_call: F) -> usize
    where
        F: FnMut(&ToolInvocation) + Send,
    {
        let mut leaves = event.leaf_events();
        let mut recorded = 0;
        while let Some(call) = leaves.next().await {
            let invocation = self.record(&call.name, &call.arguments);
            debug!(
                sequence = invocation.sequence,
                tool = %invocation.tool_name,
                "recorded tool call"
            );
            on_call(&invocation);
            recorded += 1;
        }
        recorded
    }
}
