//! Runtime guardrails.
//!
//! A [`GuardrailSupervisor`] runs the agent as a tokio task next to one task
//! per polling [`Guardrail`]. Whichever resolves first decides the outcome:
//!
//! ```text
//! run(agent)
//!   ├── spawn agent task
//!   ├── spawn guardrail tasks (JoinSet)
//!   └── select!
//!       ├── agent done     → shut down guardrails → agent result
//!       └── guardrail trip → abort + await agent → shut down guardrails → Err(trip)
//! ```
//!
//! Every exit path aborts and awaits the tasks it started. The content
//! guardrail is not a task: the coordinator checks it before anything runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::core::TokenUsage;
use crate::error::RunError;

/// Default interval between cost checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// A guardrail stopped the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("guardrail '{guardrail}' tripped: {reason}")]
pub struct GuardrailTrip {
    /// Name of the guardrail.
    pub guardrail: String,
    /// Why it tripped.
    pub reason: String,
}

impl GuardrailTrip {
    /// Creates a trip.
    #[must_use]
    pub fn new(guardrail: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            guardrail: guardrail.into(),
            reason: reason.into(),
        }
    }

    /// The triggered event for this trip.
    #[must_use]
    pub fn event(&self) -> GuardrailEvent {
        GuardrailEvent {
            name: self.guardrail.clone(),
            triggered: true,
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of one guardrail for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailEvent {
    /// Guardrail name.
    pub name: String,
    /// Whether it tripped.
    pub triggered: bool,
    /// Trip reason, or a short pass note.
    pub reason: String,
}

impl GuardrailEvent {
    /// A guardrail that did not trip.
    #[must_use]
    pub fn passed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            triggered: false,
            reason: "passed".to_string(),
        }
    }
}

/// Shared, monotonically increasing cost counter in dollars.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct CostMeter {
    bits: Arc<AtomicU64>,
}

impl CostMeter {
    /// Creates a meter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount`. Negative and non-finite amounts are ignored.
    pub fn add(&self, amount: f64) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + amount).to_bits())
            });
    }

    /// Current total.
    #[must_use]
    pub fn total(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Model prices in dollars per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    /// Price of prompt tokens.
    pub input_per_million: f64,
    /// Price of completion tokens.
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 0.15,
            output_per_million: 0.60,
        }
    }
}

impl Pricing {
    /// Dollar cost of `usage`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, usage: TokenUsage) -> f64 {
        let input = usage.input_tokens() as f64 * self.input_per_million;
        let output = usage.output_tokens() as f64 * self.output_per_million;
        (input + output) / 1_000_000.0
    }
}

/// A check that runs alongside the agent.
#[async_trait]
pub trait Guardrail: Send + Sync {
    /// Guardrail name for events and logs.
    fn name(&self) -> &str;

    /// Resolves when the guardrail trips. Never resolves otherwise.
    async fn watch(&self) -> GuardrailTrip;
}

/// Trips when the shared cost exceeds a ceiling.
#[derive(Debug, Clone)]
pub struct CostGuardrail {
    max_cost: f64,
    meter: CostMeter,
    check_interval: Duration,
}

impl CostGuardrail {
    /// Guardrail name.
    pub const NAME: &'static str = "cost";

    /// Creates a cost guardrail polling every [`DEFAULT_CHECK_INTERVAL`].
    #[must_use]
    pub const fn new(max_cost: f64, meter: CostMeter) -> Self {
        Self {
            max_cost,
            meter,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Overrides the polling interval.
    #[must_use]
    pub const fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }
}

#[async_trait]
impl Guardrail for CostGuardrail {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn watch(&self) -> GuardrailTrip {
        loop {
            let total = self.meter.total();
            if total > self.max_cost {
                return GuardrailTrip::new(
                    Self::NAME,
                    format!("cost ${total:.4} exceeded limit ${:.4}", self.max_cost),
                );
            }
            tokio::time::sleep(self.check_interval).await;
        }
    }
}

/// Rejects questions containing blocked keywords.
#[derive(Debug, Clone, Default)]
pub struct ContentGuardrail {
    blocked_keywords: Vec<String>,
}

impl ContentGuardrail {
    /// Guardrail name.
    pub const NAME: &'static str = "content";

    /// Creates a guardrail; keywords are lower-cased and blanks dropped.
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked_keywords: keywords
                .into_iter()
                .map(|kw| kw.as_ref().trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated keyword list.
    #[must_use]
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether any keywords are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocked_keywords.is_empty()
    }

    /// Checks `question` once.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardrailTrip`] naming the first blocked keyword found.
    pub fn check(&self, question: &str) -> Result<(), GuardrailTrip> {
        let lowered = question.to_lowercase();
        match self
            .blocked_keywords
            .iter()
            .find(|kw| lowered.contains(kw.as_str()))
        {
            Some(kw) => Err(GuardrailTrip::new(
                Self::NAME,
                format!("question contains blocked keyword '{kw}'"),
            )),
            None => Ok(()),
        }
    }
}

/// Aborts the wrapped task when dropped, so a cancelled `run` leaks nothing.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs an agent future under a set of polling guardrails.
#[derive(Clone, Default)]
pub struct GuardrailSupervisor {
    guardrails: Vec<Arc<dyn Guardrail>>,
}

impl std::fmt::Debug for GuardrailSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardrailSupervisor")
            .field("guardrails", &self.names())
            .finish()
    }
}

impl GuardrailSupervisor {
    /// Creates a supervisor with no guardrails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a guardrail.
    #[must_use]
    pub fn with_guardrail(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.guardrails.push(guardrail);
        self
    }

    /// Names of the supervised guardrails.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.guardrails.iter().map(|g| g.name().to_string()).collect()
    }

    /// Runs `agent` until it completes or a guardrail trips.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Guardrail`] on a trip, [`RunError::Orchestration`]
    /// if the agent task panics, or the agent's own error.
    pub async fn run<F, T>(&self, agent: F) -> Result<T, RunError>
    where
        F: Future<Output = Result<T, RunError>> + Send + 'static,
        T: Send + 'static,
    {
        let mut agent_task = AbortOnDrop(tokio::spawn(agent));
        let mut watchers = JoinSet::new();
        for guardrail in &self.guardrails {
            let guardrail = Arc::clone(guardrail);
            watchers.spawn(async move { guardrail.watch().await });
        }
        debug!(guardrails = watchers.len(), "supervising agent task");

        let outcome = loop {
            tokio::select! {
                biased;
                joined = &mut agent_task.0 => {
                    break joined.map_err(join_failed).and_then(|result| result);
                }
                Some(watched) = watchers.join_next(), if !watchers.is_empty() => {
                    match watched {
                        Ok(trip) => {
                            warn!(
                                guardrail = %trip.guardrail,
                                reason = %trip.reason,
                                "guardrail tripped"
                            );
                            agent_task.0.abort();
                            // Resolves once the agent future has been dropped.
                            let _ = (&mut agent_task.0).await;
                            break Err(RunError::Guardrail(trip));
                        }
                        Err(e) => warn!(error = %e, "guardrail task ended without a verdict"),
                    }
                }
            }
        };

        watchers.shutdown().await;
        outcome
    }
}

fn join_failed(err: JoinError) -> RunError {
    RunError::Orchestration {
        message: format!("Task join failed: {err}"),
    }
}
