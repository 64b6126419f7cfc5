//! wikiagent: a Wikipedia question-answering agent with an evaluation harness.
//!
//! An LLM answers questions by calling Wikipedia search and page tools.
//! Each [`SearchMode`](agent::SearchMode) bounds how many calls of each kind
//! a run may make; a [`GuardrailSupervisor`](agent::GuardrailSupervisor)
//! races the run against cost and content guardrails; and the
//! [`AgentCoordinator`](agent::AgentCoordinator) turns every outcome into an
//! [`AgentResult`](agent::AgentResult) carrying either an answer or a
//! classified error.
//!
//! The [`eval`] module runs a ground-truth dataset through the agent,
//! scores answers with an LLM judge plus hit rate and MRR, and writes a
//! ranked JSON report.
//!
//! # Example
//!
//! ```no_run
//! use wikiagent::agent::{AgentConfig, AgentCoordinator, SearchMode};
//!
//! # async fn demo() -> Result<(), wikiagent::error::RunError> {
//! let config = AgentConfig::from_env()?;
//! let coordinator = AgentCoordinator::from_config(config)?;
//! let result = coordinator
//!     .run("Who designed the Eiffel Tower?", None, SearchMode::Production)
//!     .await;
//! if let Some(answer) = result.answer() {
//!     tracing::info!(answer = %answer.answer, sources = ?answer.sources_used, "answered");
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod eval;
pub mod logging;
pub mod wiki;

pub use error::{EvalError, RunError, TransportError};
