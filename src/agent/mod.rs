//! Wikipedia question-answering agent.
//!
//! Answers one question at a time with an LLM that calls Wikipedia search
//! and page tools under a per-mode call budget, supervised by runtime
//! guardrails.
//!
//! # Architecture
//!
//! ```text
//! question → AgentCoordinator
//!   ├── ContentGuardrail (blocked keywords, before any model call)
//!   ├── GuardrailSupervisor
//!   │   ├── agent task: WikiSearchAgent → agentic_loop
//!   │   │   ├── LlmProvider (chat / chat_stream)
//!   │   │   ├── ToolExecutor → PageSource
//!   │   │   └── ToolInvocationTracker
//!   │   └── CostGuardrail (polls the CostMeter)
//!   └── AgentResult (answer or classified AgentError)
//! ```

pub mod agentic_loop;
pub mod answer;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod failure;
pub mod guardrail;
pub mod message;
pub mod mode;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod tool;
pub mod tracker;
pub mod traits;
pub mod wiki_agent;

// Re-export key types
pub use agentic_loop::{LoopContext, LoopOutcome, StreamObserver, StreamUpdate};
pub use answer::{AgentResult, SearchAgentAnswer};
pub use client::{ProviderKind, create_provider};
pub use config::AgentConfig;
pub use coordinator::AgentCoordinator;
pub use failure::{AgentError, ErrorCategory};
pub use guardrail::{
    ContentGuardrail, CostGuardrail, CostMeter, Guardrail, GuardrailEvent, GuardrailSupervisor,
    GuardrailTrip, Pricing,
};
pub use message::{ChatRequest, ChatResponse};
pub use mode::{SearchBudget, SearchMode};
pub use provider::{EventStream, LlmProvider, StreamEvent};
pub use tool::{ToolCall, ToolResult, WikiTool};
pub use tracker::{ToolInvocation, ToolInvocationTracker};
pub use traits::{Agent, Sampling};
pub use wiki_agent::WikiSearchAgent;
