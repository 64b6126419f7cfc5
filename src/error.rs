//! Error types for wikiagent.
//!
//! [`RunError`] covers everything that can go wrong while answering one
//! question. [`TransportError`] is raised by the page collaborators and is
//! tagged by failure kind so callers never need to inspect message text.
//! [`EvalError`] covers dataset loading and report persistence.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::agent::guardrail::GuardrailTrip;

/// Failures from the page-search and page-content collaborators.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The call did not complete within its deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Operation that timed out (e.g. `"search"`).
        operation: String,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// The remote host could not be reached.
    #[error("connection failed: {message}")]
    Network {
        /// Underlying transport message.
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("remote API returned HTTP {status}: {message}")]
    RemoteApi {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },
}

/// Errors raised while running the agent for a single question.
///
/// These never leave the coordinator: it converts every `RunError` into a
/// structured [`AgentError`](crate::agent::AgentError) before returning.
#[derive(Debug, Error)]
pub enum RunError {
    /// No API key was configured.
    #[error("API key not configured: set OPENAI_API_KEY or WIKIAGENT_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// Invalid configuration or input.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The model provider rejected or failed the request.
    #[error("model API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status when known.
        status: Option<u16>,
    },

    /// The model response stream broke mid-flight.
    #[error("model stream failed: {message}")]
    Stream {
        /// Stream error message.
        message: String,
    },

    /// A tool collaborator failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The model kept calling tools past the iteration limit.
    #[error("tool-calling loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured iteration limit.
        max_iterations: usize,
    },

    /// The model's structured output could not be parsed.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parser message.
        message: String,
        /// Raw content that failed to parse.
        content: String,
    },

    /// A guardrail aborted the run.
    #[error(transparent)]
    Guardrail(#[from] GuardrailTrip),

    /// Task scheduling or join failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure detail.
        message: String,
    },
}

impl RunError {
    /// Short, stable name of the failure kind.
    ///
    /// Used as the "type name" input of keyword classification.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ApiKeyMissing => "ApiKeyMissing",
            Self::UnsupportedProvider { .. } => "UnsupportedProvider",
            Self::Configuration(_) => "Configuration",
            Self::ApiRequest { .. } => "ApiRequest",
            Self::Stream { .. } => "Stream",
            Self::Transport(TransportError::Timeout { .. }) => "TransportTimeout",
            Self::Transport(TransportError::Network { .. }) => "TransportNetworkError",
            Self::Transport(TransportError::RemoteApi { .. }) => "RemoteAPIError",
            Self::Transport(TransportError::Decode { .. }) => "TransportDecodeError",
            Self::ToolExecution { .. } => "ToolExecution",
            Self::ToolLoopExceeded { .. } => "ToolLoopExceeded",
            Self::ResponseParse { .. } => "ResponseParse",
            Self::Guardrail(_) => "GuardrailTrip",
            Self::Orchestration { .. } => "Orchestration",
        }
    }
}

/// Errors from the evaluation harness's file handling.
///
/// Per-item agent or judge failures are not represented here; the runner
/// absorbs those into fallback records.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The ground-truth dataset does not exist.
    #[error("ground truth file not found: {}", path.display())]
    DatasetNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The dataset is not a valid JSON list of items.
    #[error("invalid ground truth file {}: {source}", path.display())]
    DatasetParse {
        /// Dataset path.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("failed to serialize evaluation report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout {
            operation: "search".to_string(),
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "search timed out after 10000ms");

        let err = TransportError::RemoteApi {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_run_error_kind_is_tagged_for_transport() {
        let err = RunError::from(TransportError::Network {
            message: "refused".to_string(),
        });
        assert_eq!(err.kind(), "TransportNetworkError");
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::DatasetNotFound {
            path: PathBuf::from("evals/missing.json"),
        };
        assert_eq!(
            err.to_string(),
            "ground truth file not found: evals/missing.json"
        );
    }
}
