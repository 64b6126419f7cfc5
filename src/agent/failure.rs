//! Turning run failures into user-facing errors.
//!
//! Typed failures map straight to a category. Anything else is matched
//! against an ordered keyword table over the failure kind and message,
//! first match wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RunError, TransportError};

/// Broad failure category shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The model or page API rejected the request.
    #[serde(rename = "ModelAPI")]
    ModelApi,
    /// A remote host could not be reached.
    Network,
    /// A call took too long.
    Timeout,
    /// Anything else.
    Unknown,
    /// A guardrail stopped the run.
    GuardrailTrip,
}

impl ErrorCategory {
    /// Stable category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModelApi => "ModelAPI",
            Self::Network => "Network",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown",
            Self::GuardrailTrip => "GuardrailTrip",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword fallback, checked in order.
const KEYWORD_TABLE: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::ModelApi, &["api", "http"]),
    (ErrorCategory::Network, &["connection"]),
    (ErrorCategory::Timeout, &["timeout"]),
];

/// A classified failure with a message and a suggested next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentError {
    /// Failure category.
    pub category: ErrorCategory,
    /// What went wrong, in plain words.
    pub message: String,
    /// What the user can do about it.
    pub suggestion: String,
    /// Raw failure text for `--verbose` output and logs.
    pub technical_details: String,
}

impl AgentError {
    /// Creates an error.
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        technical_details: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            suggestion: suggestion.into(),
            technical_details: technical_details.into(),
        }
    }

    /// Standard message and suggestion for `category`.
    #[must_use]
    pub fn from_category(
        category: ErrorCategory,
        kind: &str,
        technical_details: impl Into<String>,
    ) -> Self {
        let (message, suggestion) = match category {
            ErrorCategory::ModelApi => (
                "Wikipedia or model API error. The page may not exist or the service is \
                 temporarily unavailable."
                    .to_string(),
                "Try rephrasing your question or asking about a different topic.",
            ),
            ErrorCategory::Network => (
                "Connection error. Please check your internet connection.".to_string(),
                "The Wikipedia API could not be reached. Please try again in a moment.",
            ),
            ErrorCategory::Timeout => (
                "Request timed out. The Wikipedia API took too long to respond.".to_string(),
                "Please try again with a simpler question or check your connection.",
            ),
            ErrorCategory::GuardrailTrip => (
                "The request was stopped by a safety guardrail.".to_string(),
                "Rephrase the question or raise the configured limit.",
            ),
            ErrorCategory::Unknown => (
                format!("An error occurred: {kind}"),
                "Please try again. If the problem persists, check your internet connection \
                 and API configuration.",
            ),
        };
        Self::new(category, message, suggestion, technical_details)
    }

    /// Classifies a run failure.
    #[must_use]
    pub fn classify(err: &RunError) -> Self {
        let details = err.to_string();
        match err {
            RunError::Guardrail(trip) => Self::new(
                ErrorCategory::GuardrailTrip,
                format!("Guardrail '{}' stopped the request: {}", trip.guardrail, trip.reason),
                "Rephrase the question or raise the configured limit.",
                details,
            ),
            RunError::Transport(TransportError::Timeout { .. }) => {
                Self::from_category(ErrorCategory::Timeout, err.kind(), details)
            }
            RunError::Transport(TransportError::Network { .. }) => {
                Self::from_category(ErrorCategory::Network, err.kind(), details)
            }
            RunError::Transport(TransportError::RemoteApi { .. }) | RunError::ApiRequest { .. } => {
                Self::from_category(ErrorCategory::ModelApi, err.kind(), details)
            }
            _ => Self::from_category(classify_text(err.kind(), &details), err.kind(), details),
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Matches the keyword table against `kind` and `message`, lower-cased.
#[must_use]
pub fn classify_text(kind: &str, message: &str) -> ErrorCategory {
    let haystack = format!("{kind} {message}").to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
        .map_or(ErrorCategory::Unknown, |(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::guardrail::GuardrailTrip;
    use std::time::Duration;
    use test_case::test_case;

    #[test_case("Stream", "HTTP 502 from upstream", ErrorCategory::ModelApi ; "http keyword")]
    #[test_case("Stream", "connection reset by peer", ErrorCategory::Network ; "connection keyword")]
    #[test_case("Orchestration", "operation timeout", ErrorCategory::Timeout ; "timeout keyword")]
    #[test_case("Orchestration", "something odd", ErrorCategory::Unknown ; "no match")]
    #[test_case("RemoteAPIError", "", ErrorCategory::ModelApi ; "kind name matches")]
    #[test_case("X", "api connection timeout", ErrorCategory::ModelApi ; "first table entry wins")]
    fn test_classify_text(kind: &str, message: &str, expected: ErrorCategory) {
        assert_eq!(classify_text(kind, message), expected);
    }

    #[test]
    fn test_typed_transport_failures() {
        let timeout = RunError::from(TransportError::Timeout {
            operation: "search".to_string(),
            after: Duration::from_secs(10),
        });
        assert_eq!(AgentError::classify(&timeout).category, ErrorCategory::Timeout);

        // Message mentions "api" but the typed mapping takes precedence.
        let network = RunError::from(TransportError::Network {
            message: "api.example.org unreachable".to_string(),
        });
        assert_eq!(AgentError::classify(&network).category, ErrorCategory::Network);

        let remote = RunError::from(TransportError::RemoteApi {
            status: 404,
            message: "missing".to_string(),
        });
        let classified = AgentError::classify(&remote);
        assert_eq!(classified.category, ErrorCategory::ModelApi);
        assert!(classified.technical_details.contains("404"));
    }

    #[test]
    fn test_guardrail_trip_is_not_keyword_matched() {
        let trip = RunError::from(GuardrailTrip::new("cost", "cost 1.20 exceeded limit 1.00"));
        let classified = AgentError::classify(&trip);
        assert_eq!(classified.category, ErrorCategory::GuardrailTrip);
        assert!(classified.message.contains("cost"));
    }

    #[test]
    fn test_unknown_message_names_kind() {
        let err = RunError::ToolLoopExceeded { max_iterations: 3 };
        let classified = AgentError::classify(&err);
        assert_eq!(classified.category, ErrorCategory::Unknown);
        assert_eq!(classified.message, "An error occurred: ToolLoopExceeded");
    }

    #[test]
    fn test_category_serializes_as_model_api() {
        let json = serde_json::to_string(&ErrorCategory::ModelApi).unwrap_or_default();
        assert_eq!(json, "\"ModelAPI\"");
    }
}
