//! Provider selection from configuration.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::RunError;

/// Backends selectable through `WIKIAGENT_PROVIDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// api.openai.com, or `OPENAI_BASE_URL` when set.
    OpenAi,
    /// Any server speaking the `OpenAI` chat API; needs a base URL.
    OpenAiCompatible,
}

impl ProviderKind {
    /// Parses a configured provider name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::UnsupportedProvider`] for unknown names.
    pub fn parse(name: &str) -> Result<Self, RunError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openai-compatible" | "compatible" => Ok(Self::OpenAiCompatible),
            _ => Err(RunError::UnsupportedProvider {
                name: name.to_string(),
            }),
        }
    }
}

/// Creates the provider named by `config.provider`.
///
/// # Errors
///
/// Returns [`RunError::UnsupportedProvider`] for unknown names and
/// [`RunError::Configuration`] when a compatible backend has no base URL.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, RunError> {
    match ProviderKind::parse(&config.provider)? {
        ProviderKind::OpenAi => {}
        ProviderKind::OpenAiCompatible if config.base_url.is_none() => {
            return Err(RunError::Configuration(
                "provider 'openai-compatible' requires OPENAI_BASE_URL".to_string(),
            ));
        }
        ProviderKind::OpenAiCompatible => {}
    }
    Ok(Arc::new(OpenAiProvider::new(config)?))
}
