//! Tracing subscriber setup for the binary.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::RunError;

static LOGGING_GUARD: OnceLock<()> = OnceLock::new();

/// Options for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Explicit filter directive; overrides the environment.
    pub env_filter: Option<String>,
    /// Colourise output.
    pub with_ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            env_filter: None,
            with_ansi: true,
        }
    }
}

impl LogOptions {
    /// Options for `--verbose`: debug level for this crate.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            env_filter: Some("wikiagent=debug,info".to_string()),
            ..Self::default()
        }
    }
}

/// Resolves the filter: explicit, then `RUST_LOG`, then `LOG_LEVEL`, then `info`.
fn resolve_filter(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("RUST_LOG").ok())
        .or_else(|| std::env::var("LOG_LEVEL").ok().map(|l| l.to_lowercase()))
        .unwrap_or_else(|| "info".to_string())
}

/// Installs the global subscriber, writing to stderr.
///
/// Safe to call multiple times; only the first invocation installs the subscriber.
///
/// # Errors
///
/// Returns [`RunError::Configuration`] if another subscriber is already set.
pub fn init_logging(options: LogOptions) -> Result<(), RunError> {
    if LOGGING_GUARD.get().is_some() {
        return Ok(());
    }

    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new(resolve_filter(options.env_filter)))
        .with_ansi(options.with_ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| RunError::Configuration(format!("logging init failed: {err}")))?;

    LOGGING_GUARD.get_or_init(|| ());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filter_wins() {
        assert_eq!(resolve_filter(Some("trace".to_string())), "trace");
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init_logging(LogOptions {
            env_filter: Some("warn".to_string()),
            with_ansi: false,
        });
        // A second call is a no-op once the first succeeded.
        if first.is_ok() {
            assert!(init_logging(LogOptions::verbose()).is_ok());
        }
    }
}
