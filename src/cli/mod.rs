//! Command-line surface: `ask`, `judge` and `evaluate`.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{AgentRunFailed, execute};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
