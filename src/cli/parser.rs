//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::mode::SearchMode;

/// Default ground-truth dataset for `evaluate`.
pub const DEFAULT_DATASET: &str = "evals/ground_truth.json";
/// Default report path for `evaluate`.
pub const DEFAULT_REPORT: &str = "evals/results/evaluation.json";

/// wikiagent: answer questions from Wikipedia with a budgeted LLM agent.
///
/// Reads `OPENAI_API_KEY` (or `WIKIAGENT_API_KEY`) from the environment.
#[derive(Parser, Debug)]
#[command(name = "wikiagent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logs, technical error details).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question using Wikipedia.
    #[command(after_help = r#"Examples:
  wikiagent ask "Who designed the Eiffel Tower?"
  wikiagent ask "What is a capybara?" --mode production
  wikiagent ask "History of the printing press" --mode research --stream
  wikiagent --format json ask "Capital of Australia?" | jq '.answer'
"#)]
    Ask {
        /// The question to answer.
        question: String,

        /// Search mode: evaluation, production, research [default: configured mode].
        #[arg(short, long)]
        mode: Option<SearchMode>,

        /// Model for the search agent.
        #[arg(long)]
        model: Option<String>,

        /// Stream tool calls and output as they happen.
        #[arg(short, long)]
        stream: bool,
    },

    /// Answer a question, then score the answer with the judge.
    #[command(after_help = r#"Examples:
  wikiagent judge "Who wrote Dune?"
  wikiagent judge "Who wrote Dune?" --judge-model gpt-4.1
"#)]
    Judge {
        /// The question to answer and judge.
        question: String,

        /// Search mode for the agent.
        #[arg(short, long, default_value = "evaluation")]
        mode: SearchMode,

        /// Model for the judge.
        #[arg(long)]
        judge_model: Option<String>,
    },

    /// Evaluate the agent over a ground-truth dataset.
    #[command(after_help = r#"Examples:
  wikiagent evaluate
  wikiagent evaluate --dataset evals/ground_truth.json --output evals/results/prod
  wikiagent evaluate --mode production --judge-model gpt-4o
"#)]
    Evaluate {
        /// JSON array of {question, expected_sources}.
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        dataset: PathBuf,

        /// Report path (`.json` is appended if missing).
        #[arg(short, long, default_value = DEFAULT_REPORT)]
        output: PathBuf,

        /// Search mode for the agent.
        #[arg(short, long, default_value = "evaluation")]
        mode: SearchMode,

        /// Model for the judge.
        #[arg(long)]
        judge_model: Option<String>,
    },
}
