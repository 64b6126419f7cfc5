//! CLI command implementations.
//!
//! Each command builds the configuration from the environment, spins up a
//! tokio runtime and returns its rendered output. Progress for `--stream`
//! goes to stderr so stdout carries only the result.

#![allow(clippy::uninlined_format_args)]

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use crate::agent::agentic_loop::{StreamObserver, StreamUpdate};
use crate::agent::config::AgentConfig;
use crate::agent::coordinator::AgentCoordinator;
use crate::agent::mode::SearchMode;
use crate::cli::output::{
    OutputFormat, format_agent_result, format_evaluation_saved, format_judgement,
};
use crate::cli::parser::{Cli, Commands};
use crate::eval::{EvaluationRunner, JudgeEvaluator};

/// The agent ran but produced no answer.
///
/// Carries the rendered result so the binary can print it and exit non-zero.
#[derive(Debug, Error)]
#[error("{rendered}")]
pub struct AgentRunFailed {
    /// Output rendered in the requested format.
    pub rendered: String,
}

/// Executes the parsed CLI command.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the runtime cannot
/// start, or the command fails. A failed agent run is reported as
/// [`AgentRunFailed`].
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = AgentConfig::builder()
        .from_env()
        .and_then(|builder| builder.build())
        .context("invalid configuration")?;

    match &cli.command {
        Commands::Ask {
            question,
            mode,
            model,
            stream,
        } => {
            let mode = mode.unwrap_or(config.search_mode);
            cmd_ask(config, question, mode, model.as_deref(), *stream, format, cli.verbose)
        }
        Commands::Judge {
            question,
            mode,
            judge_model,
        } => cmd_judge(config, question, *mode, judge_model.as_deref(), format, cli.verbose),
        Commands::Evaluate {
            dataset,
            output,
            mode,
            judge_model,
        } => cmd_evaluate(config, dataset, output, *mode, judge_model.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

fn cmd_ask(
    config: AgentConfig,
    question: &str,
    mode: SearchMode,
    model: Option<&str>,
    stream: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    let coordinator = AgentCoordinator::from_config(config)?;
    debug!(%mode, stream, "running ask");

    let rt = runtime()?;
    let result = if stream {
        rt.block_on(coordinator.run_streaming(question, model, mode, stderr_observer()))
    } else {
        rt.block_on(coordinator.run(question, model, mode))
    };

    let rendered = format_agent_result(&result, format, verbose);
    if result.is_success() {
        Ok(rendered)
    } else {
        Err(AgentRunFailed { rendered }.into())
    }
}

fn cmd_judge(
    config: AgentConfig,
    question: &str,
    mode: SearchMode,
    judge_model: Option<&str>,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    let retries = config.judge_max_retries;
    let coordinator = AgentCoordinator::from_config(config)?;
    let judge = JudgeEvaluator::new(coordinator.provider(), coordinator.config(), judge_model);

    let rt = runtime()?;
    let result = rt.block_on(coordinator.run(question, None, mode));
    let Some(answer) = result.answer() else {
        return Err(AgentRunFailed {
            rendered: format_agent_result(&result, format, verbose),
        }
        .into());
    };

    let (evaluation, judge_usage) =
        rt.block_on(judge.evaluate(question, answer, Some(result.tool_calls()), retries));
    Ok(format_judgement(&result, &evaluation, judge_usage, format, verbose))
}

fn cmd_evaluate(
    config: AgentConfig,
    dataset: &Path,
    output: &Path,
    mode: SearchMode,
    judge_model: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let weights = config.score_weights;
    let retries = config.judge_max_retries;
    let coordinator = AgentCoordinator::from_config(config)?;
    let judge = JudgeEvaluator::new(coordinator.provider(), coordinator.config(), None);
    let runner = EvaluationRunner::new(Arc::new(coordinator), judge)
        .with_formula(Arc::new(weights))
        .with_judge_retries(retries);

    let rt = runtime()?;
    let saved = rt
        .block_on(runner.run(dataset, output, mode, judge_model))
        .with_context(|| format!("evaluation of {} failed", dataset.display()))?;
    Ok(format_evaluation_saved(&saved, format))
}

/// Writes streamed tool calls and answer text to stderr.
fn stderr_observer() -> StreamObserver {
    Arc::new(|update: StreamUpdate<'_>| {
        let mut err = std::io::stderr().lock();
        let _ = match update {
            StreamUpdate::ToolCall(call) => {
                writeln!(err, "[tool {}] {} {}", call.sequence, call.tool_name, call.args)
            }
            StreamUpdate::OutputDelta(delta) => {
                write!(err, "{delta}").and_then(|()| err.flush())
            }
            StreamUpdate::OutputRestarted => writeln!(err),
        };
    })
}
