//! Output formatting for CLI commands.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::agent::answer::AgentResult;
use crate::agent::failure::AgentError;
use crate::agent::tool::{GET_PAGE_TOOL, SEARCH_TOOL};
use crate::core::TokenUsage;
use crate::eval::JudgeEvaluation;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, falling back to text for anything unknown.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        serde_json::to_string_pretty(value).map_or_else(
            |e| format!("{{\"error\": \"serialization failed: {e}\"}}\n"),
            |json| format!("{json}\n"),
        )
    }
}

/// Formats an agent run.
#[must_use]
pub fn format_agent_result(result: &AgentResult, format: OutputFormat, verbose: bool) -> String {
    match format {
        OutputFormat::Json => format.to_json(result),
        OutputFormat::Text => {
            let mut out = String::new();
            if let Some(answer) = result.answer() {
                let _ = writeln!(out, "{}\n", answer.answer);
                let _ = writeln!(out, "Confidence: {:.2}", answer.confidence);
                if !answer.sources_used.is_empty() {
                    let _ = writeln!(out, "Sources:    {}", answer.sources_used.join(", "));
                }
                if verbose && let Some(reasoning) = &answer.reasoning {
                    let _ = writeln!(out, "Reasoning:  {reasoning}");
                }
            } else if let Some(error) = result.error() {
                out.push_str(&format_error(error, verbose));
            }

            let _ = writeln!(
                out,
                "Tool calls: {} ({} searches, {} page fetches)",
                result.tool_calls().len(),
                result.calls_of(SEARCH_TOOL),
                result.calls_of(GET_PAGE_TOOL)
            );
            if let Some(usage) = result.usage() {
                out.push_str(&format_usage(usage));
            }
            if verbose {
                for event in result.guardrail_events() {
                    let status = if event.triggered { "TRIPPED" } else { "ok" };
                    let _ = writeln!(out, "Guardrail {}: {status} ({})", event.name, event.reason);
                }
            }
            out
        }
    }
}

/// Formats a failure as message plus suggestion; details only when verbose.
#[must_use]
pub fn format_error(error: &AgentError, verbose: bool) -> String {
    let mut out = format!(
        "Error [{}]: {}\nSuggestion: {}\n",
        error.category, error.message, error.suggestion
    );
    if verbose {
        let _ = writeln!(out, "Details: {}", error.technical_details);
    }
    out
}

fn format_usage(usage: TokenUsage) -> String {
    format!(
        "Tokens:     {} (input {}, output {})\n",
        usage.total_tokens(),
        usage.input_tokens(),
        usage.output_tokens()
    )
}

/// Formats an answer together with the judge's verdict.
#[must_use]
pub fn format_judgement(
    result: &AgentResult,
    evaluation: &JudgeEvaluation,
    judge_usage: TokenUsage,
    format: OutputFormat,
    verbose: bool,
) -> String {
    match format {
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "result": result,
            "evaluation": evaluation,
            "judge_usage": judge_usage,
        })),
        OutputFormat::Text => {
            let mut out = format_agent_result(result, format, verbose);
            let _ = writeln!(out, "\nJudge");
            let _ = writeln!(out, "  Overall:      {:.2}", evaluation.overall_score);
            let _ = writeln!(out, "  Accuracy:     {:.2}", evaluation.accuracy);
            let _ = writeln!(out, "  Completeness: {:.2}", evaluation.completeness);
            let _ = writeln!(out, "  Relevance:    {:.2}", evaluation.relevance);
            let _ = writeln!(out, "  Reasoning:    {}", evaluation.reasoning);
            let _ = write!(out, "  {}", format_usage(judge_usage));
            out
        }
    }
}

/// Formats the outcome of an evaluation run.
#[must_use]
pub fn format_evaluation_saved(path: &Path, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Evaluation complete. Results saved to: {}\n", path.display()),
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "success": true,
            "path": path.display().to_string(),
        })),
    }
}
