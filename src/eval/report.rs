//! Per-question records and the persisted evaluation report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::mode::SearchMode;
use crate::core::ScoringFormula;
use crate::error::EvalError;

/// Scores for one dataset question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    question: String,
    hit_rate: f64,
    mrr: f64,
    judge_score: f64,
    num_tokens: u64,
    combined_score: f64,
}

impl EvaluationRecord {
    /// Builds a record, computing the combined score with `formula`.
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        hit_rate: f64,
        mrr: f64,
        judge_score: f64,
        num_tokens: u64,
        formula: &dyn ScoringFormula,
    ) -> Self {
        Self {
            question: question.into(),
            hit_rate,
            mrr,
            judge_score,
            num_tokens,
            combined_score: formula.score(hit_rate, judge_score, num_tokens),
        }
    }

    /// All-zero record for a question whose evaluation failed.
    #[must_use]
    pub fn fallback(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            hit_rate: 0.0,
            mrr: 0.0,
            judge_score: 0.0,
            num_tokens: 0,
            combined_score: 0.0,
        }
    }

    /// The question.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Whether any expected source was cited.
    #[must_use]
    pub const fn hit_rate(&self) -> f64 {
        self.hit_rate
    }

    /// Reciprocal rank of the first expected source.
    #[must_use]
    pub const fn mrr(&self) -> f64 {
        self.mrr
    }

    /// Judge's overall score.
    #[must_use]
    pub const fn judge_score(&self) -> f64 {
        self.judge_score
    }

    /// Agent plus judge tokens.
    #[must_use]
    pub const fn num_tokens(&self) -> u64 {
        self.num_tokens
    }

    /// Ranking score.
    #[must_use]
    pub const fn combined_score(&self) -> f64 {
        self.combined_score
    }
}

/// Aggregates over all records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Mean hit rate.
    pub avg_hit_rate: f64,
    /// Mean MRR.
    pub avg_mrr: f64,
    /// Mean judge score.
    pub avg_judge_score: f64,
    /// Mean tokens per question.
    pub avg_num_tokens: f64,
    /// Tokens over all questions.
    pub total_tokens: u64,
    /// Mean combined score.
    pub avg_combined_score: f64,
    /// Highest combined score.
    pub best_combined_score: f64,
}

impl ReportSummary {
    /// Summarises `records`; all zeros when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let n = records.len() as f64;
        let mean = |f: fn(&EvaluationRecord) -> f64| records.iter().map(f).sum::<f64>() / n;
        let total_tokens = records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.num_tokens));

        Self {
            avg_hit_rate: mean(EvaluationRecord::hit_rate),
            avg_mrr: mean(EvaluationRecord::mrr),
            avg_judge_score: mean(EvaluationRecord::judge_score),
            avg_num_tokens: total_tokens as f64 / n,
            total_tokens,
            avg_combined_score: mean(EvaluationRecord::combined_score),
            best_combined_score: records
                .iter()
                .map(EvaluationRecord::combined_score)
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Run parameters recorded alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset the run used.
    pub ground_truth_file: String,
    /// Agent search mode.
    pub search_mode: SearchMode,
    /// Judge model, when overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
}

/// The persisted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// When the report was built.
    pub timestamp: DateTime<Utc>,
    /// Number of records.
    pub num_questions: usize,
    /// Aggregates.
    pub summary: ReportSummary,
    /// Records, best combined score first.
    pub results: Vec<EvaluationRecord>,
    /// Run parameters.
    pub metadata: ReportMetadata,
}

impl EvaluationReport {
    /// Builds a report, ranking `records` by combined score descending.
    #[must_use]
    pub fn new(mut records: Vec<EvaluationRecord>, metadata: ReportMetadata) -> Self {
        records.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
        Self {
            timestamp: Utc::now(),
            num_questions: records.len(),
            summary: ReportSummary::from_records(&records),
            results: records,
            metadata,
        }
    }
}

/// Writes `report` as pretty JSON and returns the path written.
///
/// A `.json` extension is added if `output` lacks one, and missing parent
/// directories are created.
///
/// # Errors
///
/// Returns [`EvalError::Io`] on filesystem failures.
pub fn save_report(report: &EvaluationReport, output: &Path) -> Result<PathBuf, EvalError> {
    let path = if output.extension().is_some_and(|ext| ext == "json") {
        output.to_path_buf()
    } else {
        output.with_extension("json")
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| EvalError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, format!("{json}\n")).map_err(|source| EvalError::Io {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        questions = report.num_questions,
        best = report.summary.best_combined_score,
        "evaluation report saved"
    );
    Ok(path)
}
