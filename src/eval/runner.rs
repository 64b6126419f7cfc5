//! Sequential evaluation over a dataset.
//!
//! Each item is answered, judged and scored in turn. A failing item is
//! logged and recorded as [`EvaluationRecord::fallback`]; it never stops
//! the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::dataset::{GroundTruthItem, load_dataset};
use super::judge::{DEFAULT_MAX_RETRIES, JudgeEvaluator};
use super::report::{EvaluationRecord, EvaluationReport, ReportMetadata, save_report};
use crate::agent::answer::AgentResult;
use crate::agent::coordinator::AgentCoordinator;
use crate::agent::failure::{AgentError, ErrorCategory};
use crate::agent::mode::SearchMode;
use crate::core::{ScoringFormula, WeightedScore, hit_rate, mrr};
use crate::error::EvalError;

/// Characters of a question shown in progress logs.
const QUESTION_PREVIEW_LEN: usize = 50;

/// Anything that can answer a dataset question.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Answers `question` under `mode`. Failures are carried in the result.
    async fn answer(&self, question: &str, mode: SearchMode) -> AgentResult;
}

#[async_trait]
impl QuestionAnswerer for AgentCoordinator {
    async fn answer(&self, question: &str, mode: SearchMode) -> AgentResult {
        self.run(question, None, mode).await
    }
}

/// Runs a dataset through the agent and the judge.
#[derive(Clone)]
pub struct EvaluationRunner {
    agent: Arc<dyn QuestionAnswerer>,
    judge: JudgeEvaluator,
    formula: Arc<dyn ScoringFormula>,
    judge_retries: u32,
}

impl std::fmt::Debug for EvaluationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationRunner")
            .field("judge", &self.judge)
            .field("judge_retries", &self.judge_retries)
            .finish_non_exhaustive()
    }
}

impl EvaluationRunner {
    /// Creates a runner scoring with [`WeightedScore::default`].
    #[must_use]
    pub fn new(agent: Arc<dyn QuestionAnswerer>, judge: JudgeEvaluator) -> Self {
        Self {
            agent,
            judge,
            formula: Arc::new(WeightedScore::default()),
            judge_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Replaces the combined-score formula.
    #[must_use]
    pub fn with_formula(mut self, formula: Arc<dyn ScoringFormula>) -> Self {
        self.formula = formula;
        self
    }

    /// Sets the judge attempt count.
    #[must_use]
    pub const fn with_judge_retries(mut self, retries: u32) -> Self {
        self.judge_retries = retries;
        self
    }

    /// Evaluates every item in `dataset_path` and writes the report to
    /// `output_path`. Returns the path actually written.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if the dataset cannot be loaded or the report
    /// cannot be written. Individual item failures are not errors.
    pub async fn run(
        &self,
        dataset_path: &Path,
        output_path: &Path,
        mode: SearchMode,
        judge_model: Option<&str>,
    ) -> Result<PathBuf, EvalError> {
        let items = load_dataset(dataset_path)?;
        let judge = match judge_model {
            Some(model) => self.judge.clone().with_model(model),
            None => self.judge.clone(),
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let position = index + 1;
            let preview: String = item.question.chars().take(QUESTION_PREVIEW_LEN).collect();
            info!(position, total = items.len(), question = %preview, "evaluating question");

            let record = match self.evaluate_item(&judge, item, mode).await {
                Ok(record) => {
                    info!(
                        position,
                        hit_rate = record.hit_rate(),
                        mrr = record.mrr(),
                        judge_score = record.judge_score(),
                        combined_score = record.combined_score(),
                        "question complete"
                    );
                    record
                }
                Err(e) => {
                    error!(
                        position,
                        category = %e.category,
                        error = %e.technical_details,
                        "question failed"
                    );
                    EvaluationRecord::fallback(&item.question)
                }
            };
            records.push(record);
        }

        let metadata = ReportMetadata {
            ground_truth_file: dataset_path.display().to_string(),
            search_mode: mode,
            judge_model: judge_model.map(str::to_string),
        };
        save_report(&EvaluationReport::new(records, metadata), output_path)
    }

    /// Answers, judges and scores one item.
    ///
    /// # Errors
    ///
    /// Returns the agent's [`AgentError`] if it produced no answer.
    pub async fn evaluate_item(
        &self,
        judge: &JudgeEvaluator,
        item: &GroundTruthItem,
        mode: SearchMode,
    ) -> Result<EvaluationRecord, AgentError> {
        let result = self.agent.answer(&item.question, mode).await;
        if let Some(err) = result.error() {
            return Err(err.clone());
        }
        let Some(answer) = result.answer() else {
            return Err(AgentError::from_category(
                ErrorCategory::Unknown,
                "MissingAnswer",
                "agent returned neither an answer nor an error",
            ));
        };

        let expected: HashSet<String> = item.expected_sources.iter().cloned().collect();
        let hit = hit_rate(&expected, &answer.sources_used);
        let rank = mrr(&expected, &answer.sources_used);

        let (evaluation, judge_usage) = judge
            .evaluate(
                &item.question,
                answer,
                Some(result.tool_calls()),
                self.judge_retries,
            )
            .await;

        let agent_usage = result.usage().unwrap_or_default();
        let tokens = (agent_usage + judge_usage).total_tokens();

        Ok(EvaluationRecord::new(
            &item.question,
            hit,
            rank,
            evaluation.overall_score,
            tokens,
            self.formula.as_ref(),
        ))
    }
}
