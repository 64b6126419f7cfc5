//! Evaluation harness.
//!
//! Runs every question of a ground-truth dataset through the agent, scores
//! the answers with an LLM judge and source metrics, and persists a ranked
//! JSON report.
//!
//! ```text
//! dataset → EvaluationRunner
//!   ├── QuestionAnswerer (agent coordinator)
//!   ├── hit_rate / mrr against expected sources
//!   ├── JudgeEvaluator (retrying, never fails)
//!   ├── ScoringFormula → EvaluationRecord
//!   └── save_report → results/<name>.json
//! ```

pub mod dataset;
pub mod judge;
pub mod report;
pub mod runner;

pub use dataset::{GroundTruthItem, load_dataset};
pub use judge::{JudgeAgent, JudgeEvaluation, JudgeEvaluator};
pub use report::{EvaluationRecord, EvaluationReport, ReportMetadata, ReportSummary, save_report};
pub use runner::{EvaluationRunner, QuestionAnswerer};
