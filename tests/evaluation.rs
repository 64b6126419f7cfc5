//! Evaluation runs over small datasets written to temporary directories.

#![allow(clippy::panic)]

mod common;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use common::{PolicyProvider, Step, build, config, diligent_policy, eiffel_pages};
use wikiagent::agent::tool::SEARCH_TOOL;
use wikiagent::agent::{
    AgentCoordinator, AgentError, AgentResult, ChatRequest, ErrorCategory, SearchAgentAnswer,
    SearchMode, ToolInvocation,
};
use wikiagent::core::{ScoringFormula, TokenUsage, WeightedScore};
use wikiagent::error::EvalError;
use wikiagent::eval::{EvaluationReport, EvaluationRunner, JudgeEvaluator, QuestionAnswerer};

const CANBERRA: &str = "What is the capital of Australia?";
const BROKEN: &str = "Which question makes the agent fail?";
const EIFFEL: &str = "Who designed the Eiffel Tower?";

/// Answers from a fixed table; [`BROKEN`] fails.
struct TableAnswerer;

#[async_trait]
impl QuestionAnswerer for TableAnswerer {
    async fn answer(&self, question: &str, _mode: SearchMode) -> AgentResult {
        let trace = vec![ToolInvocation {
            sequence: 1,
            tool_name: SEARCH_TOOL.to_string(),
            args: serde_json::json!({ "query": question }),
        }];
        let usage = TokenUsage::new(1000, 200);
        match question {
            CANBERRA => AgentResult::success(
                SearchAgentAnswer::new("Canberra", 0.9, vec!["Canberra".to_string()], None),
                trace,
                usage,
            ),
            EIFFEL => AgentResult::success(
                SearchAgentAnswer::new(
                    "Gustave Eiffel's company",
                    0.8,
                    vec!["Gustave Eiffel".to_string(), "Eiffel Tower".to_string()],
                    None,
                ),
                trace,
                usage,
            ),
            _ => AgentResult::failure(
                AgentError::from_category(
                    ErrorCategory::ModelApi,
                    "ApiRequest",
                    "HTTP 500 from model API",
                ),
                trace,
                None,
            ),
        }
    }
}

fn verdict(overall: f64) -> String {
    serde_json::json!({
        "overall_score": overall,
        "accuracy": overall,
        "completeness": overall,
        "relevance": overall,
        "reasoning": "checked against the cited pages",
    })
    .to_string()
}

/// Judge scoring by which answer it is shown.
fn judge_policy(request: &ChatRequest) -> Step {
    let prompt = common::question(request);
    if prompt.contains("Canberra") {
        Step::Answer(verdict(0.9))
    } else {
        Step::Answer(verdict(0.6))
    }
}

fn write_dataset(dir: &Path, items: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("ground_truth.json");
    std::fs::write(&path, items.to_string()).unwrap_or_else(|e| panic!("{e}"));
    path
}

fn read_report(path: &Path) -> EvaluationReport {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("{e}"))
}

fn runner() -> EvaluationRunner {
    let judge = JudgeEvaluator::new(PolicyProvider::new(judge_policy), &build(config()), None);
    EvaluationRunner::new(Arc::new(TableAnswerer), judge)
}

#[tokio::test]
async fn test_failed_item_becomes_zero_record() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let dataset = write_dataset(
        dir.path(),
        &serde_json::json!([
            { "question": CANBERRA, "expected_sources": ["Canberra"] },
            { "question": BROKEN, "expected_sources": ["Nowhere"] },
            { "question": EIFFEL, "expected_sources": ["Eiffel Tower"] },
        ]),
    );

    let written = runner()
        .run(&dataset, &dir.path().join("results/run"), SearchMode::Evaluation, None)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(written, dir.path().join("results/run.json"));
    let report = read_report(&written);
    assert_eq!(report.num_questions, 3);
    assert_eq!(report.results.len(), 3);

    let broken = report
        .results
        .iter()
        .find(|r| r.question() == BROKEN)
        .unwrap_or_else(|| panic!("failed item missing from report"));
    assert!(broken.hit_rate().abs() < f64::EPSILON);
    assert!(broken.mrr().abs() < f64::EPSILON);
    assert!(broken.judge_score().abs() < f64::EPSILON);
    assert_eq!(broken.num_tokens(), 0);
    assert!(broken.combined_score().abs() < f64::EPSILON);

    let eiffel = report
        .results
        .iter()
        .find(|r| r.question() == EIFFEL)
        .unwrap_or_else(|| panic!("eiffel missing"));
    assert!((eiffel.hit_rate() - 1.0).abs() < f64::EPSILON);
    assert!((eiffel.mrr() - 0.5).abs() < f64::EPSILON);
    assert!((eiffel.judge_score() - 0.6).abs() < f64::EPSILON);
    // Agent tokens plus judge tokens.
    assert_eq!(eiffel.num_tokens(), 1200 + 120);
    let expected = WeightedScore::default().score(1.0, 0.6, 1320);
    assert!((eiffel.combined_score() - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_report_is_ranked_and_summarised() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let dataset = write_dataset(
        dir.path(),
        &serde_json::json!([
            { "question": EIFFEL, "expected_sources": ["Eiffel Tower"] },
            { "question": BROKEN },
            { "question": CANBERRA, "expected_sources": ["Canberra"] },
        ]),
    );

    let written = runner()
        .run(&dataset, &dir.path().join("report.json"), SearchMode::Production, Some("gpt-4.1"))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let report = read_report(&written);

    let scores: Vec<f64> = report.results.iter().map(|r| r.combined_score()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!((report.summary.best_combined_score - best).abs() < f64::EPSILON);
    assert_eq!(report.results[0].question(), CANBERRA);
    assert_eq!(report.summary.total_tokens, 2 * 1320);
    assert!((report.summary.avg_hit_rate - 2.0 / 3.0).abs() < 1e-9);

    assert_eq!(report.metadata.search_mode, SearchMode::Production);
    assert_eq!(report.metadata.judge_model.as_deref(), Some("gpt-4.1"));
    assert_eq!(report.metadata.ground_truth_file, dataset.display().to_string());
}

/// Ranks purely by the judge.
struct JudgeOnly;

impl ScoringFormula for JudgeOnly {
    fn score(&self, _hit_rate: f64, judge_score: f64, _num_tokens: u64) -> f64 {
        judge_score
    }
}

#[tokio::test]
async fn test_formula_is_swappable() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let dataset = write_dataset(
        dir.path(),
        &serde_json::json!([{ "question": EIFFEL, "expected_sources": [] }]),
    );

    let written = runner()
        .with_formula(Arc::new(JudgeOnly))
        .run(&dataset, &dir.path().join("judge_only"), SearchMode::Evaluation, None)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let report = read_report(&written);

    assert!((report.results[0].combined_score() - 0.6).abs() < f64::EPSILON);
    assert!(report.results[0].hit_rate().abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_missing_dataset_is_an_error() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let missing = dir.path().join("nope.json");

    let err = runner()
        .run(&missing, &dir.path().join("out"), SearchMode::Evaluation, None)
        .await;

    assert!(matches!(err, Err(EvalError::DatasetNotFound { ref path }) if *path == missing));
    assert!(!dir.path().join("out.json").exists());
}

#[tokio::test]
async fn test_empty_dataset_writes_zero_summary() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let dataset = write_dataset(dir.path(), &serde_json::json!([]));

    let written = runner()
        .run(&dataset, &dir.path().join("empty"), SearchMode::Evaluation, None)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let report = read_report(&written);

    assert_eq!(report.num_questions, 0);
    assert!(report.summary.best_combined_score.abs() < f64::EPSILON);
    assert!(report.summary.avg_combined_score.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_coordinator_and_judge_share_one_provider() {
    let agent = diligent_policy(3, 2, "Canberra");
    let provider = PolicyProvider::new(move |request| {
        if request.tools.is_empty() {
            judge_policy(request)
        } else {
            agent(request)
        }
    });
    let config = build(config());
    let judge = JudgeEvaluator::new(Arc::clone(&provider) as _, &config, None);
    let coordinator = AgentCoordinator::new(config, provider, Arc::new(eiffel_pages()));
    let runner = EvaluationRunner::new(Arc::new(coordinator), judge);

    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let dataset = write_dataset(
        dir.path(),
        &serde_json::json!([{ "question": CANBERRA, "expected_sources": ["Canberra"] }]),
    );
    let written = runner
        .run(&dataset, &dir.path().join("e2e"), SearchMode::Evaluation, None)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let record = &read_report(&written).results[0];

    assert!((record.hit_rate() - 1.0).abs() < f64::EPSILON);
    assert!((record.judge_score() - 0.9).abs() < f64::EPSILON);
    // Six agent turns and one judge turn at 120 tokens each.
    assert_eq!(record.num_tokens(), 7 * 120);
}
