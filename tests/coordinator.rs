//! End-to-end runs of the coordinator against a policy-driven model and
//! in-memory pages.

#![allow(clippy::panic)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{
    MemoryPages, PolicyProvider, Step, build, config, diligent_policy, eager_policy, eiffel_pages,
    search_call,
};
use test_case::test_case;
use wikiagent::agent::tool::{GET_PAGE_TOOL, SEARCH_TOOL};
use wikiagent::agent::{
    AgentCoordinator, ErrorCategory, SearchAgentAnswer, SearchMode, StreamObserver, StreamUpdate,
};
use wikiagent::core::TokenUsage;
use wikiagent::error::{RunError, TransportError};

fn coordinator(provider: Arc<PolicyProvider>, pages: MemoryPages) -> AgentCoordinator {
    AgentCoordinator::new(build(config()), provider, Arc::new(pages))
}

#[tokio::test]
async fn test_evaluation_mode_enforces_minimums_despite_confidence() {
    let provider = PolicyProvider::new(eager_policy(0.99, &["Eiffel Tower"]));
    let pages = Arc::new(eiffel_pages());
    let coordinator = AgentCoordinator::new(
        build(config()),
        Arc::clone(&provider) as _,
        Arc::clone(&pages) as _,
    );

    let result = coordinator
        .run("Who designed the Eiffel Tower?", None, SearchMode::Evaluation)
        .await;

    assert!(result.is_success(), "{:?}", result.error());
    assert!(result.calls_of(SEARCH_TOOL) >= 3);
    assert!(result.calls_of(GET_PAGE_TOOL) >= 2);
    assert_eq!(pages.search_calls.load(Ordering::SeqCst), 3);
    assert_eq!(pages.page_calls.load(Ordering::SeqCst), 2);
    // One rejected draft per tool call plus the opening one, then the accepted answer.
    assert_eq!(provider.calls(), 11);
}

#[test_case(0.95, &["Eiffel Tower"], 1, 0 ; "confident and cited stops early")]
#[test_case(0.5, &["Eiffel Tower"], 3, 2 ; "low confidence meets minimums")]
#[test_case(0.95, &[], 3, 2 ; "uncited answer meets minimums")]
#[tokio::test]
async fn test_production_early_stop(
    confidence: f64,
    sources: &'static [&'static str],
    searches: usize,
    retrievals: usize,
) {
    let provider = PolicyProvider::new(eager_policy(confidence, sources));
    let result = coordinator(provider, eiffel_pages())
        .run("Who designed the Eiffel Tower?", None, SearchMode::Production)
        .await;

    let answer = result
        .answer()
        .unwrap_or_else(|| panic!("{:?}", result.error()));
    assert!(!answer.answer.is_empty());
    assert_eq!(result.calls_of(SEARCH_TOOL), searches);
    assert_eq!(result.calls_of(GET_PAGE_TOOL), retrievals);
}

#[tokio::test]
async fn test_production_caps_refuse_extra_calls() {
    let provider = PolicyProvider::new(|request| {
        if common::searches(request) == 0 {
            let burst = (0..12)
                .map(|i| search_call(&format!("s{i}"), "Eiffel"))
                .collect();
            Step::Tools(burst)
        } else if common::retrievals(request) < 2 {
            Step::Tools(vec![
                common::page_call("p0", "Eiffel Tower"),
                common::page_call("p1", "Gustave Eiffel"),
            ])
        } else {
            Step::Answer(common::answer_json("Eiffel's company", 0.7, &["Eiffel Tower"]))
        }
    });
    let pages = Arc::new(eiffel_pages());
    let coordinator =
        AgentCoordinator::new(build(config()), provider, Arc::clone(&pages) as _);

    let result = coordinator
        .run("Who designed the Eiffel Tower?", None, SearchMode::Production)
        .await;

    assert!(result.is_success());
    // Every requested call is tracked; only those within the cap reach the pages.
    assert_eq!(result.calls_of(SEARCH_TOOL), 12);
    assert_eq!(pages.search_calls.load(Ordering::SeqCst), 8);
    assert_eq!(pages.page_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cost_guardrail_aborts_run_and_leaves_nothing_running() {
    let provider = PolicyProvider::with_usage(
        |request| {
            if common::searches(request) == 0 {
                Step::Tools(vec![search_call("s0", "Eiffel")])
            } else {
                Step::Hang
            }
        },
        TokenUsage::new(1_000_000, 0),
    );
    let config = build(config().max_cost(0.01));
    let coordinator = AgentCoordinator::new(
        config,
        Arc::clone(&provider) as _,
        Arc::new(eiffel_pages()),
    );

    let result = coordinator
        .run("Who designed the Eiffel Tower?", None, SearchMode::Evaluation)
        .await;

    let error = result
        .error()
        .unwrap_or_else(|| panic!("run should have tripped"));
    assert_eq!(error.category, ErrorCategory::GuardrailTrip);
    assert!(result.usage().is_none());
    assert_eq!(result.calls_of(SEARCH_TOOL), 1);
    assert!(
        result
            .guardrail_events()
            .iter()
            .any(|e| e.name == "cost" && e.triggered)
    );
    // The in-flight model request was dropped with the aborted agent task.
    assert!(provider.hung_request_dropped());
}

#[tokio::test]
async fn test_blocked_keyword_never_reaches_model() {
    let provider = PolicyProvider::new(diligent_policy(3, 2, "Eiffel Tower"));
    let config = build(config().blocked_keywords(["weapon", "Exploit"]));
    let coordinator = AgentCoordinator::new(
        config,
        Arc::clone(&provider) as _,
        Arc::new(eiffel_pages()),
    );

    let result = coordinator
        .run("How do I EXPLOIT this?", None, SearchMode::Evaluation)
        .await;

    assert_eq!(
        result.error().map(|e| e.category),
        Some(ErrorCategory::GuardrailTrip)
    );
    assert_eq!(provider.calls(), 0);
    assert!(result.tool_calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_keep_separate_traces() {
    let provider = PolicyProvider::new(diligent_policy(3, 2, "Canberra"));
    let coordinator = coordinator(provider, eiffel_pages());

    let (first, second) = tokio::join!(
        coordinator.run("capital of Australia", None, SearchMode::Evaluation),
        coordinator.run("designer of the Eiffel Tower", None, SearchMode::Evaluation),
    );

    for (result, question) in [
        (&first, "capital of Australia"),
        (&second, "designer of the Eiffel Tower"),
    ] {
        assert!(result.is_success());
        assert_eq!(result.tool_calls().len(), 5);
        let sequences: Vec<usize> = result.tool_calls().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, [1, 2, 3, 4, 5]);
        assert!(
            result
                .tool_calls()
                .iter()
                .filter(|c| c.tool_name == SEARCH_TOOL)
                .all(|c| c.args["query"] == question)
        );
    }
}

#[tokio::test]
async fn test_streaming_reports_calls_then_answer() {
    let provider = PolicyProvider::new(diligent_policy(3, 2, "Eiffel Tower"));
    let coordinator = coordinator(provider, eiffel_pages());

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let output = Arc::new(Mutex::new(String::new()));
    let observer: StreamObserver = {
        let seen = Arc::clone(&seen);
        let output = Arc::clone(&output);
        Arc::new(move |update: StreamUpdate<'_>| match update {
            StreamUpdate::ToolCall(call) => {
                if let Ok(mut seen) = seen.lock() {
                    seen.push(call.tool_name.clone());
                }
            }
            StreamUpdate::OutputDelta(delta) => {
                if let Ok(mut output) = output.lock() {
                    output.push_str(delta);
                }
            }
            StreamUpdate::OutputRestarted => {
                if let Ok(mut output) = output.lock() {
                    output.clear();
                }
            }
        })
    };

    let result = coordinator
        .run_streaming("Who designed the Eiffel Tower?", None, SearchMode::Evaluation, observer)
        .await;

    assert!(result.is_success());
    let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(
        seen,
        [SEARCH_TOOL, SEARCH_TOOL, SEARCH_TOOL, GET_PAGE_TOOL, GET_PAGE_TOOL]
    );
    let streamed = output.lock().map(|s| s.clone()).unwrap_or_default();
    let parsed = SearchAgentAnswer::parse(&streamed).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(Some(&parsed), result.answer());
    assert_eq!(result.usage().map(|u| u.total_tokens()), Some(6 * 120));
}

#[tokio::test]
async fn test_missing_page_is_classified_as_remote_api_failure() {
    let provider = PolicyProvider::new(diligent_policy(3, 2, "Atlantis"));
    let result = coordinator(provider, eiffel_pages())
        .run("Where is Atlantis?", None, SearchMode::Evaluation)
        .await;

    let error = result
        .error()
        .unwrap_or_else(|| panic!("missing page should fail the run"));
    assert_eq!(error.category, ErrorCategory::ModelApi);
    assert!(error.technical_details.contains("404"));
    assert_eq!(result.calls_of(GET_PAGE_TOOL), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_pages_time_out() {
    let provider = PolicyProvider::new(diligent_policy(3, 2, "Eiffel Tower"));
    let pages = eiffel_pages().with_delay(Duration::from_secs(60));
    let result = coordinator(provider, pages)
        .run("Who designed the Eiffel Tower?", None, SearchMode::Evaluation)
        .await;

    assert_eq!(
        result.error().map(|e| e.category),
        Some(ErrorCategory::Timeout)
    );
}

#[tokio::test]
async fn test_provider_network_failure_is_classified() {
    let provider = PolicyProvider::new(|_| {
        Step::Fail(RunError::Transport(TransportError::Network {
            message: "connection refused".to_string(),
        }))
    });
    let result = coordinator(provider, eiffel_pages())
        .run("Who designed the Eiffel Tower?", None, SearchMode::Research)
        .await;

    let error = result.error().unwrap_or_else(|| panic!("should fail"));
    assert_eq!(error.category, ErrorCategory::Network);
    assert!(!error.suggestion.is_empty());
}
