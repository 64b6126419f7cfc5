//! Test doubles shared by the integration tests.

#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use wikiagent::agent::config::AgentConfigBuilder;
use wikiagent::agent::message::Role;
use wikiagent::agent::tool::{GET_PAGE_TOOL, SEARCH_TOOL};
use wikiagent::agent::{
    AgentConfig, ChatRequest, ChatResponse, EventStream, LlmProvider, StreamEvent, ToolCall,
};
use wikiagent::core::TokenUsage;
use wikiagent::error::{RunError, TransportError};
use wikiagent::wiki::{PageContent, PageSource, SearchHit};

/// What the scripted model does on one turn.
pub enum Step {
    /// Request these tool calls.
    Tools(Vec<ToolCall>),
    /// Return this text as the final output.
    Answer(String),
    /// Fail the request.
    Fail(RunError),
    /// Never respond.
    Hang,
}

type Policy = dyn Fn(&ChatRequest) -> Step + Send + Sync;

/// A model whose every turn is decided by a pure function of the request.
///
/// Being stateless, one instance serves concurrent runs.
pub struct PolicyProvider {
    policy: Box<Policy>,
    usage: TokenUsage,
    calls: AtomicUsize,
    hung_dropped: Arc<AtomicBool>,
}

impl PolicyProvider {
    pub fn new(policy: impl Fn(&ChatRequest) -> Step + Send + Sync + 'static) -> Arc<Self> {
        Self::with_usage(policy, TokenUsage::new(100, 20))
    }

    pub fn with_usage(
        policy: impl Fn(&ChatRequest) -> Step + Send + Sync + 'static,
        usage: TokenUsage,
    ) -> Arc<Self> {
        Arc::new(Self {
            policy: Box::new(policy),
            usage,
            calls: AtomicUsize::new(0),
            hung_dropped: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Number of chat requests served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a hanging request was dropped (its task cancelled).
    pub fn hung_request_dropped(&self) -> bool {
        self.hung_dropped.load(Ordering::SeqCst)
    }

    async fn step(&self, request: &ChatRequest) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (self.policy)(request) {
            Step::Hang => {
                let _guard = SetOnDrop(Arc::clone(&self.hung_dropped));
                std::future::pending::<()>().await;
                Step::Hang
            }
            step => step,
        }
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for PolicyProvider {
    fn name(&self) -> &'static str {
        "policy"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, RunError> {
        match self.step(request).await {
            Step::Tools(tool_calls) => Ok(ChatResponse {
                content: String::new(),
                usage: self.usage,
                tool_calls,
                finish_reason: Some("tool_calls".to_string()),
            }),
            Step::Answer(content) => Ok(ChatResponse {
                content,
                usage: self.usage,
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            }),
            Step::Fail(e) => Err(e),
            Step::Hang => unreachable!("hanging step never resolves"),
        }
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, RunError> {
        let mut events = Vec::new();
        let finish = match self.step(request).await {
            Step::Tools(tool_calls) => {
                for (index, call) in (0u32..).zip(tool_calls) {
                    events.push(StreamEvent::ToolCallDelta {
                        index,
                        id: Some(call.id),
                        name: Some(call.name),
                        arguments: None,
                    });
                    let (head, tail) = call.arguments.split_at(call.arguments.len() / 2);
                    for part in [head, tail] {
                        events.push(StreamEvent::ToolCallDelta {
                            index,
                            id: None,
                            name: None,
                            arguments: Some(part.to_string()),
                        });
                    }
                }
                "tool_calls"
            }
            Step::Answer(content) => {
                let chars: Vec<char> = content.chars().collect();
                for chunk in chars.chunks(8) {
                    events.push(StreamEvent::ContentDelta(chunk.iter().collect()));
                }
                "stop"
            }
            Step::Fail(e) => return Err(e),
            Step::Hang => unreachable!("hanging step never resolves"),
        };
        events.push(StreamEvent::Usage(self.usage));
        events.push(StreamEvent::Finished(finish.to_string()));
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

/// The first user message of the conversation.
pub fn question(request: &ChatRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .map_or("", |m| m.content.as_str())
}

fn requested(request: &ChatRequest, tool: &str) -> usize {
    request
        .messages
        .iter()
        .flat_map(|m| &m.tool_calls)
        .filter(|c| c.name == tool)
        .count()
}

/// Searches the model has requested so far.
pub fn searches(request: &ChatRequest) -> usize {
    requested(request, SEARCH_TOOL)
}

/// Page fetches the model has requested so far.
pub fn retrievals(request: &ChatRequest) -> usize {
    requested(request, GET_PAGE_TOOL)
}

/// Role of the most recent message.
pub fn last_role(request: &ChatRequest) -> Option<Role> {
    request.messages.last().map(|m| m.role)
}

pub fn search_call(id: &str, query: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: SEARCH_TOOL.to_string(),
        arguments: serde_json::json!({ "query": query }).to_string(),
    }
}

pub fn page_call(id: &str, title: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: GET_PAGE_TOOL.to_string(),
        arguments: serde_json::json!({ "title": title }).to_string(),
    }
}

pub fn answer_json(answer: &str, confidence: f64, sources: &[&str]) -> String {
    serde_json::json!({
        "answer": answer,
        "confidence": confidence,
        "sources_used": sources,
        "reasoning": null,
    })
    .to_string()
}

/// Meets the minimums one call at a time, then answers.
///
/// Searches for the question itself and fetches `source`.
pub fn diligent_policy(
    min_search: usize,
    min_retrieval: usize,
    source: &'static str,
) -> impl Fn(&ChatRequest) -> Step + Send + Sync + 'static {
    move |request| {
        let done_search = searches(request);
        let done_pages = retrievals(request);
        let turn = done_search + done_pages;
        if done_search < min_search {
            Step::Tools(vec![search_call(&format!("s{turn}"), question(request))])
        } else if done_pages < min_retrieval {
            Step::Tools(vec![page_call(&format!("p{turn}"), source)])
        } else {
            Step::Answer(answer_json(
                &format!("Answer to: {}", question(request)),
                0.8,
                &[source],
            ))
        }
    }
}

/// Answers straight away, and after every tool result. Only makes a tool
/// call when nudged, picking whichever minimum is still unmet.
pub fn eager_policy(
    confidence: f64,
    sources: &'static [&'static str],
) -> impl Fn(&ChatRequest) -> Step + Send + Sync + 'static {
    move |request| {
        let first_turn = request.messages.len() <= 2;
        if first_turn || last_role(request) == Some(Role::Tool) {
            return Step::Answer(answer_json("Gustave Eiffel's company", confidence, sources));
        }
        let turn = request.messages.len();
        if searches(request) < 3 {
            Step::Tools(vec![search_call(&format!("s{turn}"), "Eiffel Tower designer")])
        } else {
            Step::Tools(vec![page_call(&format!("p{turn}"), "Eiffel Tower")])
        }
    }
}

/// In-memory pages with call counters and an optional artificial delay.
#[derive(Default)]
pub struct MemoryPages {
    pages: HashMap<String, String>,
    delay: Option<Duration>,
    pub search_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl MemoryPages {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(t, c)| ((*t).to_string(), (*c).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PageSource for MemoryPages {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        let needle = query.to_lowercase();
        Ok(self
            .pages
            .iter()
            .filter(|(title, content)| {
                needle
                    .split_whitespace()
                    .any(|w| title.to_lowercase().contains(w) || content.to_lowercase().contains(w))
            })
            .map(|(title, content)| SearchHit {
                title: title.clone(),
                snippet: Some(content.chars().take(40).collect()),
                page_id: None,
                size: None,
                word_count: None,
            })
            .collect())
    }

    async fn get_page(&self, title: &str) -> Result<PageContent, TransportError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.pages.get(title).map_or_else(
            || {
                Err(TransportError::RemoteApi {
                    status: 404,
                    message: format!("page '{title}' not found"),
                })
            },
            |content| {
                Ok(PageContent {
                    title: title.to_string(),
                    content: content.clone(),
                    url: format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_")),
                })
            },
        )
    }
}

pub fn eiffel_pages() -> MemoryPages {
    MemoryPages::new(&[
        (
            "Eiffel Tower",
            "The Eiffel Tower was designed by the engineering company of Gustave Eiffel.",
        ),
        ("Gustave Eiffel", "Gustave Eiffel was a French civil engineer."),
        ("Canberra", "Canberra is the capital city of Australia."),
    ])
}

/// Config with a test key and fast polling.
pub fn config() -> AgentConfigBuilder {
    AgentConfig::builder()
        .api_key("test-key")
        .cost_check_interval(Duration::from_millis(50))
        .judge_backoff(Duration::from_millis(10))
}

pub fn build(builder: AgentConfigBuilder) -> AgentConfig {
    builder.build().unwrap_or_else(|e| panic!("{e}"))
}
