//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`AgentConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionStreamOptions, ChatCompletionTool, ChatCompletionToolType, CompletionUsage,
    CreateChatCompletionRequest, CreateChatCompletionStreamResponse, FunctionCall,
    FunctionObject, ResponseFormat, ResponseFormatJsonSchema,
};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, OutputSchema, Role};
use crate::agent::provider::{EventStream, LlmProvider, StreamEvent};
use crate::agent::tool::{ToolCall, ToolDefinition};
use crate::core::TokenUsage;
use crate::error::{RunError, TransportError};

/// Chat completions over the `OpenAI` API or a compatible server.
///
/// Plain completions are bounded by the configured timeout end to end.
/// Streams are bounded per read instead, so a long answer that keeps
/// arriving is never cut off; only a stalled stream times out.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    streaming: Client<OpenAIConfig>,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Connects with the key, base URL and request timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, RunError> {
        let sdk_config = config.base_url.as_deref().map_or_else(
            || OpenAIConfig::new().with_api_key(&config.api_key),
            |base| OpenAIConfig::new().with_api_key(&config.api_key).with_api_base(base),
        );
        let whole = reqwest::Client::builder().timeout(config.timeout);
        let idle = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout);

        Ok(Self {
            client: Client::with_config(sdk_config.clone()).with_http_client(http_client(whole)?),
            streaming: Client::with_config(sdk_config).with_http_client(http_client(idle)?),
            timeout: config.timeout,
        })
    }

    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        let text = msg.content.clone();
        match msg.role {
            Role::System => ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(text),
                name: None,
            }
            .into(),
            Role::User => ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(text),
                name: None,
            }
            .into(),
            Role::Tool => ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(text),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }
            .into(),
            Role::Assistant => {
                let calls: Vec<_> = msg.tool_calls.iter().map(outgoing_call).collect();
                #[allow(deprecated)]
                let message = ChatCompletionRequestAssistantMessage {
                    content: (!text.is_empty())
                        .then_some(ChatCompletionRequestAssistantMessageContent::Text(text)),
                    tool_calls: (!calls.is_empty()).then_some(calls),
                    name: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                };
                message.into()
            }
        }
    }

    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let tools: Vec<ChatCompletionTool> = request.tools.iter().map(function_tool).collect();
        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            stream: request.stream.then_some(true),
            stream_options: request.stream.then_some(ChatCompletionStreamOptions {
                include_usage: true,
            }),
            response_format: request.output_schema.as_ref().map(strict_json_schema),
            tools: (!tools.is_empty()).then_some(tools),
            ..Default::default()
        }
    }

    /// Maps an SDK error, keeping timeouts and connection failures typed.
    fn map_error(&self, err: OpenAIError) -> RunError {
        match err {
            OpenAIError::Reqwest(e) if e.is_timeout() => TransportError::Timeout {
                operation: "chat completion".to_string(),
                after: self.timeout,
            }
            .into(),
            OpenAIError::Reqwest(e) if e.is_connect() => TransportError::Network {
                message: e.to_string(),
            }
            .into(),
            OpenAIError::Reqwest(e) => RunError::ApiRequest {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            OpenAIError::ApiError(api) => RunError::ApiRequest {
                status: None,
                message: api.message,
            },
            OpenAIError::StreamError(message) => RunError::Stream { message },
            other => RunError::ApiRequest {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

fn http_client(builder: reqwest::ClientBuilder) -> Result<reqwest::Client, RunError> {
    builder
        .build()
        .map_err(|e| RunError::Configuration(format!("failed to build HTTP client: {e}")))
}

fn outgoing_call(call: &ToolCall) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    }
}

fn incoming_call(call: &ChatCompletionMessageToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments: call.function.arguments.clone(),
    }
}

fn function_tool(tool: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            parameters: Some(tool.parameters.clone()),
            strict: None,
        },
    }
}

fn strict_json_schema(schema: &OutputSchema) -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            name: schema.name.clone(),
            description: Some(schema.description.clone()),
            schema: Some(schema.schema.clone()),
            strict: Some(true),
        },
    }
}

fn usage_from(usage: &CompletionUsage) -> TokenUsage {
    TokenUsage::new(
        u64::from(usage.prompt_tokens),
        u64::from(usage.completion_tokens),
    )
}

/// `FinishReason::ToolCalls` becomes `"toolcalls"`, and so on.
fn reason_label(reason: impl std::fmt::Debug) -> String {
    format!("{reason:?}").to_lowercase()
}

/// Splits one stream chunk into provider-agnostic events.
fn chunk_events(chunk: CreateChatCompletionStreamResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::ContentDelta(text));
        }
        events.extend(choice.delta.tool_calls.unwrap_or_default().into_iter().map(|fragment| {
            let (name, arguments) = fragment
                .function
                .map_or((None, None), |f| (f.name, f.arguments));
            StreamEvent::ToolCallDelta {
                index: fragment.index,
                id: fragment.id,
                name,
                arguments,
            }
        }));
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::Finished(reason_label(reason)));
        }
    }

    if let Some(usage) = chunk.usage.as_ref() {
        events.push(StreamEvent::Usage(usage_from(usage)));
    }

    events
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, RunError> {
        let sdk_request = Self::build_request(&ChatRequest {
            stream: false,
            ..request.clone()
        });
        let response = self
            .client
            .chat()
            .create(sdk_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let usage = response
            .usage
            .as_ref()
            .map_or_else(TokenUsage::zero, usage_from);
        let Some(choice) = response.choices.into_iter().next() else {
            return Ok(ChatResponse {
                content: String::new(),
                usage,
                tool_calls: Vec::new(),
                finish_reason: None,
            });
        };

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            tool_calls: choice
                .message
                .tool_calls
                .iter()
                .flatten()
                .map(incoming_call)
                .collect(),
            finish_reason: choice.finish_reason.map(reason_label),
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, RunError> {
        let sdk_request = Self::build_request(&ChatRequest {
            stream: true,
            ..request.clone()
        });
        let chunks = self
            .streaming
            .chat()
            .create_stream(sdk_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let timeout = self.timeout;
        let mapped = chunks.flat_map(move |result| {
            let items: Vec<Result<StreamEvent, RunError>> = match result {
                Ok(chunk) => chunk_events(chunk).into_iter().map(Ok).collect(),
                Err(OpenAIError::Reqwest(e)) if e.is_timeout() => {
                    vec![Err(TransportError::Timeout {
                        operation: "chat completion stream (no data received)".to_string(),
                        after: timeout,
                    }
                    .into())]
                }
                Err(e) => vec![Err(RunError::Stream {
                    message: e.to_string(),
                })],
            };
            stream::iter(items)
        });

        Ok(Box::pin(mapped))
    }
}
