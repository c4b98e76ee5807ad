//! OpenAI-compatible chat-completions provider for a local model server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http::{
    bearer_headers, join_url, parse_sse_data, server_root, shared_client, status_to_error, LineBuffer,
};
use super::{ChatDelta, ChatProvider, ChatRequest, ChatStream, FinishReason};
use crate::config::AppConfig;
use crate::error::AgentError;
use crate::types::ToolCall;

pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
        });

        if let Some(obj) = body.as_object_mut() {
            if !request.tools.is_empty() {
                obj.insert("tools".into(), json!(request.tools));
            }
            if let Some(effort) = request.reasoning_effort.as_request_value() {
                obj.insert("reasoning_effort".into(), effort.into());
            }
        }

        body
    }
}

/// Tool call assembled from streamed fragments sharing one `index`.
#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    fn push(&mut self, fragment: StreamToolCall) {
        let entry = self.calls.entry(fragment.index.unwrap_or(0)).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            entry.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                entry.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                entry.arguments.push_str(&arguments);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn drain(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .map(|(index, call)| {
                let id = if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                };
                ToolCall::new(id, call.name, call.arguments)
            })
            .collect()
    }
}

/// Turn one parsed SSE chunk into a delta, feeding tool-call fragments to
/// the accumulator. Returns `None` when the chunk carries nothing visible.
fn chunk_to_delta(chunk: StreamChunk, tools: &mut ToolCallAccumulator) -> Option<ChatDelta> {
    let choice = chunk.choices.into_iter().next()?;
    for fragment in choice.delta.tool_calls.unwrap_or_default() {
        tools.push(fragment);
    }

    let reasoning = choice
        .delta
        .reasoning
        .or(choice.delta.reasoning_content)
        .filter(|r| !r.is_empty());
    let content = choice.delta.content.filter(|c| !c.is_empty());
    let finish_reason = choice.finish_reason.as_deref().and_then(FinishReason::parse);
    let tool_calls = if finish_reason.is_some() && !tools.is_empty() {
        tools.drain()
    } else {
        Vec::new()
    };

    if content.is_none() && reasoning.is_none() && tool_calls.is_empty() && finish_reason.is_none() {
        return None;
    }
    Some(ChatDelta {
        content,
        reasoning,
        tool_calls,
        finish_reason,
    })
}

fn stream_error(error: &Value) -> AgentError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("model server reported an error")
        .to_string();
    AgentError::Stream(message)
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, AgentError> {
        let body = self.build_request_body(request);
        let url = join_url(&self.base_url, "chat/completions");

        debug!(model = %request.model, messages = request.messages.len(), "chat completion stream");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::new();
            let mut tools = ToolCallAccumulator::default();
            futures::pin_mut!(byte_stream);

            let mut finished = false;
            'outer: while !finished {
                let batch = match byte_stream.next().await {
                    Some(Ok(chunk)) => lines.push(&chunk),
                    Some(Err(e)) => {
                        yield Err(AgentError::Network(e));
                        break;
                    }
                    None => {
                        finished = true;
                        lines.finish().into_iter().collect()
                    }
                };

                for line in batch {
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    let Some(data) = parse_sse_data(&line) else {
                        continue;
                    };
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            if let Some(error) = chunk.error.as_ref() {
                                yield Err(stream_error(error));
                                break 'outer;
                            }
                            if let Some(delta) = chunk_to_delta(chunk, &mut tools) {
                                yield Ok(delta);
                            }
                        }
                        Err(err) => warn!(error = %err, "skipping unparseable stream chunk"),
                    }
                }
            }

            // Servers that end the stream without a finish_reason still owe
            // us the calls they started.
            if !tools.is_empty() {
                yield Ok(ChatDelta::tool_calls(tools.drain()));
            }
        };

        Ok(Box::pin(stream))
    }

    async fn model_capabilities(&self, model: &str) -> Result<Option<Vec<String>>, AgentError> {
        let url = join_url(&server_root(&self.base_url), "api/show");
        debug!(model, url = %url, "probing model capabilities");

        let resp = shared_client()
            .post(&url)
            .json(&json!({ "model": model }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let info: ShowResponse = resp.json().await?;
        Ok(info.capabilities)
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ShowResponse {
    #[serde(default)]
    capabilities: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
