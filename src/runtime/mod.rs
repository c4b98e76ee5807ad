//! Agent tool loop.
//!
//! Drives the model server through repeated completions, executing requested
//! tools between turns, and reports progress as [`RawRunEvent`]s. The stream
//! is lazy: dropping it cancels the run at the next await point.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::error::AgentError;
use crate::events::RawRunEvent;
use crate::provider::{ChatProvider, ChatRequest};
use crate::session::SqliteSession;
use crate::tools::{ToolArguments, ToolSet};
use crate::types::{ChatMessage, ReasoningEffort, ToolCall};

pub type RawEventStream = BoxStream<'static, Result<RawRunEvent, AgentError>>;

/// Everything one run needs.
#[derive(Clone)]
pub struct RunInput {
    pub agent_name: String,
    pub provider: Arc<dyn ChatProvider>,
    pub tools: ToolSet,
    pub instructions: String,
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    pub session: Option<SqliteSession>,
    pub prompt: String,
    pub max_turns: usize,
}

/// Start a run. Errors end the stream after being yielded once.
pub fn run_streamed(input: RunInput) -> RawEventStream {
    let stream = async_stream::stream! {
        let RunInput {
            agent_name,
            provider,
            tools,
            instructions,
            model,
            reasoning_effort,
            session,
            prompt,
            max_turns,
        } = input;

        yield Ok(RawRunEvent::agent_updated(agent_name.as_str()));

        let mut messages = vec![ChatMessage::system(instructions)];
        if let Some(session) = session.as_ref() {
            messages.extend(load_history(session).await);
        }
        let user = ChatMessage::user(prompt);
        persist(session.as_ref(), &user).await;
        messages.push(user);

        let definitions = tools.definitions();
        let max_turns = max_turns.max(1);

        for turn in 1..=max_turns {
            let request = ChatRequest {
                model: model.clone(),
                messages: messages.clone(),
                tools: definitions.clone(),
                reasoning_effort,
            };
            debug!(model = %model, turn, "starting completion");

            let mut deltas = match provider.stream_chat(&request).await {
                Ok(deltas) => deltas,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut text = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();
            while let Some(delta) = deltas.next().await {
                let delta = match delta {
                    Ok(delta) => delta,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                if let Some(reasoning) = delta.reasoning {
                    yield Ok(RawRunEvent::reasoning_delta(reasoning));
                }
                if let Some(content) = delta.content {
                    text.push_str(&content);
                    yield Ok(RawRunEvent::text_delta(content));
                }
                tool_calls.extend(delta.tool_calls);
            }

            let assistant = ChatMessage::assistant_turn(text, tool_calls.clone());
            persist(session.as_ref(), &assistant).await;
            messages.push(assistant);

            if tool_calls.is_empty() {
                debug!(model = %model, turn, "run complete");
                return;
            }

            for call in tool_calls {
                yield Ok(RawRunEvent::tool_call(
                    call.id.as_str(),
                    call.function.name.as_str(),
                    call.function.arguments.as_str(),
                ));
                let output = execute_tool(&tools, &call).await;
                let output_text = output_to_string(&output);
                yield Ok(RawRunEvent::tool_output(call.id.as_str(), output));

                let message = ChatMessage::tool_output(call.id, output_text);
                persist(session.as_ref(), &message).await;
                messages.push(message);
            }
        }

        yield Err(AgentError::Stream(format!("Max turns ({max_turns}) exceeded")));
    };

    Box::pin(stream)
}

/// Stored items as chat messages; unusable items are skipped.
async fn load_history(session: &SqliteSession) -> Vec<ChatMessage> {
    match session.get_items(None).await {
        Ok(items) => items.iter().filter_map(ChatMessage::from_stored).collect(),
        Err(err) => {
            error!(session_id = %session.session_id(), error = %err, "failed to load session history");
            Vec::new()
        }
    }
}

async fn persist(session: Option<&SqliteSession>, message: &ChatMessage) {
    let Some(session) = session else {
        return;
    };
    let item = match serde_json::to_value(message) {
        Ok(item) => item,
        Err(err) => {
            error!(error = %err, "failed to serialize session item");
            return;
        }
    };
    if let Err(err) = session.add_items(vec![item]).await {
        error!(session_id = %session.session_id(), error = %err, "failed to persist session item");
    }
}

/// Run one tool call. Failures become a structured `{"error": ...}` output
/// so the model can react to them.
async fn execute_tool(tools: &ToolSet, call: &ToolCall) -> Value {
    let name = call.function.name.as_str();
    let Some(tool) = tools.get(name) else {
        warn!(tool = name, "model requested unknown tool");
        return json!({ "error": format!("Unknown tool: {name}") });
    };

    let args = match ToolArguments::parse(&call.function.arguments) {
        Ok(args) => args,
        Err(err) => return json!({ "error": err.to_string() }),
    };

    debug!(tool = name, call_id = %call.id, "executing tool");
    match tool.execute(&args).await {
        Ok(output) => output,
        Err(err) => {
            warn!(tool = name, error = %err, "tool execution failed");
            json!({ "error": err.to_string() })
        }
    }
}

fn output_to_string(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{AgentTool, AgentToolParameters};

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall::new("call_1", name, args)
    }

    fn echo_tools() -> ToolSet {
        ToolSet::new(vec![Arc::new(AgentTool::new(
            "echo",
            "Echo",
            AgentToolParameters::object().string("text", "Text", true).build(),
            |args| async move { Ok(json!(args.get_str("text")?)) },
        ))])
    }

    #[tokio::test]
    async fn unknown_tools_yield_structured_errors() {
        let out = execute_tool(&echo_tools(), &call("nope", "{}")).await;
        assert_eq!(out, json!({"error": "Unknown tool: nope"}));
    }

    #[tokio::test]
    async fn tool_errors_are_reported_in_band() {
        let out = execute_tool(&echo_tools(), &call("echo", "{}")).await;
        assert!(out["error"].as_str().unwrap().contains("text"));

        let out = execute_tool(&echo_tools(), &call("echo", "{not json")).await;
        assert!(out.get("error").is_some());
    }

    #[tokio::test]
    async fn string_outputs_are_not_quoted() {
        let out = execute_tool(&echo_tools(), &call("echo", r#"{"text":"hi"}"#)).await;
        assert_eq!(output_to_string(&out), "hi");
        assert_eq!(output_to_string(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
