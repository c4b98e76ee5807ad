//! Tests for the agent tool loop against a scripted provider.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::MockProvider;
use ollama_agent::error::AgentError;
use ollama_agent::events::{RawRunEvent, ResponseDelta, RunItem};
use ollama_agent::provider::ChatProvider;
use ollama_agent::runtime::{run_streamed, RunInput};
use ollama_agent::session::SqliteSession;
use ollama_agent::tools::{AgentTool, AgentToolParameters, ToolArguments, ToolSet};
use ollama_agent::types::{ReasoningEffort, Role};

fn shout_tools() -> ToolSet {
    let tool = AgentTool::new(
        "shout",
        "Upper-case the given text",
        AgentToolParameters::object().string("text", "Text to shout", true).build(),
        |args: ToolArguments| async move {
            let text = args.get_str("text")?;
            Ok::<_, AgentError>(json!({ "success": true, "data": text.to_uppercase() }))
        },
    );
    ToolSet::new(vec![Arc::new(tool)])
}

fn input(provider: &Arc<MockProvider>, session: Option<SqliteSession>, prompt: &str) -> RunInput {
    RunInput {
        agent_name: "Ollama Assistant".into(),
        provider: Arc::clone(provider) as Arc<dyn ChatProvider>,
        tools: shout_tools(),
        instructions: "Be brief.".into(),
        model: "gpt-oss:20b".into(),
        reasoning_effort: ReasoningEffort::Medium,
        session,
        prompt: prompt.into(),
        max_turns: 4,
    }
}

async fn collect(input: RunInput) -> Vec<Result<RawRunEvent, AgentError>> {
    run_streamed(input).collect().await
}

fn text_of(events: &[Result<RawRunEvent, AgentError>]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            Ok(RawRunEvent::RawResponseEvent {
                data: ResponseDelta::OutputText { delta },
            }) => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn plain_answer_streams_after_agent_update() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_reasoning(&["hmm"], &["Hello", " world"]);

    let events = collect(input(&provider, None, "hi")).await;
    assert_eq!(events.len(), 4);
    assert!(matches!(
        events[0],
        Ok(RawRunEvent::AgentUpdatedStreamEvent { .. })
    ));
    assert_eq!(events[1].as_ref().unwrap(), &RawRunEvent::reasoning_delta("hmm"));
    assert_eq!(text_of(&events), "Hello world");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-oss:20b");
    assert_eq!(requests[0].reasoning_effort, ReasoningEffort::Medium);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[0].messages[0].text(), "Be brief.");
    assert_eq!(requests[0].messages[1].text(), "hi");
    assert_eq!(requests[0].tools.len(), 1);
}

#[tokio::test]
async fn tool_calls_are_executed_and_fed_back() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("call_1", "shout", json!({"text": "quiet"}));
    provider.queue_text(&["It says QUIET."]);

    let events = collect(input(&provider, None, "shout quiet")).await;
    let kinds: Vec<_> = events
        .iter()
        .map(|event| match event.as_ref().unwrap() {
            RawRunEvent::AgentUpdatedStreamEvent { .. } => "agent",
            RawRunEvent::RunItemStreamEvent {
                item: RunItem::ToolCallItem { .. },
            } => "call",
            RawRunEvent::RunItemStreamEvent {
                item: RunItem::ToolCallOutputItem { .. },
            } => "output",
            RawRunEvent::RawResponseEvent { .. } => "text",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["agent", "call", "output", "text"]);
    assert_eq!(
        events[2].as_ref().unwrap(),
        &RawRunEvent::tool_output("call_1", json!({"success": true, "data": "QUIET"}))
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let followup = &requests[1].messages;
    let assistant = &followup[followup.len() - 2];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.tool_calls[0].function.name, "shout");
    let tool = followup.last().unwrap();
    assert_eq!(tool.role, Role::Tool);
    assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool.text().contains("QUIET"));
}

#[tokio::test]
async fn unknown_tools_report_an_error_to_the_model() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("call_9", "teleport", json!({}));
    provider.queue_text(&["I cannot do that."]);

    let events = collect(input(&provider, None, "go")).await;
    assert!(events.iter().all(Result::is_ok));
    assert_eq!(
        events[2].as_ref().unwrap(),
        &RawRunEvent::tool_output("call_9", json!({"error": "Unknown tool: teleport"}))
    );
    assert_eq!(text_of(&events), "I cannot do that.");
}

#[tokio::test]
async fn turns_are_persisted_and_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let session = SqliteSession::new("s-1", dir.path().join("sessions.db"));
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("call_1", "shout", json!({"text": "a"}));
    provider.queue_text(&["First answer"]);
    provider.queue_text(&["Second answer"]);

    collect(input(&provider, Some(session.clone()), "first")).await;
    let stored = session.get_items(None).await.unwrap();
    let roles: Vec<_> = stored.iter().map(|item| item["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);

    collect(input(&provider, Some(session.clone()), "second")).await;
    let requests = provider.requests();
    let replayed = &requests[2].messages;
    let texts: Vec<_> = replayed
        .iter()
        .filter(|m| m.role == Role::User || (m.role == Role::Assistant && m.tool_calls.is_empty()))
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts, vec!["first", "First answer", "second"]);
    assert_eq!(session.get_items(None).await.unwrap().len(), 6);
}

#[tokio::test]
async fn runaway_tool_loops_stop_at_max_turns() {
    let provider = Arc::new(MockProvider::new());
    for i in 0..5 {
        provider.queue_tool_call(&format!("call_{i}"), "shout", json!({"text": "again"}));
    }

    let mut run = input(&provider, None, "loop");
    run.max_turns = 2;
    let events = collect(run).await;

    assert_eq!(provider.request_count(), 2);
    match events.last().unwrap() {
        Err(AgentError::Stream(message)) => assert_eq!(message, "Max turns (2) exceeded"),
        other => panic!("expected max turns error, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_errors_end_the_stream_after_partial_text() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_failure(&["Partial"], "connection reset");

    let events = collect(input(&provider, None, "hi")).await;
    assert_eq!(text_of(&events), "Partial");
    assert!(matches!(events.last().unwrap(), Err(AgentError::Stream(m)) if m == "connection reset"));
}
