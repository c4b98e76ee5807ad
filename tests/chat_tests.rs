//! Tests for the interactive chat commands.
#![cfg(feature = "cli")]

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{agent_with, MockProvider};
use ollama_agent::agent::OllamaAgent;
use ollama_agent::cli::chat::{ChatSession, Control};
use ollama_agent::provider::ChatProvider;
use ollama_agent::render::TerminalSurface;
use ollama_agent::tasks::{Task, TaskStore};
use ollama_agent::types::ReasoningEffort;

fn chat(provider: &Arc<MockProvider>) -> (TempDir, ChatSession<Vec<u8>>) {
    let (dir, agent) = agent_with(provider);
    chat_over(dir, agent)
}

fn chat_over(dir: TempDir, agent: OllamaAgent) -> (TempDir, ChatSession<Vec<u8>>) {
    let tasks = TaskStore::new(agent.config().tasks_dir.clone());
    let session = ChatSession::with_surface(agent, tasks, TerminalSurface::new(Vec::new(), false));
    (dir, session)
}

fn output(session: ChatSession<Vec<u8>>) -> String {
    String::from_utf8(session.into_surface().into_inner()).unwrap()
}

#[tokio::test]
async fn prompts_stream_the_answer() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text(&["Hello ", "from ", "the ", "model."]);
    let (_dir, mut session) = chat(&provider);

    assert_eq!(session.handle_line("hi there").await, Control::Continue);
    let text = output(session);
    assert!(text.contains("Agent:"));
    assert!(text.contains("Hello from the model."));
}

#[tokio::test]
async fn quit_and_blank_lines() {
    let provider = Arc::new(MockProvider::new());
    let (_dir, mut session) = chat(&provider);

    assert_eq!(session.handle_line("   ").await, Control::Continue);
    assert_eq!(session.handle_line("/quit").await, Control::Quit);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn new_session_leaves_history_behind() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text(&["first answer"]);
    provider.queue_text(&["second answer"]);
    let (_dir, mut session) = chat(&provider);

    let first_id = session.agent().session_id().unwrap().to_string();
    session.handle_line("first question").await;
    session.handle_line("/new").await;
    let second_id = session.agent().session_id().unwrap().to_string();
    assert_ne!(first_id, second_id);

    session.handle_line("second question").await;
    let requests = provider.requests();
    // System prompt plus the new question only.
    assert_eq!(requests[1].messages.len(), 2);

    let sessions = session.agent().list_sessions().await;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, second_id);
    assert_eq!(sessions[1].preview, "first question");
}

#[tokio::test]
async fn load_switches_and_replays_a_session() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text(&["The answer is **42**."]);
    let (_dir, mut session) = chat(&provider);

    let old_id = session.agent().session_id().unwrap().to_string();
    session.handle_line("what is the answer?").await;
    session.handle_line("/new").await;
    session.handle_line(&format!("/load {}", &old_id[..8])).await;

    assert_eq!(session.agent().session_id(), Some(old_id.as_str()));
    let count = session.agent().sessions().message_count(&old_id).await;
    assert!(count >= 2);
    let text = output(session);
    assert!(text.contains(&format!("Loaded session {old_id} ({count} messages)")));
    assert!(text.contains("User: "));
    assert_eq!(text.matches("what is the answer?").count(), 1);
    assert!(text.contains("42"));
}

#[tokio::test]
async fn unknown_sessions_are_reported() {
    let provider = Arc::new(MockProvider::new());
    let (_dir, mut session) = chat(&provider);

    session.handle_line("/load nothing-here").await;
    session.handle_line("/delete").await;
    let text = output(session);
    assert!(text.contains("Session not found: nothing-here"));
    assert!(text.contains("Usage: /delete <id-or-prefix>"));
}

#[tokio::test]
async fn deleting_the_current_session_starts_a_fresh_one() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text(&["ok"]);
    let (_dir, mut session) = chat(&provider);

    let id = session.agent().session_id().unwrap().to_string();
    session.handle_line("remember this").await;
    session.handle_line(&format!("/delete {id}")).await;

    let current = session.agent().session_id().unwrap().to_string();
    assert_ne!(current, id);
    assert!(session.agent().list_sessions().await.is_empty());
    let text = output(session);
    assert!(text.contains(&format!("Deleted session {id}")));
    assert!(text.contains(&format!("Started new session {current}")));
}

#[tokio::test]
async fn save_task_uses_the_last_prompt_and_active_settings() {
    let provider = Arc::new(MockProvider::new());
    let (dir, mut config) = common::temp_config();
    config.model = "qwen3:8b".into();
    config.reasoning_effort = ReasoningEffort::High;
    let agent = OllamaAgent::with_provider(config, Arc::clone(&provider) as Arc<dyn ChatProvider>, None);
    let (_dir, mut session) = chat_over(dir, agent);

    session.handle_line("/save-task Too early").await;
    session.handle_line("check disk usage").await;
    session.handle_line("/save-task Disk check").await;

    let tasks = TaskStore::new(session.agent().config().tasks_dir.clone());
    let saved = tasks.list();
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].1,
        Task::new("Disk check", "check disk usage", "qwen3:8b", ReasoningEffort::High)
    );

    let text = output(session);
    assert!(text.contains("Nothing to save yet"));
    assert!(text.contains("Task saved:"));
}

#[tokio::test]
async fn tasks_run_with_their_own_model_and_effort() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text(&["Disk is fine."]);
    let (_dir, mut session) = chat(&provider);

    let tasks = TaskStore::new(session.agent().config().tasks_dir.clone());
    let id = tasks
        .save(&Task::new("Disk", "df -h please", "llama3.1:8b", ReasoningEffort::Low))
        .unwrap();

    session.handle_line(&format!("/task {}", &id[..4])).await;
    let requests = provider.requests();
    let request = &requests[0];
    assert_eq!(request.model, "llama3.1:8b");
    assert_eq!(request.reasoning_effort, ReasoningEffort::Low);
    assert_eq!(request.messages.last().unwrap().text(), "df -h please");

    let text = output(session);
    assert!(text.contains(&format!("Executing task: Disk ({id})")));
    assert!(text.contains("Disk is fine."));
}

#[tokio::test]
async fn missing_tasks_are_reported_inline() {
    let provider = Arc::new(MockProvider::new());
    let (_dir, mut session) = chat(&provider);

    assert_eq!(session.handle_line("/task ffff").await, Control::Continue);
    session.handle_line("/tasks").await;
    let text = output(session);
    assert!(text.contains("Task not found: ffff"));
    assert!(text.contains("No tasks found."));
}

#[tokio::test]
async fn models_without_tool_support_fail_inline() {
    let provider = Arc::new(MockProvider::with_capabilities(Some(&["completion"])));
    let (_dir, mut session) = chat(&provider);

    assert_eq!(session.handle_line("hello").await, Control::Continue);
    assert_eq!(provider.request_count(), 0);
    let text = output(session);
    assert!(text.contains("does not support tool calling"));
}

#[tokio::test]
async fn stream_errors_are_shown_with_partial_text() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_failure(&["Half"], "model server went away");
    let (_dir, mut session) = chat(&provider);

    session.handle_line("go").await;
    let text = output(session);
    assert!(text.contains("Half"));
    assert!(text.contains("Error: Stream error: model server went away"));
}

#[tokio::test]
async fn help_and_unknown_commands() {
    let provider = Arc::new(MockProvider::new());
    let (_dir, mut session) = chat(&provider);

    session.handle_line("/help").await;
    session.handle_line("/teleport").await;
    let text = output(session);
    assert!(text.contains("/save-task <title>"));
    assert!(text.contains("Unknown command: /teleport"));
}
