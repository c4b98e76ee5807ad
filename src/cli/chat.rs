//! One-shot and interactive chat.

use std::io::{Stdout, Write};

use crossterm::style::Stylize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::errors::format_error_help;
use super::tasks;
use crate::agent::{OllamaAgent, RunOverrides};
use crate::error::Result;
use crate::render::{render_stream, RenderSurface, TerminalSurface};
use crate::session::SessionSummary;
use crate::tasks::TaskStore;
use crate::types::{truncate_chars, ChatMessage, Role};

const SHORT_ID_LEN: usize = 8;

const HELP: &str = "\
Commands:
  /new                    start a new session
  /sessions               list saved sessions
  /load <id-or-prefix>    switch to a saved session and replay it
  /delete <id-or-prefix>  delete a saved session
  /history                replay the current session
  /tasks                  list saved tasks
  /task <id-or-prefix>    run a saved task
  /save-task <title>      save the last prompt as a task
  /help                   show this help
  /quit                   exit
Ctrl-C cancels the response in progress.";

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Prompt(String),
    Command(SlashCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    Sessions,
    Load(String),
    Delete(String),
    History,
    Tasks,
    Task(String),
    SaveTask(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Prompt(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim().to_string()),
        None => (command, String::new()),
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "new" => SlashCommand::New,
        "sessions" => SlashCommand::Sessions,
        "load" => SlashCommand::Load(arg),
        "delete" => SlashCommand::Delete(arg),
        "history" => SlashCommand::History,
        "tasks" => SlashCommand::Tasks,
        "task" => SlashCommand::Task(arg),
        "save-task" => SlashCommand::SaveTask(arg),
        "help" | "?" => SlashCommand::Help,
        "quit" | "exit" | "q" => SlashCommand::Quit,
        other => SlashCommand::Unknown(other.to_string()),
    };
    Input::Command(command)
}

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Stream one response onto `surface`.
///
/// Capability failures are returned so the caller can exit non-zero. Ctrl-C
/// cancels the response; the reconciler still closes any open block.
pub async fn run_once<W: Write>(
    agent: &mut OllamaAgent,
    surface: &mut TerminalSurface<W>,
    prompt: &str,
    overrides: &RunOverrides,
) -> Result<()> {
    let events = agent.run_streamed(prompt, overrides).await?;
    let render_every = agent.config().render_every;
    let cancelled = tokio::select! {
        _ = render_stream(&mut *surface, render_every, events) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if cancelled {
        surface.info("Response cancelled.");
    }
    Ok(())
}

/// Interactive line-based chat loop.
pub struct ChatSession<W: Write = Stdout> {
    agent: OllamaAgent,
    tasks: TaskStore,
    surface: TerminalSurface<W>,
    last_prompt: Option<String>,
}

impl ChatSession<Stdout> {
    pub fn new(agent: OllamaAgent, tasks: TaskStore) -> Self {
        Self::with_surface(agent, tasks, TerminalSurface::stdout())
    }
}

impl<W: Write> ChatSession<W> {
    pub fn with_surface(agent: OllamaAgent, tasks: TaskStore, surface: TerminalSurface<W>) -> Self {
        Self {
            agent,
            tasks,
            surface,
            last_prompt: None,
        }
    }

    pub fn agent(&self) -> &OllamaAgent {
        &self.agent
    }

    pub fn surface(&self) -> &TerminalSurface<W> {
        &self.surface
    }

    pub fn into_surface(self) -> TerminalSurface<W> {
        self.surface
    }

    /// Read stdin until `/quit`, end of input, or Ctrl-C at the prompt.
    pub async fn run(mut self) -> Result<()> {
        self.surface.info(&format!(
            "Ollama Agent ({}, effort {}). Type /help for commands.",
            self.agent.model(),
            self.agent.reasoning_effort()
        ));
        let result = self.read_loop().await;
        self.agent.shutdown().await;
        self.surface.plain("");
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.show_prompt();
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                return Ok(());
            };
            if self.handle_line(&line).await == Control::Quit {
                return Ok(());
            }
        }
    }

    fn show_prompt(&mut self) {
        let out = self.surface.writer();
        let _ = write!(out, "{} ", ">".bold().blue());
        let _ = out.flush();
    }

    pub async fn handle_line(&mut self, line: &str) -> Control {
        match parse_input(line) {
            Input::Empty => Control::Continue,
            Input::Prompt(prompt) => {
                self.respond(&prompt, &RunOverrides::default()).await;
                self.last_prompt = Some(prompt);
                Control::Continue
            }
            Input::Command(command) => self.handle_command(command).await,
        }
    }

    async fn respond(&mut self, prompt: &str, overrides: &RunOverrides) {
        if let Err(err) = run_once(&mut self.agent, &mut self.surface, prompt, overrides).await {
            self.surface.error(&format_error_help(&err));
        }
    }

    async fn handle_command(&mut self, command: SlashCommand) -> Control {
        debug!(?command, "chat command");
        match command {
            SlashCommand::New => {
                let id = self.agent.reset_session();
                self.surface.info(&format!("Started new session {id}"));
            }
            SlashCommand::Sessions => self.show_sessions().await,
            SlashCommand::Load(prefix) => self.load(&prefix).await,
            SlashCommand::Delete(prefix) => self.delete(&prefix).await,
            SlashCommand::History => {
                let items = self.agent.session_history(None).await;
                if items.is_empty() {
                    self.surface.info("No messages in this session yet.");
                } else {
                    self.replay(&items);
                }
            }
            SlashCommand::Tasks => tasks::list_tasks(&self.tasks, self.surface.writer()),
            SlashCommand::Task(prefix) => self.run_task(&prefix).await,
            SlashCommand::SaveTask(title) => self.save_task(&title),
            SlashCommand::Help => self.surface.plain(HELP),
            SlashCommand::Quit => return Control::Quit,
            SlashCommand::Unknown(name) => {
                self.surface.error(&format!("Unknown command: /{name}. Type /help for commands."));
            }
        }
        Control::Continue
    }

    async fn show_sessions(&mut self) {
        let sessions = self.agent.list_sessions().await;
        if sessions.is_empty() {
            self.surface.info("No saved sessions.");
            return;
        }
        let current = self.agent.session_id().map(str::to_string);
        self.surface.info("Sessions (most recent first):");
        for summary in &sessions {
            let line = session_line(summary, current.as_deref() == Some(summary.session_id.as_str()));
            self.surface.plain(&line);
        }
    }

    async fn load(&mut self, prefix: &str) {
        if prefix.is_empty() {
            self.surface.error("Usage: /load <id-or-prefix>");
            return;
        }
        let Some(id) = self.agent.resolve_session_id(prefix).await else {
            self.surface.error(&format!("Session not found: {prefix}"));
            return;
        };
        self.agent.load_session(&id);
        let count = self.agent.sessions().message_count(&id).await;
        self.surface.info(&format!("Loaded session {id} ({count} messages)"));
        let items = self.agent.session_history(Some(&id)).await;
        self.replay(&items);
    }

    async fn delete(&mut self, prefix: &str) {
        if prefix.is_empty() {
            self.surface.error("Usage: /delete <id-or-prefix>");
            return;
        }
        let Some(id) = self.agent.resolve_session_id(prefix).await else {
            self.surface.error(&format!("Session not found: {prefix}"));
            return;
        };
        let was_current = self.agent.session_id() == Some(id.as_str());
        if !self.agent.delete_session(&id).await {
            self.surface.error(&format!("Could not delete session {id}"));
            return;
        }
        self.surface.info(&format!("Deleted session {id}"));
        if was_current {
            if let Some(new_id) = self.agent.session_id() {
                let message = format!("Started new session {new_id}");
                self.surface.info(&message);
            }
        }
    }

    async fn run_task(&mut self, prefix: &str) {
        if prefix.is_empty() {
            self.surface.error("Usage: /task <id-or-prefix>");
            return;
        }
        match tasks::find_task(&self.tasks, prefix) {
            Ok((id, task)) => {
                tasks::print_task_header(&mut self.surface, &id, &task);
                let overrides = RunOverrides::new(Some(task.model.clone()), Some(task.reasoning_effort));
                self.respond(&task.prompt, &overrides).await;
            }
            Err(err) => self.surface.error(&err.to_string()),
        }
    }

    fn save_task(&mut self, title: &str) {
        if title.is_empty() {
            self.surface.error("Usage: /save-task <title>");
            return;
        }
        let Some(prompt) = self.last_prompt.clone() else {
            self.surface.error("Nothing to save yet: send a prompt first.");
            return;
        };
        let model = self.agent.model().to_string();
        let effort = self.agent.reasoning_effort();
        if let Err(err) = tasks::create_task(&self.tasks, title, &prompt, &model, effort, self.surface.writer()) {
            self.surface.error(&err.to_string());
        }
    }

    /// Show stored messages: user prompts as `User:` lines, answers as markdown.
    fn replay(&mut self, items: &[Value]) {
        for message in items.iter().filter_map(ChatMessage::from_stored) {
            match message.role {
                Role::User => self.surface.user_message(message.text()),
                Role::Assistant if !message.text().trim().is_empty() => {
                    self.surface.agent_banner();
                    self.surface.markdown(message.text());
                    self.surface.blank_line();
                }
                _ => {}
            }
        }
    }
}

fn session_line(summary: &SessionSummary, current: bool) -> String {
    let marker = if current { "*" } else { " " };
    format!(
        "{marker} {}  {:>3} msgs  {}  {}",
        truncate_chars(&summary.session_id, SHORT_ID_LEN),
        summary.message_count,
        summary.last_message_time,
        summary.preview
    )
}
