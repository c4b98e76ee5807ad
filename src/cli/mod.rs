//! CLI argument definitions and command dispatch.

pub mod chat;
pub mod errors;
pub mod tasks;

use clap::{Parser, Subcommand};

use crate::agent::{OllamaAgent, RunOverrides};
use crate::config::AppConfig;
use crate::error::Result;
use crate::render::TerminalSurface;
use crate::tasks::TaskStore;
use crate::types::ReasoningEffort;

/// Ollama Agent: chat with a local model that can run shell commands
#[derive(Parser, Debug)]
#[command(name = "ollama-agent", version, about = "Ollama Agent - AI agent to interact with local models")]
pub struct Cli {
    /// Model to use (overrides the configured model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Non-interactive mode: answer this prompt and exit
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Reasoning effort (low, medium, high, disabled)
    #[arg(short, long, value_parser = parse_effort)]
    pub effort: Option<ReasoningEffort>,

    /// Built-in tool execution timeout in seconds
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub builtin_tool_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Task management commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List all saved tasks
    TaskList,
    /// Execute a saved task
    TaskRun {
        /// Task ID or prefix
        task_id: String,
    },
    /// Delete a saved task
    TaskDelete {
        /// Task ID or prefix
        task_id: String,
    },
    /// Save a new task
    TaskCreate {
        #[arg(long)]
        title: String,
        #[arg(long)]
        prompt: String,
        /// Defaults to the configured model
        #[arg(long)]
        model: Option<String>,
        /// Defaults to the configured effort
        #[arg(long, value_parser = parse_effort)]
        effort: Option<ReasoningEffort>,
    },
}

fn parse_effort(value: &str) -> std::result::Result<ReasoningEffort, String> {
    value.trim().to_ascii_lowercase().parse().map_err(|_| {
        format!(
            "invalid reasoning effort '{value}' (expected one of: {})",
            ReasoningEffort::variants().join(", ")
        )
    })
}

impl Cli {
    /// Fold flag overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(model) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            config.model = model.clone();
        }
        if let Some(effort) = self.effort {
            config.reasoning_effort = effort;
        }
        if let Some(timeout) = self.builtin_tool_timeout {
            config.builtin_tool_timeout = timeout;
        }
    }
}

/// Run the parsed command line against a loaded configuration.
pub async fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    cli.apply_to(&mut config);
    let store = TaskStore::new(config.tasks_dir.clone());

    match cli.command {
        Some(Commands::TaskList) => {
            tasks::list_tasks(&store, &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::TaskDelete { task_id }) => tasks::delete_task(&store, &task_id, &mut std::io::stdout()),
        Some(Commands::TaskCreate {
            title,
            prompt,
            model,
            effort,
        }) => {
            let model = model.unwrap_or_else(|| config.model.clone());
            let effort = effort.unwrap_or(config.reasoning_effort);
            tasks::create_task(&store, &title, &prompt, &model, effort, &mut std::io::stdout())
        }
        Some(Commands::TaskRun { task_id }) => {
            let (found_id, task) = tasks::find_task(&store, &task_id)?;
            let mut surface = TerminalSurface::stdout();
            tasks::print_task_header(&mut surface, &found_id, &task);
            let mut agent = OllamaAgent::connect(config).await?;
            let overrides = RunOverrides::new(Some(task.model.clone()), Some(task.reasoning_effort));
            let result = chat::run_once(&mut agent, &mut surface, &task.prompt, &overrides).await;
            agent.shutdown().await;
            result
        }
        None => {
            let mut agent = OllamaAgent::connect(config).await?;
            match cli.prompt {
                Some(prompt) => {
                    let mut surface = TerminalSurface::stdout();
                    let result = chat::run_once(&mut agent, &mut surface, &prompt, &RunOverrides::default()).await;
                    agent.shutdown().await;
                    result
                }
                None => chat::ChatSession::new(agent, store).run().await,
            }
        }
    }
}
