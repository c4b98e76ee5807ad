//! `task-*` subcommands.

use std::io::Write;

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use crate::error::{AgentError, Result};
use crate::render::TerminalSurface;
use crate::tasks::{Task, TaskStore, TASK_ID_LEN};
use crate::types::ReasoningEffort;

/// Resolve an id or unique prefix, or fail with [`AgentError::TaskNotFound`].
pub fn find_task(store: &TaskStore, task_id: &str) -> Result<(String, Task)> {
    store
        .find_by_prefix(task_id)
        .ok_or_else(|| AgentError::TaskNotFound(task_id.to_string()))
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Print saved tasks as an aligned table.
pub fn list_tasks<W: Write>(store: &TaskStore, out: &mut W) {
    let tasks = store.list();
    if tasks.is_empty() {
        let _ = writeln!(out, "{}", "No tasks found.".yellow());
        return;
    }

    let title_width = tasks
        .iter()
        .map(|(_, task)| task.title.width())
        .chain(std::iter::once("Title".len()))
        .max()
        .unwrap_or_default();
    let model_width = tasks
        .iter()
        .map(|(_, task)| task.model.width())
        .chain(std::iter::once("Model".len()))
        .max()
        .unwrap_or_default();

    let header = format!(
        "{}  {}  {}  Effort",
        pad("ID", TASK_ID_LEN),
        pad("Title", title_width),
        pad("Model", model_width)
    );
    let _ = writeln!(out, "{}", "Saved Tasks".bold());
    let _ = writeln!(out, "{}", header.magenta().bold());
    for (id, task) in &tasks {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}",
            pad(id, TASK_ID_LEN).cyan(),
            pad(&task.title, title_width).green(),
            pad(&task.model, model_width).blue(),
            task.reasoning_effort.to_string().yellow()
        );
    }
    let _ = out.flush();
}

pub fn delete_task<W: Write>(store: &TaskStore, task_id: &str, out: &mut W) -> Result<()> {
    let (found_id, task) = find_task(store, task_id)?;
    if store.delete(&found_id) {
        let _ = writeln!(out, "{} {} ({found_id})", "Task deleted:".green(), task.title);
    } else {
        let _ = writeln!(out, "{}", format!("Error deleting task: {found_id}").red());
    }
    Ok(())
}

pub fn create_task<W: Write>(
    store: &TaskStore,
    title: &str,
    prompt: &str,
    model: &str,
    effort: ReasoningEffort,
    out: &mut W,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AgentError::InvalidArgument("task title must not be empty".into()));
    }
    if prompt.trim().is_empty() {
        return Err(AgentError::InvalidArgument("task prompt must not be empty".into()));
    }
    let task = Task::new(title.trim(), prompt, model, effort);
    let id = store.save(&task)?;
    let _ = writeln!(out, "{} {} ({id})", "Task saved:".green(), task.title);
    Ok(())
}

/// Banner printed before a task runs.
pub fn print_task_header<W: Write>(surface: &mut TerminalSurface<W>, task_id: &str, task: &Task) {
    surface.info(&format!("Executing task: {} ({task_id})", task.title));
    surface.plain(&format!("Prompt: {}", task.prompt));
    surface.plain(&format!(
        "Model: {} | Effort: {}",
        task.model, task.reasoning_effort
    ));
    surface.plain("");
}
