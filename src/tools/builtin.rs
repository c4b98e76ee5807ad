//! Built-in tools offered to every agent.
//!
//! `execute_command` is always present. The `mem0_*` tools are added only
//! when a [`MemoryBackend`] is supplied.

use std::process::Stdio;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ToolSettings;
use crate::memory::MemoryBackend;
use crate::tools::tool::{AgentTool, Tool, ToolSet};
use crate::tools::types::AgentToolParameters;

pub const EXECUTE_COMMAND: &str = "execute_command";
pub const MEMORY_ADD: &str = "mem0_add_memory";
pub const MEMORY_SEARCH: &str = "mem0_search_memory";

const COMMAND_OUTPUT_MAX_BYTES: usize = 32_768;

/// Outcome of a shell command, serialized as the tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    fn failure(stderr: String) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr,
            exit_code: -1,
        }
    }
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    format!("{}\n... (truncated)", &s[..cutoff])
}

/// Run `command` through `sh -c`, bounded by the configured timeout.
///
/// Never fails: timeouts and spawn errors are reported inside the result.
pub async fn run_command(command: &str, settings: &ToolSettings) -> CommandResult {
    let limit = settings.command_timeout;
    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(err) => return CommandResult::failure(format!("Error executing command: {err}")),
    };

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let exit_code = output.status.code().unwrap_or(-1);
            CommandResult {
                success: output.status.success(),
                stdout: truncate_utf8(&String::from_utf8_lossy(&output.stdout), COMMAND_OUTPUT_MAX_BYTES),
                stderr: truncate_utf8(&String::from_utf8_lossy(&output.stderr), COMMAND_OUTPUT_MAX_BYTES),
                exit_code,
            }
        }
        Ok(Err(err)) => CommandResult::failure(format!("Error executing command: {err}")),
        Err(_) => {
            warn!(command, timeout_secs = limit.as_secs(), "command timed out");
            CommandResult::failure(format!(
                "Error: The command exceeded the {} second time limit",
                limit.as_secs()
            ))
        }
    }
}

/// Create the `execute_command` tool.
pub fn execute_command_tool(settings: ToolSettings) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        EXECUTE_COMMAND,
        "Execute a shell command and return its stdout, stderr and exit code",
        AgentToolParameters::object()
            .string("command", "The shell command to execute", true)
            .build(),
        move |args| async move {
            let command = args.get_str("command")?;
            debug!(command = %command, "executing command");
            let result = run_command(command, &settings).await;
            Ok(serde_json::to_value(result)?)
        },
    ))
}

fn memory_success(data: Value) -> Value {
    json!({"success": true, "data": data})
}

fn memory_failure(err: impl std::fmt::Display) -> Value {
    json!({"success": false, "error": err.to_string()})
}

/// Create the `mem0_add_memory` tool.
pub fn memory_add_tool(backend: Arc<dyn MemoryBackend>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        MEMORY_ADD,
        "Store a fact about the user or the conversation in long-term memory",
        AgentToolParameters::object()
            .string("memory", "The information to remember", true)
            .build(),
        move |args| {
            let backend = Arc::clone(&backend);
            async move {
                let memory = match args.get_str("memory") {
                    Ok(memory) => memory.to_string(),
                    Err(err) => return Ok(memory_failure(err)),
                };
                Ok(match backend.add(&memory).await {
                    Ok(data) => memory_success(data),
                    Err(err) => {
                        warn!(error = %err, "memory add failed");
                        memory_failure(err)
                    }
                })
            }
        },
    ))
}

/// Create the `mem0_search_memory` tool.
pub fn memory_search_tool(backend: Arc<dyn MemoryBackend>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        MEMORY_SEARCH,
        "Search long-term memory for information relevant to a query",
        AgentToolParameters::object()
            .string("query", "What to look for", true)
            .integer("limit", "Maximum number of memories to return", false)
            .build(),
        move |args| {
            let backend = Arc::clone(&backend);
            async move {
                let query = match args.get_str("query") {
                    Ok(query) => query.to_string(),
                    Err(err) => return Ok(memory_failure(err)),
                };
                let limit = match args.get_u64_opt("limit") {
                    Ok(limit) => limit.map(|n| n as usize),
                    Err(err) => return Ok(memory_failure(err)),
                };
                Ok(match backend.search(&query, limit).await {
                    Ok(data) => memory_success(data),
                    Err(err) => {
                        warn!(error = %err, "memory search failed");
                        memory_failure(err)
                    }
                })
            }
        },
    ))
}

/// The tool set for one agent profile.
pub fn builtin_tools(settings: ToolSettings, memory: Option<Arc<dyn MemoryBackend>>) -> ToolSet {
    let mut tools = ToolSet::new(vec![execute_command_tool(settings)]);
    if let Some(backend) = memory {
        tools.push(memory_add_tool(Arc::clone(&backend)));
        tools.push(memory_search_tool(backend));
    }
    tools
}
