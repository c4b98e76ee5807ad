//! `mcp_servers.json` parsing.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::{AgentError, Result};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level shape of the servers file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct McpServersFile {
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, McpServerConfig>,
}

/// One server entry. Either `command` (stdio) or `httpUrl` (remote) is set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub http_url: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

/// How to reach a configured server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransportKind {
    Stdio { command: String, args: Vec<String> },
    StreamableHttp { url: String, headers: HashMap<String, String> },
    Sse { url: String },
}

impl McpServerConfig {
    /// Stdio wins when both `command` and `httpUrl` are present.
    pub fn transport(&self) -> Option<McpTransportKind> {
        if let Some(command) = self.command.as_ref().filter(|c| !c.trim().is_empty()) {
            return Some(McpTransportKind::Stdio {
                command: command.clone(),
                args: self.args.clone(),
            });
        }
        let url = self.http_url.clone().filter(|u| !u.trim().is_empty())?;
        match self.kind.as_deref() {
            Some("sse") => Some(McpTransportKind::Sse { url }),
            _ => Some(McpTransportKind::StreamableHttp {
                url,
                headers: self.headers.clone(),
            }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Read the servers file. `Ok(None)` when it does not exist.
pub fn read_servers_file(path: &Path) -> Result<Option<McpServersFile>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    if value.get("mcpServers").is_none() {
        return Err(AgentError::Configuration(format!(
            "{} has no mcpServers object",
            path.display()
        )));
    }
    Ok(Some(serde_json::from_value(value)?))
}

/// Server entries from `path`; problems are logged and yield no servers.
pub fn load_server_configs(path: &Path) -> Vec<(String, McpServerConfig)> {
    match read_servers_file(path) {
        Ok(Some(file)) => file.servers.into_iter().collect(),
        Ok(None) => {
            debug!(path = %path.display(), "no MCP servers file");
            Vec::new()
        }
        Err(err @ AgentError::Configuration(_)) => {
            warn!(error = %err, "invalid MCP config format");
            Vec::new()
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "error loading MCP config");
            Vec::new()
        }
    }
}
