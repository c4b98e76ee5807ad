//! Model Context Protocol servers.
//!
//! Servers listed in `mcp_servers.json` are started once per agent, their
//! tools join the built-in set, and every server is stopped on exit.

pub mod client;
pub mod config;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::tools::Tool;

pub use client::{McpClient, McpTool, McpToolSchema};
pub use config::{load_server_configs, read_servers_file, McpServerConfig, McpServersFile, McpTransportKind};

/// The running servers and the tools they contributed.
#[derive(Default)]
pub struct McpServers {
    clients: Vec<Arc<McpClient>>,
    tools: Vec<Arc<dyn Tool>>,
}

impl McpServers {
    /// Start every server in `path`. Servers that fail are logged and skipped.
    pub async fn initialize(path: &Path) -> Self {
        let mut servers = Self::default();
        for (name, config) in load_server_configs(path) {
            let client = match McpClient::connect(&name, &config).await {
                Ok(client) => Arc::new(client),
                Err(err) => {
                    error!(server = %name, error = %err, "failed to connect to MCP server");
                    continue;
                }
            };
            match client.list_tools().await {
                Ok(schemas) => {
                    info!(server = %name, tools = schemas.len(), "initialized MCP server");
                    for schema in schemas {
                        servers
                            .tools
                            .push(Arc::new(McpTool::new(Arc::clone(&client), schema)));
                    }
                    servers.clients.push(client);
                }
                Err(err) => {
                    error!(server = %name, error = %err, "failed to list MCP server tools");
                    client.shutdown().await;
                }
            }
        }
        servers
    }

    #[cfg(test)]
    pub(crate) fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            clients: Vec::new(),
            tools,
        }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.clients.iter().map(|client| client.server()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.tools.is_empty()
    }

    /// Stop every server. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.tools.clear();
        for client in self.clients.drain(..) {
            client.shutdown().await;
        }
    }
}

impl std::fmt::Debug for McpServers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServers")
            .field("servers", &self.server_names())
            .field("tools", &self.tools.len())
            .finish()
    }
}
