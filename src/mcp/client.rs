//! One connected MCP server and the tools it exposes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject, ResourceContents};
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError, ServiceExt};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::config::{McpServerConfig, McpTransportKind};
use crate::error::{AgentError, Result};
use crate::tools::{AgentToolParameters, Tool, ToolArguments};

pub type McpSession = RunningService<RoleClient, Box<dyn DynService<RoleClient>>>;

/// Tool metadata as advertised by a server.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolSchema {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Client for a single MCP server.
pub struct McpClient {
    server: String,
    timeout: Duration,
    session: Mutex<Option<McpSession>>,
}

impl McpClient {
    /// Spawn or dial the server and run the initialize handshake.
    pub async fn connect(server: &str, config: &McpServerConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let session = match config.transport() {
            Some(McpTransportKind::Stdio { command, args }) => {
                let mut cmd = Command::new(&command);
                cmd.args(&args);
                let transport = TokioChildProcess::new(cmd)
                    .map_err(|e| AgentError::mcp(server, format!("failed to spawn '{command}': {e}")))?;
                ClientInfo::default()
                    .into_dyn()
                    .serve(transport)
                    .await
                    .map_err(|e| map_initialize_error(server, e))?
            }
            Some(McpTransportKind::StreamableHttp { url, headers }) => {
                let mut transport_config = StreamableHttpClientTransportConfig::with_uri(url);
                if let Some(token) = bearer_token(server, &headers) {
                    transport_config = transport_config.auth_header(token);
                }
                let transport = StreamableHttpClientTransport::from_config(transport_config);
                let handshake = ClientInfo::default().into_dyn().serve(transport);
                tokio::time::timeout(timeout, handshake)
                    .await
                    .map_err(|_| {
                        AgentError::mcp(server, format!("initialize timed out after {}s", timeout.as_secs()))
                    })?
                    .map_err(|e| map_initialize_error(server, e))?
            }
            Some(McpTransportKind::Sse { url }) => {
                return Err(AgentError::mcp(
                    server,
                    format!("legacy SSE transport at {url} is not supported, use type \"streamable_http\""),
                ));
            }
            None => {
                return Err(AgentError::mcp(server, "entry needs either \"command\" or \"httpUrl\""));
            }
        };

        debug!(server, "MCP session established");
        Ok(Self {
            server: server.to_string(),
            timeout,
            session: Mutex::new(Some(session)),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// List every tool the server offers.
    pub async fn list_tools(&self) -> Result<Vec<McpToolSchema>> {
        let guard = self.session.lock().await;
        let session = self.open_session(&guard)?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error(&self.server, "list_tools", e))?
                    .tools
            }
            Err(e) => return Err(map_service_error(&self.server, "list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool_schema).collect())
    }

    /// Invoke `name` with `arguments` and return its output.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let arguments = coerce_tool_arguments(arguments)?;
        let guard = self.session.lock().await;
        let session = self.open_session(&guard)?;

        let request = session.call_tool(CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments,
            task: None,
        });
        let result = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                AgentError::mcp(
                    &self.server,
                    format!("call_tool '{name}' timed out after {}s", self.timeout.as_secs()),
                )
            })?
            .map_err(|e| map_service_error(&self.server, "call_tool", e))?;

        map_call_result(&self.server, name, result)
    }

    /// Stop the server. Later calls fail with a closed-session error.
    pub async fn shutdown(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        match session.cancel().await {
            Ok(reason) => debug!(server = %self.server, ?reason, "MCP server stopped"),
            Err(err) => debug!(server = %self.server, error = %err, "error stopping MCP server"),
        }
    }

    fn open_session<'a>(&self, guard: &'a Option<McpSession>) -> Result<&'a McpSession> {
        match guard {
            Some(session) if !session.is_closed() => Ok(session),
            _ => Err(AgentError::mcp(&self.server, "session is closed")),
        }
    }
}

/// A server tool offered to the model next to the built-in ones.
pub struct McpTool {
    client: Arc<McpClient>,
    name: String,
    description: String,
    parameters: AgentToolParameters,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, schema: McpToolSchema) -> Self {
        Self {
            client,
            name: schema.name,
            description: schema.description.unwrap_or_default(),
            parameters: AgentToolParameters::from_schema(schema.input_schema),
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value> {
        self.client.call_tool(&self.name, args.raw().clone()).await
    }
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("server", &self.client.server())
            .field("name", &self.name)
            .finish()
    }
}

/// Only `Authorization: Bearer` is forwarded to remote servers.
fn bearer_token(server: &str, headers: &HashMap<String, String>) -> Option<String> {
    let mut token = None;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("authorization") {
            let value = value.trim();
            let stripped = value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
                .unwrap_or(value);
            token = Some(stripped.trim().to_string()).filter(|t| !t.is_empty());
        } else {
            warn!(server, header = %name, "ignoring unsupported MCP header");
        }
    }
    token
}

fn map_mcp_tool_schema(tool: rmcp::model::Tool) -> McpToolSchema {
    McpToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: Value::Object((*tool.input_schema).clone()),
    }
}

fn coerce_tool_arguments(value: Value) -> Result<Option<JsonObject>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: Value = serde_json::from_str(trimmed)
                .map_err(|e| AgentError::InvalidArgument(format!("MCP tool arguments must be valid JSON: {e}")))?;
            coerce_tool_arguments(parsed)
        }
        other => Err(AgentError::InvalidArgument(format!(
            "MCP tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Structured content wins, then joined text, then the raw content list.
/// An `isError` result becomes an error so the runtime reports `{"error": ...}`.
fn map_call_result(server: &str, name: &str, result: CallToolResult) -> Result<Value> {
    let text_content = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or(text_content)
            .unwrap_or_else(|| "tool returned an error result".into());
        return Err(AgentError::mcp(server, format!("{name}: {message}")));
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    if let Some(text) = text_content {
        return Ok(Value::String(text));
    }
    Ok(Value::Array(
        result
            .content
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    ))
}

fn map_initialize_error(server: &str, error: ClientInitializeError) -> AgentError {
    let message = match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("initialize connection closed: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("initialize transport error ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => {
            format!("initialize JSON-RPC error {}: {}", error.code.0, error.message)
        }
        ClientInitializeError::Cancelled => "initialize cancelled".to_string(),
        other => format!("initialize error: {other}"),
    };
    AgentError::mcp(server, message)
}

fn map_service_error(server: &str, context: &str, error: ServiceError) -> AgentError {
    let message = match error {
        ServiceError::McpError(error) => format!("{context}: MCP error {}: {}", error.code.0, error.message),
        ServiceError::TransportSend(error) => format!("{context}: transport send failed: {error}"),
        ServiceError::TransportClosed => format!("{context}: transport closed"),
        ServiceError::UnexpectedResponse => format!("{context}: unexpected MCP response"),
        ServiceError::Cancelled { reason } => {
            let suffix = reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default();
            format!("{context}: request cancelled{suffix}")
        }
        ServiceError::Timeout { timeout } => {
            format!("{context}: timed out after {}ms", timeout.as_millis())
        }
        other => format!("{context}: MCP service error: {other}"),
    };
    AgentError::mcp(server, message)
}
