//! The agent facade used by the CLI.
//!
//! [`OllamaAgent`] binds configuration, the model server, built-in and MCP
//! tools and the session store together, and turns runtime output into the
//! closed [`StreamEvent`] protocol.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{load_instructions, AppConfig};
use crate::error::{AgentError, Result};
use crate::events::classify;
use crate::mcp::McpServers;
use crate::memory::{ensure_backend, MemoryBackend, QdrantMemory};
use crate::provider::{ChatProvider, OpenAiCompatibleProvider, TOOLS_CAPABILITY};
use crate::runtime::{self, RunInput};
use crate::session::{SessionStore, SessionSummary};
use crate::tools::{builtin_tools, ToolSet};
use crate::types::{ReasoningEffort, SessionId, StreamEvent};

/// Display name reported in `agent_update` events.
pub const AGENT_NAME: &str = "Ollama Assistant";

pub type EventStream = BoxStream<'static, StreamEvent>;

/// Per-run model and effort overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub model: Option<String>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl RunOverrides {
    pub fn new(model: Option<String>, reasoning_effort: Option<ReasoningEffort>) -> Self {
        Self {
            model,
            reasoning_effort,
        }
    }
}

/// A model/effort pairing that passed the capability check.
#[derive(Clone)]
struct AgentProfile {
    model: String,
    reasoning_effort: ReasoningEffort,
    tools: ToolSet,
}

pub struct OllamaAgent {
    config: AppConfig,
    provider: Arc<dyn ChatProvider>,
    memory: Option<Arc<dyn MemoryBackend>>,
    instructions: String,
    sessions: SessionStore,
    profiles: HashMap<(String, ReasoningEffort), AgentProfile>,
    /// Started on the first run; `None` until then and after shutdown.
    mcp: Option<McpServers>,
}

impl OllamaAgent {
    /// Build an agent talking to the configured model server.
    ///
    /// When memory is enabled the backend is health-checked first and a
    /// failure aborts construction.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(AgentError::Configuration("no model configured".into()));
        }
        let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiCompatibleProvider::from_config(&config));
        let memory: Option<Arc<dyn MemoryBackend>> = if config.memory.enabled {
            ensure_backend(&config.memory).await?;
            Some(Arc::new(QdrantMemory::new(config.memory.clone())))
        } else {
            None
        };
        Ok(Self::with_provider(config, provider, memory))
    }

    pub fn with_provider(
        config: AppConfig,
        provider: Arc<dyn ChatProvider>,
        memory: Option<Arc<dyn MemoryBackend>>,
    ) -> Self {
        let instructions = load_instructions(&config.instructions_path);
        let sessions = SessionStore::new(config.database_path.clone());
        Self {
            config,
            provider,
            memory,
            instructions,
            sessions,
            profiles: HashMap::new(),
            mcp: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn reasoning_effort(&self) -> ReasoningEffort {
        self.config.reasoning_effort
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Resolve (and cache) the profile for a model/effort pair.
    async fn profile(&mut self, overrides: &RunOverrides) -> Result<AgentProfile> {
        let model = overrides
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.model.clone());
        let effort = overrides
            .reasoning_effort
            .unwrap_or(self.config.reasoning_effort);
        let key = (model.clone(), effort);

        if let Some(profile) = self.profiles.get(&key) {
            return Ok(profile.clone());
        }

        match self.provider.model_capabilities(&model).await {
            Ok(Some(capabilities)) if !capabilities.iter().any(|c| c == TOOLS_CAPABILITY) => {
                error!(model = %model, "model does not support tool calling");
                return Err(AgentError::capability(&model, "tool calling"));
            }
            Ok(_) => {}
            Err(err) => warn!(model = %model, error = %err, "capability lookup failed, assuming tool support"),
        }

        let mut tools = builtin_tools(self.config.tool_settings(), self.memory.clone());
        tools.merge(self.mcp_servers().await.tools());

        debug!(model = %model, effort = %effort, tools = tools.len(), "created agent profile");
        let profile = AgentProfile {
            model,
            reasoning_effort: effort,
            tools,
        };
        self.profiles.insert(key, profile.clone());
        Ok(profile)
    }

    async fn mcp_servers(&mut self) -> &McpServers {
        if self.mcp.is_none() {
            let servers = McpServers::initialize(&self.config.mcp_config_path).await;
            self.mcp = Some(servers);
        }
        self.mcp.get_or_insert_with(McpServers::default)
    }

    /// Stop any MCP servers and drop the profiles that referenced their tools.
    pub async fn shutdown(&mut self) {
        if let Some(mut servers) = self.mcp.take() {
            servers.shutdown().await;
        }
        self.profiles.clear();
    }

    /// Stream one response to `prompt` in the current session.
    ///
    /// Capability failures are returned before anything is sent; any later
    /// failure arrives as a single trailing `error` event.
    pub async fn run_streamed(&mut self, prompt: &str, overrides: &RunOverrides) -> Result<EventStream> {
        let profile = self.profile(overrides).await?;
        let input = RunInput {
            agent_name: AGENT_NAME.to_string(),
            provider: Arc::clone(&self.provider),
            tools: profile.tools,
            instructions: self.instructions.clone(),
            model: profile.model,
            reasoning_effort: profile.reasoning_effort,
            session: self.sessions.current_session().cloned(),
            prompt: prompt.to_string(),
            max_turns: self.config.max_turns,
        };

        let events = runtime::run_streamed(input).filter_map(|event| async move {
            match event {
                Ok(raw) => classify(&raw),
                Err(err) => {
                    error!(error = %err, "agent run failed");
                    Some(StreamEvent::error(err.to_string()))
                }
            }
        });
        Ok(Box::pin(events))
    }

    /// Run to completion and return the answer text, or `Error: ...`.
    pub async fn run(&mut self, prompt: &str, overrides: &RunOverrides) -> String {
        let mut events = match self.run_streamed(prompt, overrides).await {
            Ok(events) => events,
            Err(err) => return format!("Error: {err}"),
        };

        let mut answer = String::new();
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::TextDelta { content } => answer.push_str(&content),
                StreamEvent::Error { content } => return format!("Error: {content}"),
                _ => {}
            }
        }
        answer
    }

    pub fn reset_session(&mut self) -> SessionId {
        self.sessions.reset_session()
    }

    pub fn load_session(&mut self, session_id: &str) {
        self.sessions.load_session(session_id);
    }

    pub fn session_id(&self) -> Option<&str> {
        self.sessions.session_id()
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.list_sessions().await
    }

    pub async fn session_history(&self, session_id: Option<&str>) -> Vec<Value> {
        self.sessions.session_history(session_id).await
    }

    pub async fn delete_session(&mut self, session_id: &str) -> bool {
        self.sessions.delete_session(session_id).await
    }

    pub async fn resolve_session_id(&self, prefix: &str) -> Option<SessionId> {
        self.sessions.resolve_session_id(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatDelta, ChatRequest, ChatStream};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        capabilities: Option<Vec<String>>,
        lookups: AtomicUsize,
    }

    impl StaticProvider {
        fn new(capabilities: Option<Vec<&str>>) -> Arc<Self> {
            Arc::new(Self {
                capabilities: capabilities.map(|caps| caps.into_iter().map(String::from).collect()),
                lookups: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for StaticProvider {
        async fn stream_chat(&self, _request: &ChatRequest) -> Result<ChatStream> {
            let deltas = vec![Ok(ChatDelta::text("Hello")), Ok(ChatDelta::text(" there"))];
            Ok(Box::pin(futures::stream::iter(deltas)))
        }

        async fn model_capabilities(&self, _model: &str) -> Result<Option<Vec<String>>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.capabilities.clone())
        }
    }

    fn agent(provider: Arc<StaticProvider>) -> (tempfile::TempDir, OllamaAgent) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::defaults_in(dir.path());
        let agent = OllamaAgent::with_provider(config, provider, None);
        (dir, agent)
    }

    #[tokio::test]
    async fn run_collects_answer_text() {
        let (_dir, mut agent) = agent(StaticProvider::new(Some(vec!["completion", "tools"])));
        assert_eq!(agent.run("hi", &RunOverrides::default()).await, "Hello there");
    }

    #[tokio::test]
    async fn profiles_are_cached_per_model_and_effort() {
        let provider = StaticProvider::new(None);
        let (_dir, mut agent) = agent(Arc::clone(&provider));
        agent.run("a", &RunOverrides::default()).await;
        agent.run("b", &RunOverrides::default()).await;
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);

        agent
            .run("c", &RunOverrides::new(None, Some(ReasoningEffort::High)))
            .await;
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mcp_tools_join_the_builtin_set() {
        use crate::tools::builtin::EXECUTE_COMMAND;
        use crate::tools::{AgentTool, AgentToolParameters, Tool};

        let (_dir, mut agent) = agent(StaticProvider::new(None));
        let tool = |name: &str| -> Arc<dyn Tool> {
            Arc::new(AgentTool::new(
                name,
                "remote",
                AgentToolParameters::object().build(),
                |_| async move { Ok(Value::Null) },
            ))
        };
        agent.mcp = Some(McpServers::from_tools(vec![tool("search_docs"), tool(EXECUTE_COMMAND)]));

        let profile = agent.profile(&RunOverrides::default()).await.unwrap();
        assert_eq!(profile.tools.names(), vec![EXECUTE_COMMAND, "search_docs"]);
        assert_ne!(profile.tools.get(EXECUTE_COMMAND).unwrap().description(), "remote");

        agent.shutdown().await;
        assert!(agent.mcp.is_none());
        assert!(agent.profiles.is_empty());
    }

    #[tokio::test]
    async fn missing_mcp_config_leaves_builtin_tools_only() {
        let (_dir, mut agent) = agent(StaticProvider::new(None));
        let profile = agent.profile(&RunOverrides::default()).await.unwrap();
        assert_eq!(profile.tools.len(), 1);
        assert!(agent.mcp.as_ref().unwrap().is_empty());
        agent.shutdown().await;
    }

    #[tokio::test]
    async fn models_without_tools_are_rejected_before_running() {
        let (_dir, mut agent) = agent(StaticProvider::new(Some(vec!["completion"])));
        let err = agent
            .run_streamed("hi", &RunOverrides::new(Some("tiny".into()), None))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Capability { .. }));
        assert!(agent.run("hi", &RunOverrides::default()).await.starts_with("Error: "));
    }
}
