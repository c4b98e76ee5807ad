//! Shared test helpers and scripted provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use ollama_agent::agent::OllamaAgent;
use ollama_agent::config::AppConfig;
use ollama_agent::error::{AgentError, Result};
use ollama_agent::provider::{ChatDelta, ChatProvider, ChatRequest, ChatStream};
use ollama_agent::types::ToolCall;

/// One scripted completion: the deltas it streams, in order.
type Script = Vec<Result<ChatDelta>>;

/// A provider that plays back queued completions and records every request.
pub struct MockProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
    capabilities: Option<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_capabilities(Some(&["completion", "tools"]))
    }

    pub fn with_capabilities(capabilities: Option<&[&str]>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            capabilities: capabilities.map(|caps| caps.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Queue a completion streaming `chunks` as text deltas.
    pub fn queue_text(&self, chunks: &[&str]) {
        self.queue(chunks.iter().map(|chunk| Ok(ChatDelta::text(*chunk))).collect());
    }

    /// Queue a completion that thinks first, then answers.
    pub fn queue_reasoning(&self, reasoning: &[&str], answer: &[&str]) {
        let deltas = reasoning
            .iter()
            .map(|token| Ok(ChatDelta::reasoning(*token)))
            .chain(answer.iter().map(|chunk| Ok(ChatDelta::text(*chunk))))
            .collect();
        self.queue(deltas);
    }

    /// Queue a completion requesting a single tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        let call = ToolCall::new(id, name, args.to_string());
        self.queue(vec![Ok(ChatDelta::tool_calls(vec![call]))]);
    }

    /// Queue a completion that streams `chunks` and then fails.
    pub fn queue_failure(&self, chunks: &[&str], message: &str) {
        let mut deltas: Script = chunks.iter().map(|chunk| Ok(ChatDelta::text(*chunk))).collect();
        deltas.push(Err(AgentError::Stream(message.to_string())));
        self.queue(deltas);
    }

    pub fn queue(&self, deltas: Script) {
        self.scripts.lock().unwrap().push_back(deltas);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream> {
        self.requests.lock().unwrap().push(request.clone());
        let deltas = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Ok(ChatDelta::text("Mock response"))]);
        Ok(Box::pin(futures::stream::iter(deltas)))
    }

    async fn model_capabilities(&self, _model: &str) -> Result<Option<Vec<String>>> {
        Ok(self.capabilities.clone())
    }
}

/// Config rooted in a fresh temp dir.
pub fn temp_config() -> (TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::defaults_in(dir.path());
    (dir, config)
}

/// Agent over `provider` with memory disabled.
pub fn agent_with(provider: &Arc<MockProvider>) -> (TempDir, OllamaAgent) {
    let (dir, config) = temp_config();
    let agent = OllamaAgent::with_provider(config, Arc::clone(provider) as Arc<dyn ChatProvider>, None);
    (dir, agent)
}
