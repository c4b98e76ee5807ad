//! Tool trait, closure-based tool wrapper and the tool registry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::arguments::ToolArguments;
use super::types::{AgentToolParameters, ToolDefinition};
use crate::error::AgentError;

/// Core tool trait. Implement to expose a capability to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &AgentToolParameters;

    /// Execute the tool with parsed arguments.
    async fn execute(&self, args: &ToolArguments) -> Result<Value, AgentError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

type ToolHandler =
    dyn Fn(ToolArguments) -> Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send>> + Send + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value, AgentError> {
        (self.handler)(args.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered set of tools offered to the model.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Append `extra` tools, skipping any whose name is already taken.
    pub fn merge(&mut self, extra: &[Arc<dyn Tool>]) {
        for tool in extra {
            if self.get(tool.name()).is_some() {
                warn!(tool = tool.name(), "duplicate tool name, keeping the first");
                continue;
            }
            self.tools.push(Arc::clone(tool));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool() -> Arc<dyn Tool> {
        Arc::new(AgentTool::new(
            "echo",
            "Echo the input",
            AgentToolParameters::object()
                .string("text", "Text to echo", true)
                .build(),
            |args| async move { Ok(json!({"echo": args.get_str("text")?})) },
        ))
    }

    #[tokio::test]
    async fn closure_tool_executes() {
        let tool = echo_tool();
        let out = tool
            .execute(&ToolArguments::new(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(out, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn closure_tool_propagates_argument_errors() {
        let tool = echo_tool();
        let err = tool.execute(&ToolArguments::new(json!({}))).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }

    #[test]
    fn tool_set_lookup_and_definitions() {
        let set = ToolSet::new(vec![echo_tool()]);
        assert!(set.get("echo").is_some());
        assert!(set.get("missing").is_none());
        assert_eq!(set.definitions()[0].function.name, "echo");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn merge_keeps_the_first_tool_of_a_name() {
        let mut set = ToolSet::new(vec![echo_tool()]);
        let tool = |name: &str, description: &str| -> Arc<dyn Tool> {
            Arc::new(AgentTool::new(
                name,
                description,
                AgentToolParameters::object().build(),
                |_| async move { Ok(json!("HI")) },
            ))
        };
        set.merge(&[tool("echo", "Remote echo"), tool("shout", "Shout the input")]);
        assert_eq!(set.names(), vec!["echo", "shout"]);
        assert_eq!(set.get("echo").unwrap().description(), "Echo the input");
    }
}
