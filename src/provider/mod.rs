//! Model server client.
//!
//! The agent talks to a local model server through its OpenAI-compatible
//! chat-completions endpoint. [`ChatProvider`] is the seam the runtime
//! depends on; tests substitute scripted providers.

pub mod http;
pub mod openai_compatible;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::AgentError;
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ReasoningEffort, ToolCall};

pub use openai_compatible::OpenAiCompatibleProvider;

/// Capability a model must advertise to be usable by the agent.
pub const TOOLS_CAPABILITY: &str = "tools";

/// A streamed chat-completions request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub reasoning_effort: ReasoningEffort,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop" => Some(Self::Stop),
            "length" => Some(Self::Length),
            "tool_calls" => Some(Self::ToolCalls),
            "content_filter" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}

/// One increment of a streamed completion.
///
/// `tool_calls` only ever carries fully assembled calls; fragments are
/// merged by the provider before they surface here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDelta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatDelta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self {
            reasoning: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            finish_reason: Some(FinishReason::ToolCalls),
            ..Self::default()
        }
    }
}

pub type ChatStream = BoxStream<'static, Result<ChatDelta, AgentError>>;

/// A chat-completions capable model server.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streamed completion.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, AgentError>;

    /// Capabilities the server advertises for `model`, if it reports any.
    async fn model_capabilities(&self, _model: &str) -> Result<Option<Vec<String>>, AgentError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reasons() {
        assert_eq!(FinishReason::parse("tool_calls"), Some(FinishReason::ToolCalls));
        assert_eq!(FinishReason::parse("stop"), Some(FinishReason::Stop));
        assert_eq!(FinishReason::parse("whatever"), None);
    }
}
