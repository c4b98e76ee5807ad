//! Classified stream events consumed by renderers.

use serde::{Deserialize, Serialize};

/// One unit of a streamed agent response.
///
/// Serializes with a `type` tag (`text_delta`, `tool_call`, ...) so the JSON
/// form is the wire shape renderers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta { content: String },
    ReasoningDelta { content: String },
    ToolCall { name: String },
    ToolOutput { output: String },
    AgentUpdate { name: String },
    Error { content: String },
    ReasoningSummary { content: String },
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }

    /// The wire `type` tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ReasoningDelta { .. } => "reasoning_delta",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolOutput { .. } => "tool_output",
            Self::AgentUpdate { .. } => "agent_update",
            Self::Error { .. } => "error",
            Self::ReasoningSummary { .. } => "reasoning_summary",
        }
    }
}
