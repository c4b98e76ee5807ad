//! Raw events emitted by the agent runtime.
//!
//! These mirror the runtime's loosely shaped event objects as closed enums.
//! Every level has a catch-all variant so unknown categories deserialize
//! cleanly and are dropped by the classifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRunEvent {
    /// Low-level token event straight from the model response.
    RawResponseEvent { data: ResponseDelta },
    /// A completed structured item (tool call, tool output, reasoning).
    RunItemStreamEvent { item: RunItem },
    /// The active agent changed.
    AgentUpdatedStreamEvent {
        #[serde(default)]
        new_agent: Option<AgentRef>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseDelta {
    #[serde(rename = "response.reasoning_text.delta")]
    ReasoningText {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.output_text.delta")]
    OutputText {
        #[serde(default)]
        delta: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    ToolCallItem {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        arguments: Option<String>,
    },
    ToolCallOutputItem {
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        output: Value,
    },
    #[serde(rename = "reasoning")]
    Reasoning {
        #[serde(default)]
        summary: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    #[serde(default)]
    pub name: Option<String>,
}

impl RawRunEvent {
    pub fn reasoning_delta(delta: impl Into<String>) -> Self {
        Self::RawResponseEvent {
            data: ResponseDelta::ReasoningText {
                delta: delta.into(),
            },
        }
    }

    pub fn text_delta(delta: impl Into<String>) -> Self {
        Self::RawResponseEvent {
            data: ResponseDelta::OutputText {
                delta: delta.into(),
            },
        }
    }

    pub fn tool_call(call_id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::RunItemStreamEvent {
            item: RunItem::ToolCallItem {
                name: Some(name.into()),
                call_id: Some(call_id.into()),
                arguments: Some(arguments.into()),
            },
        }
    }

    pub fn tool_output(call_id: impl Into<String>, output: Value) -> Self {
        Self::RunItemStreamEvent {
            item: RunItem::ToolCallOutputItem {
                call_id: Some(call_id.into()),
                output,
            },
        }
    }

    pub fn agent_updated(name: impl Into<String>) -> Self {
        Self::AgentUpdatedStreamEvent {
            new_agent: Some(AgentRef {
                name: Some(name.into()),
            }),
        }
    }
}
