//! Map raw runtime events onto [`StreamEvent`].

use serde_json::Value;

use super::raw::{RawRunEvent, ResponseDelta, RunItem};
use crate::types::{extract_text, StreamEvent};

const UNKNOWN_NAME: &str = "unknown";

/// Classify one raw event. Empty deltas and unrecognized events yield `None`.
pub fn classify(event: &RawRunEvent) -> Option<StreamEvent> {
    match event {
        RawRunEvent::RawResponseEvent { data } => classify_delta(data),
        RawRunEvent::RunItemStreamEvent { item } => classify_item(item),
        RawRunEvent::AgentUpdatedStreamEvent { new_agent } => Some(StreamEvent::AgentUpdate {
            name: new_agent
                .as_ref()
                .and_then(|agent| agent.name.clone())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        }),
        RawRunEvent::Unknown => None,
    }
}

fn classify_delta(data: &ResponseDelta) -> Option<StreamEvent> {
    match data {
        ResponseDelta::ReasoningText { delta } if !delta.is_empty() => {
            Some(StreamEvent::reasoning(delta.clone()))
        }
        ResponseDelta::OutputText { delta } if !delta.is_empty() => {
            Some(StreamEvent::text(delta.clone()))
        }
        _ => None,
    }
}

fn classify_item(item: &RunItem) -> Option<StreamEvent> {
    match item {
        RunItem::ToolCallItem { name, .. } => Some(StreamEvent::ToolCall {
            name: name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        }),
        RunItem::ToolCallOutputItem { output, .. } => Some(StreamEvent::ToolOutput {
            output: output_to_string(output),
        }),
        RunItem::Reasoning { summary } => {
            let content = extract_text(summary);
            (!content.is_empty()).then_some(StreamEvent::ReasoningSummary { content })
        }
        RunItem::Other => None,
    }
}

fn output_to_string(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
