//! Chat messages exchanged with the model server and stored per session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::extract_text;

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in OpenAI chat-completions shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Function name and raw JSON arguments of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the arguments string, treating empty input as `{}`.
    pub fn parsed_arguments(&self) -> Value {
        let raw = self.function.arguments.trim();
        if raw.is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

impl ChatMessage {
    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    /// An assistant turn that may carry text and tool calls.
    pub fn assistant_turn(text: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: (!text.is_empty()).then_some(text),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_output(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Text content, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Normalize a stored session item into a chat message.
    ///
    /// Items written by other runtimes may carry list-of-parts content; it is
    /// flattened to text. Items without a recognized `role` yield `None`.
    pub fn from_stored(item: &Value) -> Option<Self> {
        let role: Role = serde_json::from_value(item.get("role")?.clone()).ok()?;
        let content = match item.get("content") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(extract_text(other)),
        };
        let tool_calls = item
            .get("tool_calls")
            .and_then(|calls| serde_json::from_value(calls.clone()).ok())
            .unwrap_or_default();
        let tool_call_id = item
            .get("tool_call_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        if role == Role::Tool && tool_call_id.is_none() {
            return None;
        }

        Some(Self {
            role,
            content,
            tool_calls,
            tool_call_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_in_chat_completions_shape() {
        let msg = ChatMessage::assistant_turn(
            String::new(),
            vec![ToolCall::new("call_1", "execute_command", r#"{"command":"ls"}"#)],
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "execute_command", "arguments": "{\"command\":\"ls\"}"}
                }]
            })
        );
    }

    #[test]
    fn stored_part_lists_are_flattened() {
        let item = json!({
            "role": "assistant",
            "content": [{"type": "output_text", "text": "hello"}, {"type": "output_text", "text": "there"}]
        });
        let msg = ChatMessage::from_stored(&item).unwrap();
        assert_eq!(msg.text(), "hello there");
    }

    #[test]
    fn items_without_role_are_skipped() {
        assert!(ChatMessage::from_stored(&json!({"type": "function_call", "name": "x"})).is_none());
        assert!(ChatMessage::from_stored(&json!({"role": "narrator", "content": "x"})).is_none());
        assert!(ChatMessage::from_stored(&json!({"role": "tool", "content": "orphan"})).is_none());
    }

    #[test]
    fn empty_arguments_parse_as_object() {
        let call = ToolCall::new("c", "f", "");
        assert_eq!(call.parsed_arguments(), json!({}));
    }
}
