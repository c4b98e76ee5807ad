//! Stored message content and text extraction.
//!
//! Persisted message payloads come in several shapes: a plain string, a list
//! of part objects (`{"type": "output_text", "text": "..."}`), or an object
//! wrapping another payload under `content`. [`MessageContent`] models those
//! shapes as a small recursive sum type and [`extract_text`] flattens any of
//! them into a single string.

use serde_json::Value;

/// Recursive shape of a stored message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// A bare string, or an object carrying a string `text` field.
    Text(String),
    /// An ordered list of nested payloads.
    Parts(Vec<MessageContent>),
    /// An object whose `content` field holds another payload.
    Wrapped(Box<MessageContent>),
    /// Anything without a text-bearing field (numbers, null, other objects).
    Empty,
}

impl From<&Value> for MessageContent {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => Self::Parts(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    Self::Text(text.clone())
                } else if let Some(inner) = map.get("content") {
                    Self::Wrapped(Box::new(Self::from(inner)))
                } else {
                    Self::Empty
                }
            }
            _ => Self::Empty,
        }
    }
}

impl MessageContent {
    /// Flatten this payload into display text.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(Self::text)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            Self::Wrapped(inner) => inner.text(),
            Self::Empty => String::new(),
        }
    }
}

/// Extract display text from an arbitrarily shaped JSON payload.
///
/// Total over every JSON value: never panics, returns an empty string when no
/// text-bearing field exists.
pub fn extract_text(content: &Value) -> String {
    MessageContent::from(content).text()
}

/// Truncate `value` to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
