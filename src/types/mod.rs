//! Core types shared across the crate.

pub mod content;
pub mod effort;
pub mod message;
pub mod stream;

pub use content::{extract_text, truncate_chars, MessageContent};
pub use effort::ReasoningEffort;
pub use message::{ChatMessage, FunctionCall, Role, ToolCall};
pub use stream::StreamEvent;

/// Identifier of a persisted conversation (a UUID string).
pub type SessionId = String;
