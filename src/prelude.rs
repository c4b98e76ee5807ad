//! Convenience re-exports for common use.

pub use crate::agent::{OllamaAgent, RunOverrides};
pub use crate::config::{AppConfig, ToolSettings};
pub use crate::error::{AgentError, Result};
pub use crate::events::{classify, RawRunEvent};
pub use crate::mcp::{McpServerConfig, McpServers};
pub use crate::provider::{ChatProvider, OpenAiCompatibleProvider};
pub use crate::render::{render_stream, Reconciler, RenderSurface, TerminalSurface};
pub use crate::session::{SessionStore, SessionSummary, SqliteSession};
pub use crate::tasks::{Task, TaskStore};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolSet};
pub use crate::types::{extract_text, ChatMessage, ReasoningEffort, StreamEvent};
