//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use builtin::{builtin_tools, run_command, CommandResult};
pub use tool::{AgentTool, Tool, ToolSet};
pub use types::{AgentToolParameters, ToolDefinition};
