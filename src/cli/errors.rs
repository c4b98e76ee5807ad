//! CLI-specific error formatting for user-facing messages.

use crate::config::{BASE_URL_ENV, CONFIG_FILE_NAME};
use crate::error::{AgentError, ErrorCategory};

/// Map an [`AgentError`] to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &AgentError) -> String {
    match err {
        AgentError::Capability { model, capability } => {
            format!("Model '{model}' does not support {capability}. Pick a tool-capable model with -m <model>")
        }
        AgentError::MemoryInitialization(msg) => {
            format!("Memory backend initialization failed: {msg}. Start the vector store or set enabled = false under [memory] in {CONFIG_FILE_NAME}")
        }
        AgentError::Network(inner) if inner.is_connect() => {
            format!("Could not reach the model server: {inner}. Is Ollama running? Check base_url in {CONFIG_FILE_NAME} or {BASE_URL_ENV}")
        }
        AgentError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check {CONFIG_FILE_NAME}")
        }
        other => match other.category() {
            ErrorCategory::Storage => {
                format!("{other}. Check that the ollama-agent home directory is writable")
            }
            ErrorCategory::Parse => format!("{other}. The file may have been edited by hand"),
            _ => format!("{other}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_suggests_model_flag() {
        let help = format_error_help(&AgentError::capability("tiny", "tool calling"));
        assert!(help.contains("tiny"));
        assert!(help.contains("-m <model>"));
    }

    #[test]
    fn memory_error_points_at_config() {
        let help = format_error_help(&AgentError::MemoryInitialization("refused".into()));
        assert!(help.contains("refused"));
        assert!(help.contains("[memory]"));
    }

    #[test]
    fn storage_errors_point_at_the_home_directory() {
        let err: AgentError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        let help = format_error_help(&err);
        assert!(help.starts_with("IO error"));
        assert!(help.ends_with("home directory is writable"));
    }

    #[test]
    fn other_errors_fall_through_to_display() {
        let help = format_error_help(&AgentError::TaskNotFound("abc".into()));
        assert_eq!(help, "Task not found: abc");
    }
}
