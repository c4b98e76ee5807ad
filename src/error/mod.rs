//! Error types for the agent front-end.

use thiserror::Error;

/// Coarse classification used by the CLI to pick user-facing guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Parse,
    Capability,
    Network,
    Api,
    Memory,
    Mcp,
    Stream,
    Unknown,
}

/// Primary error type for all agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model '{model}' does not support {capability}")]
    Capability { model: String, capability: String },

    #[error("Memory backend initialization failed: {0}")]
    MemoryInitialization(String),

    #[error("MCP server '{server}': {message}")]
    Mcp { server: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AgentError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a capability error for `model` lacking `capability`.
    pub fn capability(model: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::Capability {
            model: model.into(),
            capability: capability.into(),
        }
    }

    /// Create an error reported by (or about) the MCP server `server`.
    pub fn mcp(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mcp {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::TomlParse(_) | Self::TomlWrite(_) => {
                ErrorCategory::Configuration
            }
            Self::Io(_) | Self::Storage(_) | Self::Join(_) => ErrorCategory::Storage,
            Self::Serialization(_) | Self::Yaml(_) => ErrorCategory::Parse,
            Self::Capability { .. } => ErrorCategory::Capability,
            Self::Network(_) => ErrorCategory::Network,
            Self::Api { .. } => ErrorCategory::Api,
            Self::MemoryInitialization(_) => ErrorCategory::Memory,
            Self::Mcp { .. } => ErrorCategory::Mcp,
            Self::Stream(_) => ErrorCategory::Stream,
            Self::InvalidArgument(_) | Self::TaskNotFound(_) => ErrorCategory::Unknown,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
