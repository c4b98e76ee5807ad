//! Configuration system (layered: CLI flags > env > config file > defaults).
//!
//! The config file lives at `~/.ollama-agent/config.toml` and is created with
//! default values the first time it is read. Individual values that fail to
//! parse fall back to their defaults with a warning; only a syntactically
//! broken file is rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use toml::{Table, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::ReasoningEffort;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const MCP_CONFIG_FILE_NAME: &str = "mcp_servers.json";
pub const HOME_ENV: &str = "OLLAMA_AGENT_HOME";
pub const MODEL_ENV: &str = "OLLAMA_AGENT_MODEL";
pub const BASE_URL_ENV: &str = "OLLAMA_BASE_URL";
pub const API_KEY_ENV: &str = "OLLAMA_API_KEY";

pub const DEFAULT_MODEL: &str = "gpt-oss:20b";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1/";
pub const DEFAULT_API_KEY: &str = "ollama";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_RENDER_EVERY: usize = 5;

/// System prompt written to `instructions.md` when none exists.
pub const DEFAULT_INSTRUCTIONS: &str = r#"As an expert assistant your primary goal is to solve user tasks, using the available tools if needed.

When using tools you must strictly follow the Thought, Action (function call), and Observation (tool result) sequence until you have a Final Answer.

Thought:
[your reasoning here]

Action:
[function call here]

Observation:
[tool result here]
... (repeat Thought, Action, Observation)

Thought:
[your reasoning here]

Final Answer:
[your final answer here]

Memory management (only when memory tools are available):
- When the user explicitly asks you to remember something or you encounter information that could be useful later, call `mem0_add_memory(memory)` with a concise summary before finalizing your reply.
- Before answering questions that might rely on prior context, call `mem0_search_memory(query, limit)` to retrieve relevant memories.
"#;

/// Settings for the optional long-term memory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySettings {
    pub enabled: bool,
    pub collection_name: String,
    pub host: String,
    pub port: u16,
    pub embedding_model_dims: usize,
    pub embedder_model: String,
    pub embedder_base_url: String,
    pub user_id: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            collection_name: "ollama-agent".to_string(),
            host: "localhost".to_string(),
            port: 63333,
            embedding_model_dims: 768,
            embedder_model: "nomic-embed-text:latest".to_string(),
            embedder_base_url: "http://localhost:11434".to_string(),
            user_id: "default".to_string(),
        }
    }
}

impl MemorySettings {
    /// Base URL of the vector store.
    pub fn store_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn from_table(table: &Table) -> Self {
        let defaults = Self::default();
        Self {
            enabled: read_bool(table, "memory.enabled", "enabled", defaults.enabled),
            collection_name: read_string(
                table,
                "memory.collection_name",
                "collection_name",
                defaults.collection_name,
            ),
            host: read_string(table, "memory.host", "host", defaults.host),
            port: read_int(table, "memory.port", "port", defaults.port),
            embedding_model_dims: read_int(
                table,
                "memory.embedding_model_dims",
                "embedding_model_dims",
                defaults.embedding_model_dims,
            ),
            embedder_model: read_string(
                table,
                "memory.embedder_model",
                "embedder_model",
                defaults.embedder_model,
            ),
            embedder_base_url: read_string(
                table,
                "memory.embedder_base_url",
                "embedder_base_url",
                defaults.embedder_base_url,
            ),
            user_id: read_string(table, "memory.user_id", "user_id", defaults.user_id),
        }
    }
}

/// Settings handed to built-in tools at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSettings {
    pub command_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }
}

impl ToolSettings {
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            command_timeout: Duration::from_secs(secs),
        }
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub reasoning_effort: ReasoningEffort,
    pub database_path: PathBuf,
    pub builtin_tool_timeout: u64,
    pub tasks_dir: PathBuf,
    pub instructions_path: PathBuf,
    /// JSON file listing MCP servers; a missing file means none.
    pub mcp_config_path: PathBuf,
    pub max_turns: usize,
    pub render_every: usize,
    pub memory: MemorySettings,
}

impl AppConfig {
    /// Defaults with every path rooted at `dir`.
    pub fn defaults_in(dir: &Path) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            reasoning_effort: ReasoningEffort::default(),
            database_path: dir.join("sessions.db"),
            builtin_tool_timeout: DEFAULT_TOOL_TIMEOUT_SECS,
            tasks_dir: dir.join("tasks"),
            instructions_path: dir.join("instructions.md"),
            mcp_config_path: dir.join(MCP_CONFIG_FILE_NAME),
            max_turns: DEFAULT_MAX_TURNS,
            render_every: DEFAULT_RENDER_EVERY,
            memory: MemorySettings::default(),
        }
    }

    /// Load from the default config dir, then apply `.env` and environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::load_from(&config_dir())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load `config.toml` from `dir`, creating it with defaults when missing.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let defaults = Self::defaults_in(dir);
        let path = dir.join(CONFIG_FILE_NAME);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir_all(dir)?;
                fs::write(&path, defaults.to_toml()?)?;
                info!(path = %path.display(), "created default config");
                return Ok(defaults);
            }
            Err(err) => return Err(err.into()),
        };

        let table: Table = toml::from_str(&raw)?;
        Ok(Self::from_table(&table, defaults))
    }

    fn from_table(table: &Table, defaults: Self) -> Self {
        let memory = match table.get("memory") {
            Some(Value::Table(memory)) => MemorySettings::from_table(memory),
            Some(_) => {
                warn!("invalid [memory] section, using defaults");
                MemorySettings::default()
            }
            None => MemorySettings::default(),
        };

        let reasoning_effort = match table.get("reasoning_effort") {
            Some(Value::String(raw)) => ReasoningEffort::normalize(raw),
            Some(other) => {
                warn!(value = %other, "invalid reasoning_effort, using default");
                defaults.reasoning_effort
            }
            None => defaults.reasoning_effort,
        };

        Self {
            model: read_string(table, "model", "model", defaults.model),
            base_url: read_string(table, "base_url", "base_url", defaults.base_url),
            api_key: read_string(table, "api_key", "api_key", defaults.api_key),
            reasoning_effort,
            database_path: read_path(table, "database_path", defaults.database_path),
            builtin_tool_timeout: positive(read_int(
                table,
                "builtin_tool_timeout",
                "builtin_tool_timeout",
                defaults.builtin_tool_timeout,
            ))
            .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            tasks_dir: read_path(table, "tasks_dir", defaults.tasks_dir),
            instructions_path: read_path(table, "instructions_path", defaults.instructions_path),
            mcp_config_path: read_path(table, "mcp_config_path", defaults.mcp_config_path),
            max_turns: positive(read_int(table, "max_turns", "max_turns", defaults.max_turns))
                .unwrap_or(DEFAULT_MAX_TURNS),
            render_every: positive(read_int(
                table,
                "render_every",
                "render_every",
                defaults.render_every,
            ))
            .unwrap_or(DEFAULT_RENDER_EVERY),
            memory,
        }
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(model) = non_empty(MODEL_ENV) {
            self.model = model;
        }
        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(api_key) = non_empty(API_KEY_ENV) {
            self.api_key = api_key;
        }
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings::with_timeout_secs(self.builtin_tool_timeout)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Config directory: `$OLLAMA_AGENT_HOME`, else `~/.ollama-agent`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".ollama-agent"))
        .unwrap_or_else(|| PathBuf::from(".ollama-agent"))
}

/// Read the system prompt, creating the file with the default when missing.
pub fn load_instructions(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                DEFAULT_INSTRUCTIONS.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let created = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::write(path, DEFAULT_INSTRUCTIONS));
            match created {
                Ok(()) => info!(path = %path.display(), "created instructions file"),
                Err(err) => warn!(path = %path.display(), error = %err, "could not create instructions file"),
            }
            DEFAULT_INSTRUCTIONS.to_string()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "error reading instructions");
            DEFAULT_INSTRUCTIONS.to_string()
        }
    }
}

fn read_string(table: &Table, label: &str, key: &str, default: String) -> String {
    match table.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(other) => {
            warn!(key = label, value = %other, "invalid value, using default");
            default
        }
        None => default,
    }
}

fn read_path(table: &Table, key: &str, default: PathBuf) -> PathBuf {
    match table.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => PathBuf::from(value),
        Some(other) => {
            warn!(key, value = %other, "invalid path, using default");
            default
        }
        None => default,
    }
}

fn read_bool(table: &Table, label: &str, key: &str, default: bool) -> bool {
    match table.get(key) {
        Some(Value::Boolean(value)) => *value,
        Some(Value::String(value)) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!(key = label, value = %value, "invalid boolean, using default");
                default
            }
        },
        Some(other) => {
            warn!(key = label, value = %other, "invalid boolean, using default");
            default
        }
        None => default,
    }
}

/// Integers may be written as TOML integers or numeric strings.
fn read_int<T>(table: &Table, label: &str, key: &str, default: T) -> T
where
    T: TryFrom<i64> + std::str::FromStr + std::fmt::Display + Copy,
{
    let parsed = match table.get(key) {
        None => return default,
        Some(Value::Integer(value)) => T::try_from(*value).ok(),
        Some(Value::String(value)) => value.trim().parse::<T>().ok(),
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| {
        warn!(key = label, fallback = %default, "invalid number, using default");
        default
    })
}

fn positive<T: Default + PartialOrd>(value: T) -> Option<T> {
    if value > T::default() {
        Some(value)
    } else {
        warn!("non-positive value, using default");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config, AppConfig::defaults_in(dir.path()));
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());

        // Reading the generated file yields the same values.
        let reloaded = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
model = "qwen3:8b"
reasoning_effort = "HIGH"
builtin_tool_timeout = 5
mcp_config_path = "/opt/agent/mcp.json"

[memory]
enabled = true
port = "6333"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.model, "qwen3:8b");
        assert_eq!(config.reasoning_effort, ReasoningEffort::High);
        assert_eq!(config.tool_settings().command_timeout, Duration::from_secs(5));
        assert!(config.memory.enabled);
        assert_eq!(config.memory.port, 6333);
        assert_eq!(config.mcp_config_path, PathBuf::from("/opt/agent/mcp.json"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_values_fall_back_individually() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
model = "llama3"
reasoning_effort = "extreme"
builtin_tool_timeout = "soon"
max_turns = 0

[memory]
port = 70000
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.model, "llama3");
        assert_eq!(config.reasoning_effort, ReasoningEffort::Medium);
        assert_eq!(config.builtin_tool_timeout, DEFAULT_TOOL_TIMEOUT_SECS);
        assert_eq!(config.max_turns, DEFAULT_MAX_TURNS);
        assert_eq!(config.memory.port, 63333);
    }

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "builtin_tool_timeout = 0\nrender_every = 0\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.builtin_tool_timeout, DEFAULT_TOOL_TIMEOUT_SECS);
        assert_eq!(
            config.tool_settings().command_timeout,
            Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS)
        );
        assert_eq!(config.render_every, DEFAULT_RENDER_EVERY);
    }

    #[test]
    fn broken_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "model = [").unwrap();
        assert!(AppConfig::load_from(dir.path()).is_err());
    }

    #[test]
    fn env_overrides_apply_when_non_empty() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::defaults_in(dir.path());
        config.apply_env(|key| match key {
            MODEL_ENV => Some("mistral".to_string()),
            BASE_URL_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.model, "mistral");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn instructions_file_is_created_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("instructions.md");

        assert_eq!(load_instructions(&path), DEFAULT_INSTRUCTIONS);
        assert!(path.exists());

        fs::write(&path, "  Be brief.  \n").unwrap();
        assert_eq!(load_instructions(&path), "Be brief.");

        fs::write(&path, "   \n").unwrap();
        assert_eq!(load_instructions(&path), DEFAULT_INSTRUCTIONS);
    }
}
