//! Ollama Agent
//!
//! Terminal front-end for a tool-calling agent backed by a locally hosted
//! model server. Conversations persist in SQLite, reusable prompts are saved
//! as task files, and responses stream to the terminal with live reasoning,
//! tool activity and markdown rendering. Tools from configured MCP servers
//! are offered next to the built-in ones.
//!
//! # Quick Start
//!
//! ```no_run
//! use ollama_agent::prelude::*;
//!
//! # async fn example() -> ollama_agent::error::Result<()> {
//! let config = AppConfig::load()?;
//! let mut agent = OllamaAgent::connect(config).await?;
//! let answer = agent.run("What is in the current directory?", &RunOverrides::default()).await;
//! println!("{answer}");
//! agent.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod mcp;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod render;
pub mod runtime;
pub mod session;
pub mod tasks;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
