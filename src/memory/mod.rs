//! Optional long-term memory backend.
//!
//! When enabled, the agent gets `mem0_add_memory` / `mem0_search_memory`
//! tools backed by a Qdrant vector store with embeddings computed by the
//! local Ollama server. The backend must be reachable before the first
//! prompt is accepted; see [`ensure_backend`].

mod bootstrap;
mod qdrant;

use async_trait::async_trait;
use serde_json::Value;

pub use bootstrap::ensure_backend;
pub use qdrant::QdrantMemory;

use crate::error::Result;

/// Store and recall free-text memories for one user.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Persist `memory`; returns `{"results": [...]}` describing what was stored.
    async fn add(&self, memory: &str) -> Result<Value>;

    /// Memories relevant to `query`, best first.
    async fn search(&self, query: &str, limit: Option<usize>) -> Result<Value>;
}

/// Default number of search hits when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
