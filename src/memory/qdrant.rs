//! Qdrant vector store with Ollama embeddings.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use super::{MemoryBackend, DEFAULT_SEARCH_LIMIT};
use crate::config::MemorySettings;
use crate::error::{AgentError, Result};
use crate::provider::http::{join_url, shared_client, status_to_error};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    payload: Value,
}

pub struct QdrantMemory {
    settings: MemorySettings,
    collection_ready: OnceCell<()>,
}

impl QdrantMemory {
    pub fn new(settings: MemorySettings) -> Self {
        Self {
            settings,
            collection_ready: OnceCell::new(),
        }
    }

    fn collection_url(&self, suffix: &str) -> String {
        let base = join_url(
            &self.settings.store_url(),
            &format!("collections/{}", self.settings.collection_name),
        );
        if suffix.is_empty() {
            base
        } else {
            join_url(&base, suffix)
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = join_url(&self.settings.embedder_base_url, "api/embeddings");
        let response = shared_client()
            .post(&url)
            .json(&json!({"model": self.settings.embedder_model, "prompt": text}))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body));
        }
        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(AgentError::Stream(format!(
                "embedder '{}' returned an empty vector",
                self.settings.embedder_model
            )));
        }
        Ok(body.embedding)
    }

    async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let url = self.collection_url("");
                let existing = shared_client().get(&url).send().await?;
                if existing.status().is_success() {
                    return Ok(());
                }
                debug!(collection = %self.settings.collection_name, "creating memory collection");
                let response = shared_client()
                    .put(&url)
                    .json(&json!({
                        "vectors": {
                            "size": self.settings.embedding_model_dims,
                            "distance": "Cosine"
                        }
                    }))
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(status_to_error(status.as_u16(), &body));
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl MemoryBackend for QdrantMemory {
    async fn add(&self, memory: &str) -> Result<Value> {
        self.ensure_collection().await?;
        let vector = self.embed(memory).await?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        let response = shared_client()
            .put(format!("{}?wait=true", self.collection_url("points")))
            .json(&json!({
                "points": [{
                    "id": id,
                    "vector": vector,
                    "payload": {
                        "memory": memory,
                        "user_id": self.settings.user_id,
                        "created_at": created_at,
                    }
                }]
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body));
        }

        debug!(memory_id = %id, "stored memory");
        Ok(json!({
            "results": [{"id": id, "memory": memory, "event": "ADD"}]
        }))
    }

    async fn search(&self, query: &str, limit: Option<usize>) -> Result<Value> {
        self.ensure_collection().await?;
        let vector = self.embed(query).await?;
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);

        let response = shared_client()
            .post(self.collection_url("points/search"))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
                "filter": {
                    "must": [{"key": "user_id", "match": {"value": self.settings.user_id}}]
                }
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body));
        }

        let body: SearchResponse = response.json().await?;
        let results: Vec<Value> = body
            .result
            .into_iter()
            .map(|point| {
                json!({
                    "id": point.id,
                    "memory": point.payload.get("memory").cloned().unwrap_or(Value::Null),
                    "created_at": point.payload.get("created_at").cloned().unwrap_or(Value::Null),
                    "score": point.score,
                })
            })
            .collect();
        Ok(json!({ "results": results }))
    }
}
