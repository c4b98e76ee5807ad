use tracing::{debug, error};

use crate::config::MemorySettings;
use crate::error::{AgentError, Result};
use crate::provider::http::{join_url, shared_client};

/// Health-check the vector store. Any failure is a typed initialization
/// error so the caller can abort before a prompt is sent.
pub async fn ensure_backend(settings: &MemorySettings) -> Result<()> {
    let url = join_url(&settings.store_url(), "healthz");
    debug!(url = %url, "checking memory backend");

    let response = shared_client().get(&url).send().await.map_err(|err| {
        error!(url = %url, error = %err, "memory backend unreachable");
        AgentError::MemoryInitialization(format!(
            "vector store at {} is unreachable: {err}",
            settings.store_url()
        ))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::MemoryInitialization(format!(
            "vector store health check returned {status}"
        )));
    }
    Ok(())
}
