//! Per-session item log used by the runtime to persist turns.

use std::path::PathBuf;

use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tracing::{debug, warn};

use super::schema::{now_timestamp, run_blocking, OpenMode};
use crate::error::Result;

/// Handle to one session's message log inside the shared database.
///
/// Cheap to clone; every operation opens its own connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSession {
    session_id: String,
    db_path: PathBuf,
}

impl SqliteSession {
    pub fn new(session_id: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            db_path: db_path.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    /// Append items in order. The session row is created on first write.
    pub async fn add_items(&self, items: Vec<Value>) -> Result<()> {
        let session_id = self.session_id.clone();
        let payloads = items
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let count = payloads.len();

        run_blocking(self.db_path.clone(), OpenMode::Create, move |conn| {
            let tx = conn.transaction()?;
            let now = now_timestamp();
            tx.execute(
                "INSERT OR IGNORE INTO agent_sessions (session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?2)",
                params![session_id, now],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO agent_messages (session_id, message_data, created_at)
                     VALUES (?1, ?2, ?3)",
                )?;
                for payload in &payloads {
                    stmt.execute(params![session_id, payload, now])?;
                }
            }
            tx.execute(
                "UPDATE agent_sessions SET updated_at = ?2 WHERE session_id = ?1",
                params![session_id, now],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        debug!(session_id = %self.session_id, count, "persisted session items");
        Ok(())
    }

    /// Items in insertion order; `limit` keeps only the most recent ones.
    pub async fn get_items(&self, limit: Option<usize>) -> Result<Vec<Value>> {
        let session_id = self.session_id.clone();
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        let rows = run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_data FROM (
                     SELECT id, message_data, created_at FROM agent_messages
                     WHERE session_id = ?1
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?2
                 ) ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![session_id, limit], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?
        .unwrap_or_default();

        Ok(rows
            .into_iter()
            .filter_map(|raw| match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(session_id = %self.session_id, error = %err, "skipping unparsable session item");
                    None
                }
            })
            .collect())
    }

    /// Remove and return the most recent item.
    pub async fn pop_item(&self) -> Result<Option<Value>> {
        let session_id = self.session_id.clone();
        let raw = run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, move |conn| {
            let tx = conn.transaction()?;
            let last: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, message_data FROM agent_messages
                     WHERE session_id = ?1
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1",
                    params![session_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((id, _)) = &last {
                tx.execute("DELETE FROM agent_messages WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(last.map(|(_, data)| data))
        })
        .await?
        .flatten();

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Delete every item and the session row.
    pub async fn clear(&self) -> Result<()> {
        let session_id = self.session_id.clone();
        run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, move |conn| {
            delete_session_rows(conn, &session_id)
        })
        .await?;
        Ok(())
    }
}

/// Remove the message rows and the session row in one transaction.
pub(crate) fn delete_session_rows(conn: &mut rusqlite::Connection, session_id: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM agent_messages WHERE session_id = ?1",
        params![session_id],
    )?;
    tx.execute(
        "DELETE FROM agent_sessions WHERE session_id = ?1",
        params![session_id],
    )?;
    tx.commit()?;
    Ok(())
}
