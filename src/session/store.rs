//! Session lifecycle and listing.
//!
//! [`SessionStore`] owns the "current session" handle and exposes the read,
//! list and delete side of the session database. Its public methods are
//! advisory: storage failures are logged and degrade to empty results so a
//! chat can continue even when bookkeeping fails.

use std::path::{Path, PathBuf};

use rusqlite::params;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use super::schema::{run_blocking, OpenMode};
use super::sqlite::{delete_session_rows, SqliteSession};
use crate::error::Result;
use crate::types::{extract_text, truncate_chars, SessionId};

pub const PREVIEW_CHARS: usize = 50;
pub const NO_MESSAGES: &str = "No messages";
pub const NO_CONTENT: &str = "No content";
const UNKNOWN_TIME: &str = "Unknown";

/// One row of [`SessionStore::list_sessions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub message_count: u64,
    pub first_message_time: String,
    pub last_message_time: String,
    pub preview: String,
}

/// Current-session handle plus read/list/delete access to the session database.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db_path: PathBuf,
    current: Option<SqliteSession>,
}

impl SessionStore {
    /// Bind to the database at `db_path` and start a fresh session.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                error!(path = %parent.display(), error = %err, "could not create session directory");
            }
        }
        let mut store = Self {
            db_path,
            current: None,
        };
        store.reset_session();
        store
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Start a new session with a random id and make it current.
    pub fn reset_session(&mut self) -> SessionId {
        let session_id = Uuid::new_v4().to_string();
        debug!(session_id = %session_id, "starting new session");
        self.current = Some(SqliteSession::new(session_id.clone(), self.db_path.clone()));
        session_id
    }

    /// Make `session_id` current. Existence is not checked; the session is
    /// materialized on its first write.
    pub fn load_session(&mut self, session_id: &str) {
        debug!(session_id, "loading session");
        self.current = Some(SqliteSession::new(session_id, self.db_path.clone()));
    }

    pub fn session_id(&self) -> Option<&str> {
        self.current.as_ref().map(SqliteSession::session_id)
    }

    /// Handle the runtime writes turns through.
    pub fn current_session(&self) -> Option<&SqliteSession> {
        self.current.as_ref()
    }

    /// All sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        match self.try_list_sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!(error = %err, "error listing sessions");
                Vec::new()
            }
        }
    }

    pub async fn try_list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let rows = run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.session_id,
                        COUNT(m.id) AS message_count,
                        s.created_at,
                        s.updated_at,
                        (
                            SELECT message_data
                            FROM agent_messages
                            WHERE session_id = s.session_id
                            ORDER BY created_at ASC, id ASC
                            LIMIT 1
                        ) AS first_message
                 FROM agent_sessions s
                 LEFT JOIN agent_messages m ON s.session_id = m.session_id
                 GROUP BY s.session_id
                 ORDER BY s.updated_at DESC, s.rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    let created: Option<String> = row.get(2)?;
                    let updated: Option<String> = row.get(3)?;
                    let first: Option<String> = row.get(4)?;
                    Ok(SessionSummary {
                        session_id: row.get(0)?,
                        message_count: row.get::<_, i64>(1)?.max(0) as u64,
                        first_message_time: created.unwrap_or_else(|| UNKNOWN_TIME.to_string()),
                        last_message_time: updated.unwrap_or_else(|| UNKNOWN_TIME.to_string()),
                        preview: preview_text(first.as_deref()),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;
        Ok(rows.unwrap_or_default())
    }

    /// Raw stored items of `session_id`, or of the current session.
    pub async fn session_history(&self, session_id: Option<&str>) -> Vec<Value> {
        let Some(session_id) = session_id.or_else(|| self.session_id()) else {
            return Vec::new();
        };
        let session = SqliteSession::new(session_id, self.db_path.clone());
        match session.get_items(None).await {
            Ok(items) => items,
            Err(err) => {
                error!(session_id, error = %err, "error getting session history");
                Vec::new()
            }
        }
    }

    /// Delete a session and its messages.
    ///
    /// Returns `false` when the database does not exist yet or the delete
    /// fails. Deleting the current session starts a new one.
    pub async fn delete_session(&mut self, session_id: &str) -> bool {
        let target = session_id.to_string();
        let outcome = run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, move |conn| {
            delete_session_rows(conn, &target)
        })
        .await;

        match outcome {
            Ok(Some(())) => {
                debug!(session_id, "deleted session");
                if self.session_id() == Some(session_id) {
                    self.reset_session();
                }
                true
            }
            Ok(None) => false,
            Err(err) => {
                error!(session_id, error = %err, "error deleting session");
                false
            }
        }
    }

    /// Resolve a full id or unique id prefix against the stored sessions.
    pub async fn resolve_session_id(&self, prefix: &str) -> Option<SessionId> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return None;
        }
        let matches: Vec<_> = self
            .list_sessions()
            .await
            .into_iter()
            .map(|s| s.session_id)
            .filter(|id| id.starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [only] => Some(only.clone()),
            [] => None,
            many => {
                tracing::warn!(prefix, candidates = ?many, "ambiguous session prefix");
                None
            }
        }
    }

    /// Count messages for one session. `/load` reports this.
    pub async fn message_count(&self, session_id: &str) -> u64 {
        let target = session_id.to_string();
        let count = run_blocking(self.db_path.clone(), OpenMode::ExistingOnly, move |conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM agent_messages WHERE session_id = ?1",
                params![target],
                |row| row.get::<_, i64>(0),
            )?)
        })
        .await;
        match count {
            Ok(count) => count.unwrap_or(0).max(0) as u64,
            Err(err) => {
                error!(session_id, error = %err, "error counting messages");
                0
            }
        }
    }
}

/// Listing preview for a session's first stored payload.
///
/// `None` or an empty payload yields `"No messages"`, unparsable JSON yields
/// `"No content"`. Otherwise the text of the payload's `content` field (or of
/// the whole payload when it is not an object) is cut to 50 characters; when
/// no text can be extracted the serialized payload is cut instead.
pub fn preview_text(message_blob: Option<&str>) -> String {
    let Some(blob) = message_blob.filter(|b| !b.is_empty()) else {
        return NO_MESSAGES.to_string();
    };
    let data: Value = match serde_json::from_str(blob) {
        Ok(data) => data,
        Err(_) => return NO_CONTENT.to_string(),
    };

    let text = match &data {
        Value::Object(map) => map.get("content").map(extract_text).unwrap_or_default(),
        other => extract_text(other),
    };
    if text.is_empty() {
        truncate_chars(&data.to_string(), PREVIEW_CHARS).to_string()
    } else {
        truncate_chars(&text, PREVIEW_CHARS).to_string()
    }
}
