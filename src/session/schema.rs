//! SQLite schema and blocking connection helpers.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{AgentError, Result};

/// Two-table layout: sessions keyed by id, messages with an opaque JSON payload.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id TEXT PRIMARY KEY,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS agent_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    message_data TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES agent_sessions (session_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_agent_messages_session_id
    ON agent_messages (session_id, created_at);
"#;

/// Whether a blocking operation may create the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    Create,
    ExistingOnly,
}

/// Open the database at `path` and make sure the schema exists.
///
/// Returns `Ok(None)` in [`OpenMode::ExistingOnly`] when the file is missing.
pub(crate) fn open(path: &Path, mode: OpenMode) -> Result<Option<Connection>> {
    if mode == OpenMode::ExistingOnly && !path.exists() {
        return Ok(None);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;
    conn.execute_batch(SCHEMA)?;
    Ok(Some(conn))
}

/// Run `f` against a fresh connection on the blocking pool.
pub(crate) async fn run_blocking<F, R>(path: PathBuf, mode: OpenMode, f: F) -> Result<Option<R>>
where
    F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || match open(&path, mode)? {
        Some(mut conn) => f(&mut conn).map(Some),
        None => Ok(None),
    })
    .await
    .map_err(AgentError::from)?
}

/// Millisecond-precision UTC timestamp in SQLite's text format.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn existing_only_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.db");
        assert!(open(&path, OpenMode::ExistingOnly).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn create_mode_initializes_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        let conn = open(&path, OpenMode::Create).unwrap().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'agent_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let first = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = now_timestamp();
        assert!(first < second);
        assert_eq!(first.len(), "2024-01-01 00:00:00.000".len());
    }
}
