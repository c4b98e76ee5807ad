//! Durable conversation storage backed by SQLite.

pub mod schema;
mod sqlite;
mod store;

pub use sqlite::SqliteSession;
pub use store::{preview_text, SessionStore, SessionSummary, NO_CONTENT, NO_MESSAGES, PREVIEW_CHARS};
