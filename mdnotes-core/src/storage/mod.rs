//! Storage abstraction for notes, activity logs and settings.
//!
//! The server holds one `Arc<dyn Storage>` for the life of the process.
//! Adapters decide how data is laid out (relational tables or a KV keyspace);
//! callers only see the operations below.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::models::{LogEntry, NewLogEntry, Note, NoteChanges, Setting};
use crate::Result;
use chrono::{DateTime, Utc};

/// Maximum number of log entries returned (and retained by capped adapters).
pub const LOG_CAP: usize = 200;

/// Backing store shared by every request handler.
pub trait Storage: Send + Sync {
    /// All notes, most recently updated first.
    fn list_notes(&self) -> Result<Vec<Note>>;

    fn get_note(&self, id: &str) -> Result<Option<Note>>;

    /// Insert or replace the note keyed by its id.
    fn upsert_note(&self, note: &Note) -> Result<()>;

    /// Apply `changes` to an existing note. Returns `None` for unknown ids.
    fn update_note(
        &self,
        id: &str,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>>;

    /// Returns true when a note was removed.
    fn delete_note(&self, id: &str) -> Result<bool>;

    /// Drop every note and store `notes` in their place.
    fn replace_all_notes(&self, notes: &[Note]) -> Result<usize>;

    fn append_log(&self, entry: &NewLogEntry) -> Result<()>;

    /// Newest entries first, at most `limit` of them.
    fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>>;

    fn clear_logs(&self) -> Result<usize>;

    fn get_setting(&self, key: &str) -> Result<Option<Setting>>;

    fn put_setting(&self, key: &str, value: &str) -> Result<()>;

    fn delete_setting(&self, key: &str) -> Result<bool>;
}
