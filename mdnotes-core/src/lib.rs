//! mdnotes core library
//!
//! Domain models, the storage abstraction with its SQLite and in-memory
//! adapters, the password gate and the Markdown backup format shared by the
//! HTTP server.

pub mod auth;
pub mod backup;
pub mod models;
pub mod storage;
#[cfg(feature = "webdav")]
pub mod webdav;

pub use auth::{EffectivePassword, PasswordSource};
pub use backup::{from_markdown, to_markdown, BackupTarget, ParsedNote, RestorePlan};
pub use models::{LogEntry, LogLevel, NewLogEntry, Note, NoteChanges, Setting};
pub use storage::{MemoryStorage, SqliteStorage, Storage, LOG_CAP};
#[cfg(feature = "webdav")]
pub use webdav::{WebDavClient, WebDavConfig};

use thiserror::Error;

/// Result type for notes operations
pub type Result<T> = std::result::Result<T, NotesError>;

/// General error type for notes operations
#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("WebDAV error: {0}")]
    WebDav(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<serde_json::Error> for NotesError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
