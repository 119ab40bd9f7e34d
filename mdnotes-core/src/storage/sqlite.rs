//! SQLite storage backend.

use super::Storage;
use crate::models::{
    format_timestamp, now, parse_timestamp, LogEntry, LogLevel, NewLogEntry, Note, NoteChanges,
    Setting,
};
use crate::{NotesError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Thread-safe SQLite storage.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);
        debug!("Opened SQLite database at {:?}", path.as_ref());

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                meta TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_updated_at
                ON notes(updated_at);
            CREATE INDEX IF NOT EXISTS idx_logs_created_at
                ON logs(created_at);",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| NotesError::LockPoisoned(format!("SQLite connection: {}", e)))
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags_json: String = row.get(3)?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        // Malformed tag arrays read back as untagged rather than failing the list
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: timestamp_column(row, 4)?,
        updated_at: timestamp_column(row, 5)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let level: String = row.get(1)?;
    let meta: Option<String> = row.get(3)?;
    Ok(LogEntry {
        id: row.get(0)?,
        level: LogLevel::parse(&level),
        message: row.get(2)?,
        meta: meta.map(|m| serde_json::from_str(&m).unwrap_or(serde_json::Value::String(m))),
        created_at: timestamp_column(row, 4)?,
    })
}

fn write_note(conn: &Connection, note: &Note) -> Result<()> {
    let tags = serde_json::to_string(&note.tags)?;
    conn.execute(
        "INSERT INTO notes (id, title, content, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            tags = excluded.tags,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at",
        params![
            note.id,
            note.title,
            note.content,
            tags,
            format_timestamp(&note.created_at),
            format_timestamp(&note.updated_at),
        ],
    )?;
    Ok(())
}

const NOTE_COLUMNS: &str = "id, title, content, tags, created_at, updated_at";

impl Storage for SqliteStorage {
    fn list_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY updated_at DESC, id ASC",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn()?;
        let note = conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                [id],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    fn upsert_note(&self, note: &Note) -> Result<()> {
        let conn = self.conn()?;
        write_note(&conn, note)
    }

    fn update_note(
        &self,
        id: &str,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                [id],
                note_from_row,
            )
            .optional()?;

        let Some(mut note) = existing else {
            return Ok(None);
        };
        changes.apply(&mut note, updated_at);
        write_note(&conn, &note)?;
        Ok(Some(note))
    }

    fn delete_note(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(count > 0)
    }

    fn replace_all_notes(&self, notes: &[Note]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM notes", [])?;
        for note in notes {
            write_note(&tx, note)?;
        }
        tx.commit()?;
        debug!("Replaced {} notes with {}", removed, notes.len());
        Ok(notes.len())
    }

    fn append_log(&self, entry: &NewLogEntry) -> Result<()> {
        let conn = self.conn()?;
        let meta = entry
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            "INSERT INTO logs (level, message, meta, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.level.as_str(),
                entry.message,
                meta,
                format_timestamp(&now()),
            ],
        )?;
        Ok(())
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, level, message, meta, created_at FROM logs ORDER BY id DESC LIMIT ?1",
        )?;
        let logs = stmt
            .query_map([limit as i64], log_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn clear_logs(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM logs", [])?;
        Ok(count)
    }

    fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let conn = self.conn()?;
        let setting = conn
            .query_row(
                "SELECT key, value, updated_at FROM settings WHERE key = ?1",
                [key],
                |row| {
                    Ok(Setting {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: timestamp_column(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(setting)
    }

    fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, format_timestamp(&now())],
        )?;
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(count > 0)
    }
}
