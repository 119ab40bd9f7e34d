//! In-memory key/value backend.
//!
//! Mirrors the layout of a Redis deployment: notes live in a hash keyed by
//! id, activity logs in a list that is trimmed to [`LOG_CAP`] on every push,
//! settings in a second hash.

use super::{Storage, LOG_CAP};
use crate::models::{now, LogEntry, NewLogEntry, Note, NoteChanges, Setting};
use crate::{NotesError, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct KvState {
    notes: HashMap<String, Note>,
    logs: VecDeque<LogEntry>,
    settings: HashMap<String, Setting>,
    next_log_id: i64,
}

/// Process-local storage; contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<KvState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, KvState>> {
        self.state
            .lock()
            .map_err(|e| NotesError::LockPoisoned(format!("memory store: {}", e)))
    }
}

impl Storage for MemoryStorage {
    fn list_notes(&self) -> Result<Vec<Note>> {
        let state = self.state()?;
        let mut notes: Vec<Note> = state.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.state()?.notes.get(id).cloned())
    }

    fn upsert_note(&self, note: &Note) -> Result<()> {
        self.state()?.notes.insert(note.id.clone(), note.clone());
        Ok(())
    }

    fn update_note(
        &self,
        id: &str,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>> {
        let mut state = self.state()?;
        Ok(state.notes.get_mut(id).map(|note| {
            changes.apply(note, updated_at);
            note.clone()
        }))
    }

    fn delete_note(&self, id: &str) -> Result<bool> {
        Ok(self.state()?.notes.remove(id).is_some())
    }

    fn replace_all_notes(&self, notes: &[Note]) -> Result<usize> {
        let mut state = self.state()?;
        state.notes = notes.iter().map(|n| (n.id.clone(), n.clone())).collect();
        Ok(notes.len())
    }

    fn append_log(&self, entry: &NewLogEntry) -> Result<()> {
        let mut state = self.state()?;
        state.next_log_id += 1;
        let id = state.next_log_id;
        state.logs.push_front(LogEntry {
            id,
            level: entry.level,
            message: entry.message.clone(),
            meta: entry.meta.clone(),
            created_at: now(),
        });
        state.logs.truncate(LOG_CAP);
        Ok(())
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        Ok(self.state()?.logs.iter().take(limit).cloned().collect())
    }

    fn clear_logs(&self) -> Result<usize> {
        let mut state = self.state()?;
        let count = state.logs.len();
        state.logs.clear();
        Ok(count)
    }

    fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        Ok(self.state()?.settings.get(key).cloned())
    }

    fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        self.state()?.settings.insert(
            key.to_string(),
            Setting {
                key: key.to_string(),
                value: value.to_string(),
                updated_at: now(),
            },
        );
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<bool> {
        Ok(self.state()?.settings.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    fn note(id: &str, updated_secs: i64) -> Note {
        let ts = DateTime::from_timestamp(1_700_000_000 + updated_secs, 0).unwrap();
        Note {
            id: id.to_string(),
            title: id.to_uppercase(),
            content: String::new(),
            tags: vec![],
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_log_list_trimmed_on_write() {
        let storage = MemoryStorage::new();
        for i in 0..(LOG_CAP + 10) {
            storage
                .append_log(&NewLogEntry::new(LogLevel::Warn, format!("w{}", i)))
                .unwrap();
        }

        assert_eq!(storage.state().unwrap().logs.len(), LOG_CAP);
        let logs = storage.recent_logs(5).unwrap();
        assert_eq!(logs.len(), 5);
        assert_eq!(logs[0].message, format!("w{}", LOG_CAP + 9));
        assert_eq!(logs[0].id, (LOG_CAP + 10) as i64);
    }

    #[test]
    fn test_notes_hash_behaves_like_sqlite() {
        let storage = MemoryStorage::new();
        storage.upsert_note(&note("a", 5)).unwrap();
        storage.upsert_note(&note("b", 10)).unwrap();

        let listed = storage.list_notes().unwrap();
        assert_eq!(listed[0].id, "b");

        let later = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        let changes = NoteChanges {
            tags: Some(vec!["x".to_string()]),
            ..Default::default()
        };
        let updated = storage.update_note("a", &changes, later).unwrap().unwrap();
        assert_eq!(updated.tags, vec!["x".to_string()]);
        assert_eq!(storage.list_notes().unwrap()[0].id, "a");

        assert!(storage.delete_note("a").unwrap());
        assert!(storage.get_note("a").unwrap().is_none());

        let written = storage
            .replace_all_notes(&[note("c", 1), note("c", 2)])
            .unwrap();
        assert_eq!(written, 2);
        let ids: Vec<String> = storage.list_notes().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_settings_hash() {
        let storage = MemoryStorage::new();
        storage.put_setting("k", "v").unwrap();
        assert_eq!(storage.get_setting("k").unwrap().unwrap().value, "v");
        assert!(storage.delete_setting("k").unwrap());
        assert!(!storage.delete_setting("k").unwrap());
    }
}
