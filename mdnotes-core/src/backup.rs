//! Markdown backup document and where it is kept.
//!
//! Each note becomes one block:
//!
//! ```text
//! # <title>
//! 标签: <tag>, <tag>
//! 创建时间: <ISO timestamp>
//! 更新时间: <ISO timestamp>
//!
//! <content>
//! ```
//!
//! Blocks are joined with [`SEPARATOR`]. The separator is not escaped, so a
//! note whose content contains it will not survive a round trip. Titles and
//! tags that pass [`crate::models::validate_title`] and
//! [`crate::models::validate_tags`] come back unchanged.

use crate::models::{format_timestamp, new_note_id, parse_timestamp, Note, TAG_DELIMITERS};
use crate::storage::Storage;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

#[cfg(feature = "webdav")]
use crate::webdav::WebDavClient;

pub const SEPARATOR: &str = "\n\n---\n\n";

const TAGS_PREFIX: &str = "标签:";
const CREATED_PREFIX: &str = "创建时间:";
const UPDATED_PREFIX: &str = "更新时间:";

/// Settings key used when no WebDAV server is configured.
pub const BACKUP_SETTING_KEY: &str = "backup_markdown";

/// Render notes as a single Markdown document.
pub fn to_markdown(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|note| {
            format!(
                "# {}\n{} {}\n{} {}\n{} {}\n\n{}",
                note.title,
                TAGS_PREFIX,
                note.tags.join(", "),
                CREATED_PREFIX,
                format_timestamp(&note.created_at),
                UPDATED_PREFIX,
                format_timestamp(&note.updated_at),
                note.content
            )
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// A note recovered from a backup document. Backups carry no ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParsedNote {
    /// Missing timestamps are filled with `now`.
    pub fn into_note(self, id: String, now: DateTime<Utc>) -> Note {
        let created_at = self.created_at.unwrap_or(now);
        Note {
            id,
            title: self.title,
            content: self.content,
            tags: self.tags,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at.max(now)),
        }
    }
}

/// Parse a backup document. Empty blocks and blocks without a title are skipped.
pub fn from_markdown(document: &str) -> Vec<ParsedNote> {
    let document = document.replace("\r\n", "\n");
    let notes: Vec<ParsedNote> = document.split(SEPARATOR).filter_map(parse_block).collect();
    debug!("Parsed {} notes from backup document", notes.len());
    notes
}

fn parse_block(block: &str) -> Option<ParsedNote> {
    let block = block.trim_start_matches('\n');
    if block.trim().is_empty() {
        return None;
    }

    let mut lines = block.split('\n');
    let first = lines.next()?;
    let title = first
        .strip_prefix("# ")
        .or_else(|| first.strip_prefix('#'))
        .unwrap_or(first)
        .to_string();
    if title.trim().is_empty() {
        return None;
    }

    let mut note = ParsedNote {
        title,
        content: String::new(),
        tags: Vec::new(),
        created_at: None,
        updated_at: None,
    };

    for line in lines.by_ref() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            note.tags = parse_tags(rest);
        } else if let Some(rest) = line.strip_prefix(CREATED_PREFIX) {
            note.created_at = parse_timestamp(rest);
        } else if let Some(rest) = line.strip_prefix(UPDATED_PREFIX) {
            note.updated_at = parse_timestamp(rest);
        }
    }

    note.content = lines.collect::<Vec<_>>().join("\n");
    Some(note)
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_DELIMITERS)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of matching a parsed backup against the current notes.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub notes: Vec<Note>,
    /// Total notes that will be written.
    pub imported: usize,
    /// Notes that took over the id of an existing note with the same title.
    pub updated: usize,
}

/// Assign ids to parsed notes: a title match reuses the existing id, anything
/// else gets a fresh one. The plan is meant to replace the whole collection.
pub fn restore_plan(existing: &[Note], parsed: Vec<ParsedNote>, now: DateTime<Utc>) -> RestorePlan {
    let mut by_title: HashMap<&str, &str> = HashMap::new();
    for note in existing {
        by_title.entry(note.title.as_str()).or_insert(note.id.as_str());
    }

    let mut updated = 0;
    let mut notes = Vec::with_capacity(parsed.len());
    for item in parsed {
        let id = match by_title.remove(item.title.as_str()) {
            Some(id) => {
                updated += 1;
                id.to_string()
            }
            None => new_note_id(),
        };
        notes.push(item.into_note(id, now));
    }

    RestorePlan {
        imported: notes.len(),
        updated,
        notes,
    }
}

/// Where backup documents are written.
pub enum BackupTarget {
    #[cfg(feature = "webdav")]
    WebDav(WebDavClient),
    /// A single row in the settings table.
    Settings,
}

impl BackupTarget {
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "webdav")]
            Self::WebDav(_) => "webdav",
            Self::Settings => "database",
        }
    }

    /// File name reported back to clients.
    pub fn file_name(&self) -> String {
        match self {
            #[cfg(feature = "webdav")]
            Self::WebDav(client) => client.file_name().to_string(),
            Self::Settings => BACKUP_SETTING_KEY.to_string(),
        }
    }

    pub async fn store(&self, storage: &dyn Storage, document: &str) -> Result<()> {
        match self {
            #[cfg(feature = "webdav")]
            Self::WebDav(client) => client.put(document).await?,
            Self::Settings => storage.put_setting(BACKUP_SETTING_KEY, document)?,
        }
        info!("Stored {} byte backup in {}", document.len(), self.name());
        Ok(())
    }

    /// Returns `None` when no backup has been written yet.
    pub async fn load(&self, storage: &dyn Storage) -> Result<Option<String>> {
        match self {
            #[cfg(feature = "webdav")]
            Self::WebDav(client) => client.get().await,
            Self::Settings => Ok(storage.get_setting(BACKUP_SETTING_KEY)?.map(|s| s.value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn note(id: &str, title: &str, content: &str, tags: &[&str]) -> Note {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: created,
            updated_at: created + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_single_block_layout() {
        let doc = to_markdown(&[note("1", "Title", "Body text", &["a", "b"])]);
        assert_eq!(
            doc,
            "# Title\n标签: a, b\n创建时间: 2024-01-02T03:04:05.000Z\n更新时间: 2024-01-02T04:04:05.000Z\n\nBody text"
        );
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let notes = vec![
            note("1", "First", "line one\nline two\n\nafter blank", &["work", "rust"]),
            note("2", "Second", "", &[]),
            note("3", "Third", "# heading inside\n- item\n\n\ntrailing\n", &["x"]),
        ];

        let parsed = from_markdown(&to_markdown(&notes));
        assert_eq!(parsed.len(), 3);
        for (original, restored) in notes.iter().zip(&parsed) {
            assert_eq!(restored.title, original.title);
            assert_eq!(restored.content, original.content);
            assert_eq!(restored.tags, original.tags);
            assert_eq!(restored.created_at, Some(original.created_at));
            assert_eq!(restored.updated_at, Some(original.updated_at));
        }
    }

    #[test]
    fn test_empty_and_untitled_blocks_skipped() {
        let doc = "# Kept\n\nbody\n\n---\n\n   \n\n---\n\n# \n标签: a\n\ncontent";
        let parsed = from_markdown(doc);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Kept");
        assert_eq!(parsed[0].content, "body");
    }

    #[test]
    fn test_missing_headers_and_loose_tags() {
        let doc = "# Plain\n标签: one，two, ,three\n创建时间: garbage\n\ntext";
        let parsed = from_markdown(doc);
        assert_eq!(parsed[0].tags, vec!["one", "two", "three"]);
        assert_eq!(parsed[0].created_at, None);
        assert_eq!(parsed[0].updated_at, None);
        assert_eq!(parsed[0].content, "text");
    }

    #[test]
    fn test_title_whitespace_survives_round_trip() {
        let notes = vec![
            note("1", "  padded ", "body", &["两个 词", "b"]),
            note("2", "#hash", "", &[]),
        ];
        let parsed = from_markdown(&to_markdown(&notes));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title, "  padded ");
        assert_eq!(parsed[0].tags, vec!["两个 词", "b"]);
        assert_eq!(parsed[1].title, "#hash");
    }

    #[test]
    fn test_title_without_hash_prefix() {
        let parsed = from_markdown("Bare title\n\ncontent");
        assert_eq!(parsed[0].title, "Bare title");
    }

    #[test]
    fn test_crlf_documents() {
        let parsed = from_markdown("# T\r\n标签: a\r\n\r\nbody\r\nmore");
        assert_eq!(parsed[0].tags, vec!["a"]);
        assert_eq!(parsed[0].content, "body\nmore");
    }

    #[test]
    fn test_embedded_separator_splits_note() {
        let doc = to_markdown(&[note("1", "A", "before\n\n---\n\nafter", &[])]);
        let parsed = from_markdown(&doc);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].content, "before");
    }

    #[test]
    fn test_into_note_fills_missing_timestamps() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let parsed = ParsedNote {
            title: "T".to_string(),
            content: String::new(),
            tags: vec![],
            created_at: None,
            updated_at: None,
        };
        let note = parsed.into_note("id".to_string(), now);
        assert_eq!(note.created_at, now);
        assert_eq!(note.updated_at, now);
    }

    #[test]
    fn test_restore_plan_reuses_ids_by_title() {
        let existing = vec![note("keep-id", "Shared", "old", &[]), note("gone", "Dropped", "", &[])];
        let parsed = from_markdown(&to_markdown(&[
            note("x", "Shared", "new", &[]),
            note("y", "Fresh", "", &[]),
        ]));

        let plan = restore_plan(&existing, parsed, Utc::now());
        assert_eq!(plan.imported, 2);
        assert_eq!(plan.updated, 1);
        assert_eq!(plan.notes[0].id, "keep-id");
        assert_eq!(plan.notes[0].content, "new");
        assert_ne!(plan.notes[1].id, "gone");
        assert_ne!(plan.notes[1].id, "y");
    }

    #[tokio::test]
    async fn test_settings_target_round_trip() {
        let storage = MemoryStorage::new();
        let target = BackupTarget::Settings;
        assert_eq!(target.name(), "database");
        assert!(target.load(&storage).await.unwrap().is_none());

        target.store(&storage, "# A\n\nx").await.unwrap();
        assert_eq!(
            target.load(&storage).await.unwrap().as_deref(),
            Some("# A\n\nx")
        );
    }
}
