//! Note CRUD and bulk import handlers.

use super::{json_body, required};
use crate::activity;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use mdnotes_core::models::{new_note_id, now, validate_tags, validate_title};
use mdnotes_core::{LogLevel, Note, NoteChanges};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize)]
pub struct SaveNoteRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct ImportRequest {
    pub notes: Option<Vec<Value>>,
}

/// One element of an import batch. Clients may send numeric ids.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportItem {
    id: Option<Value>,
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.storage.list_notes()?))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    state
        .storage
        .get_note(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))
}

/// Insert or replace a note. An existing note keeps its creation time.
pub async fn save_note(
    State(state): State<AppState>,
    payload: Result<Json<SaveNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let req = json_body(payload)?;
    let title = required(req.title, "title")?;
    let content = required(req.content, "content")?;
    let tags = req.tags.unwrap_or_default();
    validate_title(&title)?;
    validate_tags(&tags)?;

    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_note_id);
    let timestamp = now();
    let created_at = state
        .storage
        .get_note(&id)?
        .map(|existing| existing.created_at)
        .unwrap_or(timestamp);

    let note = Note {
        id,
        title,
        content,
        tags,
        created_at,
        updated_at: timestamp,
    };
    state.storage.upsert_note(&note)?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let req = json_body(payload)?;
    let changes = NoteChanges {
        title: Some(required(req.title, "title")?),
        content: Some(required(req.content, "content")?),
        tags: req.tags,
    };
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    if let Some(tags) = &changes.tags {
        validate_tags(tags)?;
    }

    state
        .storage
        .update_note(&id, &changes, now())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.storage.delete_note(&id)? {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }
    activity::record(
        &state,
        LogLevel::Info,
        "Note deleted",
        Some(serde_json::json!({ "id": id })),
    );
    Ok(Json(serde_json::json!({ "success": true })))
}

fn id_from_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Bulk upsert. Malformed items are skipped and counted; the rest are written.
pub async fn import_notes(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let req = json_body(payload)?;
    let items = required(req.notes, "notes")?;

    let timestamp = now();
    let mut imported = 0;
    let mut skipped = 0;

    for raw in items {
        let item = match serde_json::from_value::<ImportItem>(raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!("Skipping malformed import item: {}", e);
                skipped += 1;
                continue;
            }
        };
        let Some(title) = item.title else {
            skipped += 1;
            continue;
        };
        let tags = item.tags.unwrap_or_default();
        if let Err(e) = validate_title(&title).and_then(|_| validate_tags(&tags)) {
            tracing::debug!("Skipping import item: {}", e);
            skipped += 1;
            continue;
        }

        let created_at = item.created_at.unwrap_or(timestamp);
        let note = Note {
            id: id_from_value(item.id).unwrap_or_else(new_note_id),
            title,
            content: item.content.unwrap_or_default(),
            tags,
            created_at,
            updated_at: item.updated_at.unwrap_or(timestamp),
        };
        state.storage.upsert_note(&note)?;
        imported += 1;
    }

    activity::record(
        &state,
        LogLevel::Info,
        format!("Imported {} notes", imported),
        Some(serde_json::json!({ "imported": imported, "skipped": skipped })),
    );

    Ok(Json(ImportResponse {
        success: true,
        imported,
        skipped,
    }))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_list_get() {
        let app = app(None);
        let (status, created) = send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"title": "Hello", "content": "# hi", "tags": ["a"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(created["tags"], json!(["a"]));

        let (status, listed) = send(&app, Method::GET, "/api/notes", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, fetched) =
            send(&app, Method::GET, &format!("/api/notes/{}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Hello");
        assert!(fetched.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_requests() {
        let app = app(None);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"content": "no title"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: title");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/notes/1",
            None,
            Some(json!({"title": "no content"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"title": 42, "content": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_upsert_same_payload_twice() {
        let app = app(None);
        let payload = json!({"id": "n1", "title": "Same", "content": "body"});

        let (_, first) = send(&app, Method::POST, "/api/notes", None, Some(payload.clone())).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (_, second) = send(&app, Method::POST, "/api/notes", None, Some(payload)).await;

        let (_, listed) = send(&app, Method::GET, "/api/notes", None, None).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["updatedAt"], second["updatedAt"]);
        assert_ne!(first["updatedAt"], second["updatedAt"]);
        assert_eq!(listed[0]["createdAt"], first["createdAt"]);
    }

    #[tokio::test]
    async fn test_update_keeps_tags_when_omitted() {
        let app = app(None);
        send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"id": "n1", "title": "T", "content": "c", "tags": ["keep"]})),
        )
        .await;

        let (status, updated) = send(
            &app,
            Method::PUT,
            "/api/notes/n1",
            None,
            Some(json!({"title": "T2", "content": "c2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "T2");
        assert_eq!(updated["tags"], json!(["keep"]));

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/notes/missing",
            None,
            Some(json!({"title": "x", "content": "y"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let app = app(None);
        send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"id": "gone", "title": "T", "content": ""})),
        )
        .await;

        let (status, body) = send(&app, Method::DELETE, "/api/notes/gone", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, listed) = send(&app, Method::GET, "/api/notes", None, None).await;
        assert!(listed.as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::GET, "/api/notes/gone", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/api/notes/gone", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, logs) = send(&app, Method::GET, "/api/logs", None, None).await;
        assert_eq!(logs["items"][0]["message"], "Note deleted");
    }

    #[tokio::test]
    async fn test_import_single_note() {
        let app = app(None);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/import",
            None,
            Some(json!({"notes": [{"id": "1", "title": "A", "content": "x", "tags": ["t"]}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 1);

        let (_, listed) = send(&app, Method::GET, "/api/notes", None, None).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], "1");
        assert_eq!(listed[0]["title"], "A");
        assert_eq!(listed[0]["tags"], json!(["t"]));
    }

    #[tokio::test]
    async fn test_import_skips_malformed_items() {
        let app = app(None);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/import",
            None,
            Some(json!({"notes": [
                {"id": 7, "title": "Numeric id", "content": "x",
                 "createdAt": "2023-01-01T00:00:00.000Z", "updatedAt": "2023-01-02T00:00:00.000Z"},
                {"content": "no title"},
                "not an object",
                {"title": "Generated id"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["skipped"], 2);

        let (_, numeric) = send(&app, Method::GET, "/api/notes/7", None, None).await;
        assert_eq!(numeric["title"], "Numeric id");
        assert_eq!(numeric["createdAt"], "2023-01-01T00:00:00Z");

        let (status, _) = send(&app, Method::POST, "/api/import", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_import_accepts_null_tags() {
        let app = app(None);
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/import",
            None,
            Some(json!({"notes": [{"id": "1", "title": "A", "content": "x", "tags": null}]})),
        )
        .await;
        assert_eq!(body["imported"], 1);
        assert_eq!(body["skipped"], 0);

        let (_, fetched) = send(&app, Method::GET, "/api/notes/1", None, None).await;
        assert_eq!(fetched["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_titles_and_tags_the_backup_cannot_hold_are_rejected() {
        let app = app(None);
        for payload in [
            json!({"title": "", "content": "precious"}),
            json!({"title": "   ", "content": "x"}),
            json!({"title": "two\nlines", "content": "x"}),
            json!({"title": "T", "content": "x", "tags": ["a,b"]}),
            json!({"title": "T", "content": "x", "tags": [" sp"]}),
        ] {
            let (status, _) =
                send(&app, Method::POST, "/api/notes", None, Some(payload.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
        }

        send(
            &app,
            Method::POST,
            "/api/notes",
            None,
            Some(json!({"id": "n1", "title": "  padded ", "content": "c"})),
        )
        .await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/notes/n1",
            None,
            Some(json!({"title": "", "content": "c"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title must not be empty");

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/import",
            None,
            Some(json!({"notes": [
                {"id": "e", "title": "", "content": "precious"},
                {"id": "c", "title": "Tagged", "tags": ["a,b"]},
                {"id": "ok", "title": "Fine", "tags": ["a", "b"]}
            ]})),
        )
        .await;
        assert_eq!(body["imported"], 1);
        assert_eq!(body["skipped"], 2);
    }
}
