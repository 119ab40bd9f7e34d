//! Markdown backup and restore.

use crate::activity;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use mdnotes_core::backup::{from_markdown, restore_plan, to_markdown};
use mdnotes_core::models::now;
use mdnotes_core::LogLevel;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    pub success: bool,
    pub file_name: String,
    pub count: usize,
    pub target: &'static str,
}

#[derive(Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub imported: usize,
    pub updated: usize,
}

/// Serialize every note and upload the document to the backup target.
pub async fn create_backup(State(state): State<AppState>) -> Result<Json<BackupResponse>, ApiError> {
    let notes = state.storage.list_notes()?;
    let document = to_markdown(&notes);

    if let Err(e) = state.backup.store(state.storage.as_ref(), &document).await {
        activity::record(
            &state,
            LogLevel::Error,
            "Backup failed",
            Some(json!({ "target": state.backup.name(), "error": e.to_string() })),
        );
        return Err(e.into());
    }

    activity::record(
        &state,
        LogLevel::Info,
        format!("Backed up {} notes", notes.len()),
        Some(json!({ "target": state.backup.name() })),
    );

    Ok(Json(BackupResponse {
        success: true,
        file_name: state.backup.file_name(),
        count: notes.len(),
        target: state.backup.name(),
    }))
}

/// Fetch the backup document and replace the whole note collection with it.
pub async fn restore_backup(
    State(state): State<AppState>,
) -> Result<Json<RestoreResponse>, ApiError> {
    let document = match state.backup.load(state.storage.as_ref()).await {
        Ok(Some(document)) => document,
        Ok(None) => return Err(ApiError::NotFound("No backup found".to_string())),
        Err(e) => {
            activity::record(
                &state,
                LogLevel::Error,
                "Restore failed",
                Some(json!({ "target": state.backup.name(), "error": e.to_string() })),
            );
            return Err(e.into());
        }
    };

    let parsed = from_markdown(&document);
    let existing = state.storage.list_notes()?;
    let plan = restore_plan(&existing, parsed, now());

    if let Err(e) = state.storage.replace_all_notes(&plan.notes) {
        activity::record(
            &state,
            LogLevel::Error,
            "Restore failed while writing notes",
            Some(json!({ "error": e.to_string() })),
        );
        return Err(e.into());
    }

    activity::record(
        &state,
        LogLevel::Info,
        format!("Restored {} notes from backup", plan.imported),
        Some(json!({
            "target": state.backup.name(),
            "replaced": existing.len(),
            "updated": plan.updated,
        })),
    );

    Ok(Json(RestoreResponse {
        success: true,
        imported: plan.imported,
        updated: plan.updated,
    }))
}
