//! Activity log handlers.

use super::{json_body, required};
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use mdnotes_core::{LogEntry, LogLevel, NewLogEntry, LOG_CAP};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct LogsResponse {
    pub items: Vec<LogEntry>,
}

#[derive(Deserialize)]
pub struct AppendLogRequest {
    pub level: Option<String>,
    pub message: Option<String>,
    pub meta: Option<serde_json::Value>,
}

pub async fn list_logs(State(state): State<AppState>) -> Result<Json<LogsResponse>, ApiError> {
    let items = state.storage.recent_logs(LOG_CAP)?;
    Ok(Json(LogsResponse { items }))
}

/// Client-side events (e.g. failed syncs in the browser) land in the same sink.
pub async fn append_log(
    State(state): State<AppState>,
    payload: Result<Json<AppendLogRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let message = required(req.message, "message")?;

    let entry = NewLogEntry {
        level: req.level.as_deref().map(LogLevel::parse).unwrap_or_default(),
        message,
        meta: req.meta,
    };
    state.storage.append_log(&entry)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn clear_logs(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.storage.clear_logs()?;
    tracing::info!("Cleared {} log entries", deleted);
    Ok(Json(serde_json::json!({ "success": true, "deleted": deleted })))
}
