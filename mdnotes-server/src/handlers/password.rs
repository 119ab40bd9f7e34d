//! Password status and rotation.

use super::{json_body, required};
use crate::activity;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use mdnotes_core::auth::{resolve_password, rotate_password};
use mdnotes_core::{LogLevel, NotesError, PasswordSource};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStatus {
    pub has_password: bool,
    pub password_source: PasswordSource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Result<Json<PasswordStatus>, ApiError> {
    let effective = resolve_password(state.password.as_deref(), state.storage.as_ref())?;
    Ok(Json(PasswordStatus {
        has_password: effective.is_set(),
        password_source: effective.source(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let new_password = required(req.new_password, "newPassword")?;
    let current = req.current_password.unwrap_or_default();

    match rotate_password(
        state.password.as_deref(),
        state.storage.as_ref(),
        &current,
        &new_password,
    ) {
        Ok(()) => {
            activity::record(&state, LogLevel::Info, "Password changed", None);
            Ok(Json(serde_json::json!({ "success": true })))
        }
        Err(NotesError::Unauthorized(msg)) => {
            activity::record(&state, LogLevel::Warn, "Password change rejected", None);
            Err(ApiError::Unauthorized(msg))
        }
        Err(e) => Err(e.into()),
    }
}
