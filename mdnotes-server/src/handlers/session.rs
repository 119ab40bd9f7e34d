//! Login check.

use super::json_body;
use crate::activity;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use mdnotes_core::auth::resolve_password;
use mdnotes_core::LogLevel;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
}

/// Validates the password; nothing is issued, clients keep sending it as a bearer token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let effective = resolve_password(state.password.as_deref(), state.storage.as_ref())?;

    if !effective.permits(req.password.as_deref()) {
        activity::record(&state, LogLevel::Warn, "Login failed", None);
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
