//! Bearer-password middleware.

use crate::error::ApiError;
use crate::server::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use mdnotes_core::auth::{bearer_token, resolve_password};

/// Rejects requests whose bearer token does not match the effective password.
/// With no password configured every request passes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let effective = resolve_password(state.password.as_deref(), state.storage.as_ref())?;

    if effective.is_set() {
        let token = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);

        if !effective.permits(token) {
            tracing::debug!(
                "Rejected {} {}: missing or wrong bearer token",
                request.method(),
                request.uri().path()
            );
            return Err(ApiError::Unauthorized("Unauthorized".to_string()));
        }
    }

    Ok(next.run(request).await)
}
