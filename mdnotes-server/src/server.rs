//! Axum router setup.

use crate::auth::auth_middleware;
use crate::config::ServerConfig;
use crate::handlers::{backup, logs, notes, password, session};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use mdnotes_core::{BackupTarget, Storage};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub backup: Arc<BackupTarget>,
    /// Password from config or environment; takes precedence over the database.
    pub password: Option<String>,
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    // Authenticated routes
    let authenticated = Router::new()
        .route("/api/notes", get(notes::list_notes).post(notes::save_note))
        .route(
            "/api/notes/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/api/import", post(notes::import_notes))
        .route(
            "/api/backup",
            get(backup::restore_backup).post(backup::create_backup),
        )
        .route(
            "/api/logs",
            get(logs::list_logs)
                .post(logs::append_log)
                .delete(logs::clear_logs),
        )
        .route("/api/password/status", get(password::status))
        .route("/api/password", post(password::change_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Unauthenticated routes
    let public = Router::new()
        .route("/api/login", post(session::login))
        .route("/health", get(health));

    Router::new()
        .merge(authenticated)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_payload_size))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
