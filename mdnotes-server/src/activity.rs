//! Operational events written to both tracing and the log sink.

use crate::server::AppState;
use mdnotes_core::{LogLevel, NewLogEntry};

/// Record an event; a failing log sink never fails the request.
pub fn record(
    state: &AppState,
    level: LogLevel,
    message: impl Into<String>,
    meta: Option<serde_json::Value>,
) {
    let mut entry = NewLogEntry::new(level, message);
    entry.meta = meta;

    match level {
        LogLevel::Info => tracing::info!(meta = ?entry.meta, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(meta = ?entry.meta, "{}", entry.message),
        LogLevel::Error => tracing::error!(meta = ?entry.meta, "{}", entry.message),
    }

    if let Err(e) = state.storage.append_log(&entry) {
        tracing::warn!("Failed to write activity log: {}", e);
    }
}
