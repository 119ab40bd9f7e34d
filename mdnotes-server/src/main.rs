//! mdnotes server
//!
//! JSON API for a personal Markdown notebook: note CRUD behind a shared
//! password, an activity log, and Markdown backups kept on a WebDAV server
//! or in the settings table.

mod activity;
mod auth;
mod config;
mod error;
mod handlers;
mod server;

use clap::Parser;
use mdnotes_core::{BackupTarget, WebDavClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdnotes-server", about = "Markdown notes API server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mdnotes.toml")]
    config: PathBuf,

    /// Listen address override
    #[arg(short, long)]
    listen: Option<String>,

    /// Database URL override
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::ServerConfig::load(&cli.config)?
    } else {
        tracing::info!("No config file found, using defaults");
        config::ServerConfig::default()
    };
    cfg.apply_env();

    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }
    if let Some(database) = cli.database {
        cfg.database_url = database;
    }

    let storage = cfg.open_storage()?;

    let backup = if cfg.webdav.is_configured() {
        tracing::info!("Backups go to WebDAV file {}", cfg.webdav.file_name);
        BackupTarget::WebDav(WebDavClient::new(&cfg.webdav)?)
    } else {
        tracing::info!("WebDAV not configured, backups are kept in the database");
        BackupTarget::Settings
    };

    let password = cfg.effective_password();
    if password.is_none() {
        tracing::warn!("No PASSWORD configured; the API is open unless a database password is set");
    }

    let state = server::AppState {
        storage,
        backup: Arc::new(backup),
        password,
    };
    let app = server::build_router(state, &cfg);

    tracing::info!("Starting mdnotes server on {}", cfg.listen_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
