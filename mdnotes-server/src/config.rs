//! Server configuration.

use anyhow::{bail, Context};
use mdnotes_core::{MemoryStorage, SqliteStorage, Storage, WebDavConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// SQLite path, `sqlite://<path>`, `:memory:` or `memory://`.
    pub database_url: String,
    /// When unset (and no database password exists) the API is open.
    pub password: Option<String>,
    pub max_payload_size: usize,
    pub webdav: WebDavConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            database_url: "mdnotes.db".to_string(),
            password: None,
            max_payload_size: 10 * 1024 * 1024,
            webdav: WebDavConfig::default(),
        }
    }
}

/// Where notes are kept, derived from `database_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Key/value layout held in process memory.
    Memory,
    SqliteInMemory,
    SqliteFile(PathBuf),
}

impl DatabaseLocation {
    pub fn parse(url: &str) -> anyhow::Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            bail!("database_url must not be empty");
        }
        if url == "memory://" || url == "memory" {
            return Ok(Self::Memory);
        }
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if path == ":memory:" {
            return Ok(Self::SqliteInMemory);
        }
        if let Some((scheme, _)) = path.split_once("://") {
            bail!("Unsupported database scheme: {}", scheme);
        }
        Ok(Self::SqliteFile(PathBuf::from(path)))
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PASSWORD`, `DATABASE_URL` and `WEBDAV_*` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup("PASSWORD") {
            self.password = Some(password);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(url) = lookup("WEBDAV_URL") {
            self.webdav.url = Some(url);
        }
        if let Some(user) = lookup("WEBDAV_USER") {
            self.webdav.username = Some(user);
        }
        if let Some(pass) = lookup("WEBDAV_PASS") {
            self.webdav.password = Some(pass);
        }
    }

    /// The configured password, ignoring blank values.
    pub fn effective_password(&self) -> Option<String> {
        self.password.clone().filter(|p| !p.is_empty())
    }

    pub fn open_storage(&self) -> anyhow::Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match DatabaseLocation::parse(&self.database_url)? {
            DatabaseLocation::Memory => {
                tracing::warn!("Using in-memory storage; notes are lost on restart");
                Arc::new(MemoryStorage::new())
            }
            DatabaseLocation::SqliteInMemory => Arc::new(SqliteStorage::in_memory()?),
            DatabaseLocation::SqliteFile(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Arc::new(SqliteStorage::open(&path)?)
            }
        };
        Ok(storage)
    }
}
