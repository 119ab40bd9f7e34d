//! WebDAV client used as a remote store for the backup document.

use crate::{NotesError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FILE_NAME: &str = "notes-backup.md";

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// Connection settings for the WebDAV collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDavConfig {
    /// Collection URL; backups are disabled for WebDAV when unset.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for WebDavConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            file_name: default_file_name(),
        }
    }
}

impl WebDavConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// HTTP client for one backup file inside a WebDAV collection.
pub struct WebDavClient {
    client: reqwest::Client,
    file_url: String,
    file_name: String,
    username: Option<String>,
    password: Option<String>,
}

impl WebDavClient {
    pub fn new(config: &WebDavConfig) -> Result<Self> {
        let base = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| NotesError::InvalidInput("WebDAV URL is not configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotesError::WebDav(e.to_string()))?;

        Ok(Self {
            client,
            file_url: format!(
                "{}/{}",
                base.trim_end_matches('/'),
                config.file_name.trim_start_matches('/')
            ),
            file_name: config.file_name.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    /// Upload the document, replacing any previous backup.
    pub async fn put(&self, document: &str) -> Result<()> {
        let resp = self
            .authorized(self.client.put(&self.file_url))
            .header("Content-Type", "text/markdown; charset=utf-8")
            .body(document.to_string())
            .send()
            .await
            .map_err(|e| NotesError::WebDav(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(NotesError::WebDav(format!(
                "PUT {} failed with {}: {}",
                self.file_name, status, body
            )));
        }

        debug!("Uploaded {} to WebDAV", self.file_name);
        Ok(())
    }

    /// Download the document; `None` when the server has no such file.
    pub async fn get(&self) -> Result<Option<String>> {
        let resp = self
            .authorized(self.client.get(&self.file_url))
            .send()
            .await
            .map_err(|e| NotesError::WebDav(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(NotesError::WebDav(format!(
                "GET {} failed with {}",
                self.file_name,
                resp.status()
            )));
        }

        resp.text()
            .await
            .map(Some)
            .map_err(|e| NotesError::WebDav(e.to_string()))
    }
}
