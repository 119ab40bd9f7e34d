//! Password gate.
//!
//! The "session" is the password itself: clients send it as a bearer token on
//! every request. The effective password comes from configuration first and
//! from the settings table second.

use crate::storage::Storage;
use crate::{NotesError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Settings key holding a password set through the API.
pub const PASSWORD_KEY: &str = "password";
/// Settings key flagging that [`PASSWORD_KEY`] is in effect.
pub const PASSWORD_SET_KEY: &str = "password_set";

/// Where the effective password came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordSource {
    #[serde(rename = "env")]
    Environment,
    Database,
    None,
}

/// The password requests are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePassword {
    password: Option<String>,
    source: PasswordSource,
}

impl EffectivePassword {
    pub fn source(&self) -> PasswordSource {
        self.source
    }

    pub fn is_set(&self) -> bool {
        self.password.is_some()
    }

    /// Plain equality check; with no password configured every token passes.
    pub fn permits(&self, token: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => token == Some(expected.as_str()),
        }
    }
}

/// Resolve the password currently guarding the API.
pub fn resolve_password(configured: Option<&str>, store: &dyn Storage) -> Result<EffectivePassword> {
    if let Some(password) = configured.filter(|p| !p.is_empty()) {
        return Ok(EffectivePassword {
            password: Some(password.to_string()),
            source: PasswordSource::Environment,
        });
    }

    let flagged = store
        .get_setting(PASSWORD_SET_KEY)?
        .is_some_and(|s| s.value == "true");
    if flagged {
        if let Some(stored) = store.get_setting(PASSWORD_KEY)? {
            return Ok(EffectivePassword {
                password: Some(stored.value),
                source: PasswordSource::Database,
            });
        }
    }

    Ok(EffectivePassword {
        password: None,
        source: PasswordSource::None,
    })
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

/// Replace the database-resident password.
pub fn rotate_password(
    configured: Option<&str>,
    store: &dyn Storage,
    current: &str,
    new: &str,
) -> Result<()> {
    let effective = resolve_password(configured, store)?;
    if effective.source() == PasswordSource::Environment {
        return Err(NotesError::InvalidInput(
            "Password is set by the environment and cannot be changed here".to_string(),
        ));
    }
    if !effective.permits(Some(current)) {
        return Err(NotesError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }
    if new.is_empty() {
        return Err(NotesError::InvalidInput(
            "New password must not be empty".to_string(),
        ));
    }

    store.put_setting(PASSWORD_KEY, new)?;
    store.put_setting(PASSWORD_SET_KEY, "true")?;
    info!("Database password updated");
    Ok(())
}
