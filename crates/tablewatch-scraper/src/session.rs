//! File-backed persistence of the authenticated browsing session.
//!
//! The artifact uses the storage-state JSON layout (`{"cookies": [...],
//! "origins": [...]}`), so files written by other browser tooling in that
//! layout load unchanged. Nothing here checks whether the stored cookies are
//! still accepted by the platform; a revoked session only shows up later as
//! failed queries.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TablewatchError;

/// Serialized proof of authentication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// Per-origin local storage. Carried through untouched.
    #[serde(default)]
    pub origins: Vec<serde_json::Value>,
}

impl SessionState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix seconds; `-1` marks a session cookie.
    #[serde(default = "session_cookie_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn session_cookie_expiry() -> f64 {
    -1.0
}

/// Persists and restores [`SessionState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` iff an artifact exists at the configured location.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the stored session.
    ///
    /// # Errors
    ///
    /// - [`TablewatchError::SessionUnavailable`] if no artifact exists.
    /// - [`TablewatchError::SessionIo`] if the file cannot be read.
    /// - [`TablewatchError::SessionFormat`] if the file is not session JSON.
    pub fn load(&self) -> Result<SessionState, TablewatchError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TablewatchError::SessionUnavailable {
                    path: self.display(),
                });
            }
            Err(err) => {
                return Err(TablewatchError::SessionIo {
                    path: self.display(),
                    source: err,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|e| TablewatchError::SessionFormat {
            path: self.display(),
            source: e,
        })
    }

    /// Writes `state`, replacing any existing artifact.
    ///
    /// Written to a sibling temp file, flushed to disk, and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`TablewatchError::SessionIo`] if the directory or file cannot
    /// be written.
    pub fn save(&self, state: &SessionState) -> Result<(), TablewatchError> {
        let io_err = |source: std::io::Error| TablewatchError::SessionIo {
            path: self.display(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let body = serde_json::to_vec_pretty(state).map_err(|e| TablewatchError::SessionFormat {
            path: self.display(),
            source: e,
        })?;

        let tmp = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::info!(path = %self.display(), cookies = state.cookies.len(), "session saved");
        Ok(())
    }

    /// Removes the artifact if present. Returns whether a file was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`TablewatchError::SessionIo`] for failures other than the file
    /// being absent.
    pub fn clear(&self) -> Result<bool, TablewatchError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(TablewatchError::SessionIo {
                path: self.display(),
                source: err,
            }),
        }
    }

    /// Returns the stored session, or runs `login` and stores its result when
    /// none exists. `login` is never invoked while an artifact is present.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::load`], `login`, and [`Self::save`].
    pub async fn load_or_login<F, Fut>(&self, login: F) -> Result<SessionState, TablewatchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SessionState, TablewatchError>>,
    {
        if self.has_session() {
            tracing::debug!(path = %self.display(), "reusing stored session");
            return self.load();
        }

        tracing::info!(path = %self.display(), "no stored session, logging in");
        let state = login().await?;
        self.save(&state)?;
        Ok(state)
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}
