//! Explicit login/logout lifecycle for the current user.
//!
//! `SessionContext` owns the active `UserSession` behind an `RwLock` and can
//! mirror it to a JSON file so separate CLI invocations share one login.
//! Bearer tokens are zeroized when dropped.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Session lock poisoned")]
    LockPoisoned,

    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// API bearer token, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub logged_in_at: DateTime<Utc>,
    #[serde(default)]
    pub token: Option<SessionToken>,
}

/// Login input. The password is checked for presence only and wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════
// File mirror
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the application's default session file.
    pub fn default_location() -> Self {
        Self::new(config::session_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &UserSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(&bytes)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<UserSession>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true if a file was removed.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// SessionContext
// ═══════════════════════════════════════════════════════════

pub struct SessionContext {
    current: RwLock<Option<UserSession>>,
    store: Option<SessionStore>,
}

impl SessionContext {
    /// Session held in memory only.
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            store: None,
        }
    }

    /// Session mirrored to `store`, restoring any saved login.
    ///
    /// A corrupt file is discarded with a warning rather than failing.
    pub fn with_store(store: SessionStore) -> Result<Self, SessionError> {
        let restored = match store.load() {
            Ok(session) => session,
            Err(SessionError::Corrupt(e)) => {
                tracing::warn!(path = %store.path().display(), error = %e, "Discarding corrupt session file");
                store.clear()?;
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(ref s) = restored {
            tracing::debug!(user_id = %s.user_id, "Restored session");
        }
        Ok(Self {
            current: RwLock::new(restored),
            store: Some(store),
        })
    }

    pub fn login(&self, credentials: Credentials) -> Result<UserSession, SessionError> {
        let email = credentials.email.trim().to_ascii_lowercase();
        if !is_valid_email(&email) {
            return Err(SessionError::InvalidEmail(credentials.email.clone()));
        }
        if credentials.password.is_empty() {
            return Err(SessionError::EmptyPassword);
        }

        let session = UserSession {
            user_id: user_id_for(&email),
            display_name: display_name_for(&email),
            email,
            logged_in_at: Utc::now(),
            token: credentials
                .token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(SessionToken::new),
        };

        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        let mut guard = self.current.write().map_err(|_| SessionError::LockPoisoned)?;
        *guard = Some(session.clone());

        tracing::info!(user_id = %session.user_id, "Logged in");
        Ok(session)
    }

    /// Clears memory and the mirrored file. Returns true if a session existed.
    pub fn logout(&self) -> Result<bool, SessionError> {
        let had_session = {
            let mut guard = self.current.write().map_err(|_| SessionError::LockPoisoned)?;
            guard.take().is_some()
        };
        let had_file = match &self.store {
            Some(store) => store.clear()?,
            None => false,
        };
        if had_session || had_file {
            tracing::info!("Logged out");
        }
        Ok(had_session || had_file)
    }

    pub fn current(&self) -> Result<Option<UserSession>, SessionError> {
        let guard = self.current.read().map_err(|_| SessionError::LockPoisoned)?;
        Ok(guard.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Bearer token of the logged-in user, if any.
    pub fn bearer_token(&self) -> Result<Option<String>, SessionError> {
        let guard = self.current.read().map_err(|_| SessionError::LockPoisoned)?;
        Ok(guard
            .as_ref()
            .and_then(|s| s.token.as_ref())
            .map(|t| t.expose().to_string()))
    }
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Stable id derived from the normalized email.
fn user_id_for(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("user-{hex}")
}

/// "jane.doe@plant.example" -> "Jane Doe"
fn display_name_for(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let words: Vec<String> = local
        .split(['.', '_', '-', '+'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        local.to_string()
    } else {
        words.join(" ")
    }
}
