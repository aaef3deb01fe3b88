//! Pseudonymous session identifiers for the emergency log.
//!
//! The log must let staff correlate repeat crises within a month without
//! storing raw session ids. Session ids are hashed with a salt that rotates
//! monthly, so the same session hashes identically within a month and
//! unlinkably across months.

use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::StoreError;

const SALT_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SaltFile {
    month: String,
    salt: String,
}

pub struct SessionHasher {
    path: PathBuf,
    state: Mutex<SaltFile>,
}

impl SessionHasher {
    /// Load the salt file, or create one for the current month.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let month = current_month();
        let state = match load_salt(path) {
            Some(existing) if existing.month == month => existing,
            _ => create_salt(path, &month)?,
        };
        Ok(Self {
            path: path.to_owned(),
            state: Mutex::new(state),
        })
    }

    /// Hash a session id under the current month's salt, rotating the salt
    /// first if the month has changed since the last call.
    pub fn hash(&self, session_id: &str) -> String {
        let mut state = self.state.lock();
        let month = current_month();
        if state.month != month {
            match create_salt(&self.path, &month) {
                Ok(fresh) => *state = fresh,
                Err(e) => {
                    // Rotate in memory anyway; an unreadable disk must not
                    // stop emergency logging.
                    warn!(error = %e, "salt rotation not persisted");
                    *state = SaltFile {
                        month,
                        salt: random_salt(),
                    };
                }
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(state.salt.as_bytes());
        hasher.update(b":");
        hasher.update(session_id.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

fn random_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn load_salt(path: &Path) -> Option<SaltFile> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding unreadable salt file");
            None
        }
    }
}

fn create_salt(path: &Path, month: &str) -> Result<SaltFile, StoreError> {
    let file = SaltFile {
        month: month.to_string(),
        salt: random_salt(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
    }
    let body = serde_json::to_string(&file)?;
    std::fs::write(path, body).map_err(|e| StoreError::Io(format!("write salt: {e}")))?;

    // Salt grants linkability within the month; keep it owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::Io(format!("salt permissions: {e}")))?;
    }

    info!(month = %file.month, "emergency log salt rotated");
    Ok(file)
}
