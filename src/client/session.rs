use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::client::ClientError;
use crate::models::UserProfile;

/// Key of the persisted session inside the storage file; other keys are
/// left untouched.
pub const SESSION_KEY: &str = "auth-storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: UserProfile,
    pub token: String,
}

/// Durable key/value JSON file holding the authenticated session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(entries).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| ClientError::Storage(e.to_string()))
    }

    /// Unreadable or malformed entries count as no session.
    pub fn load(&self) -> Option<StoredSession> {
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("session storage unreadable: {}", e);
                return None;
            }
        };
        serde_json::from_value(entries.remove(SESSION_KEY)?).ok()
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        let mut entries = self.read_all().unwrap_or_default();
        let value = serde_json::to_value(session).map_err(|e| ClientError::Storage(e.to_string()))?;
        entries.insert(SESSION_KEY.to_string(), value);
        self.write_all(&entries)
    }

    /// Removes the whole session entry.
    pub fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self.read_all().unwrap_or_default();
        if entries.remove(SESSION_KEY).is_none() {
            return Ok(());
        }
        self.write_all(&entries)
    }
}
