use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Ordered back-references, oldest save first.
    pub saved_events: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            saved_events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_saved(&self, event_id: Uuid) -> bool {
        self.saved_events.contains(&event_id)
    }

    // bcrypt runs on the blocking pool
    pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
            .map_err(|e| ApiError::Internal(format!("hash failed: {e}")))
    }

    pub async fn verify_password(&self, password: String) -> bool {
        let hash = self.password_hash.clone();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .unwrap_or(false)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            saved_events: self.saved_events.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public shape of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub saved_events: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: u64,
    pub active_events: u64,
    pub saved_events: u64,
}
