//! JSON shapes shared by the HTTP handlers and the client SDK.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::models::{DashboardStats, EventView, UserProfile};
use crate::query::Pagination;

/// `{ success, message?, data?, errors? }` wrapper around every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Envelope {
            success: true,
            message: None,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Envelope {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Envelope {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub event: EventView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListData {
    pub events: Vec<EventView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthData {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsData {
    pub stats: DashboardStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_generic_payload_and_missing_data() {
        let with_data: Envelope<SaveData> =
            serde_json::from_str(r#"{"success":true,"data":{"isSaved":true}}"#).unwrap();
        assert!(with_data.data.unwrap().is_saved);

        let bare: Envelope<EventData> =
            serde_json::from_str(r#"{"success":true,"message":"Event deleted successfully"}"#).unwrap();
        assert!(bare.data.is_none());
        assert!(bare.errors.is_empty());
    }

    #[test]
    fn message_only_envelope_omits_data() {
        let json = serde_json::to_value(Envelope::message("done")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "message": "done" }));
    }
}
