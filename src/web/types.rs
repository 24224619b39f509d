//! Request and response bodies of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{model::Preferences, subscribe::SubscriptionReceipt};

/// Deserializable subscribe request.
/// Both fields may be absent, the workflow decides what is acceptable.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: SubscriptionData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

impl From<SubscriptionReceipt> for SubscribeResponse {
    fn from(receipt: SubscriptionReceipt) -> Self {
        Self {
            success: true,
            message: "Successfully subscribed to newsletter",
            data: SubscriptionData {
                email: receipt.email.into_inner(),
                subscribed_at: receipt.subscribed_at,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub database: DatabaseStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

impl From<bool> for DatabaseStatus {
    fn from(reachable: bool) -> Self {
        if reachable {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}
