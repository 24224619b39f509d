//! The subscriber record and the `SubscriptionStore` contract every backend implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::subscribe::ValidEmail;

pub type Preferences = Map<String, Value>;

// ###################################
// ->  STRUCTS
// ###################################
/// A persisted newsletter subscription. One per normalized email.
///
/// The `newsletter_subscriptions` table is owned by this service: every row is written through
/// `ValidEmail`, so `email` is decoded strictly and a row that fails the pattern is a decode error.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub email: ValidEmail,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    #[sqlx(json)]
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to create a `Subscriber`. The store assigns the id and bookkeeping timestamps.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: ValidEmail,
    pub preferences: Preferences,
    pub subscribed_at: DateTime<Utc>,
}

impl NewSubscriber {
    pub fn new(email: ValidEmail, preferences: Option<Preferences>) -> Self {
        Self {
            email,
            preferences: preferences.unwrap_or_default(),
            subscribed_at: Utc::now(),
        }
    }
}

// ###################################
// ->  STORE
// ###################################
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Durable keyed storage for subscriptions.
///
/// Implementations must make `create` atomic with respect to the email uniqueness invariant:
/// of any number of concurrent `create` calls for the same email exactly one succeeds,
/// every other one gets `StoreError::UniqueViolation`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_email(&self, email: &ValidEmail) -> StoreResult<Option<Subscriber>>;

    async fn create(&self, new_subscriber: NewSubscriber) -> StoreResult<Subscriber>;

    /// Deactivates or reactivates a subscription.
    /// Returns `None` if there is no subscription for `email`.
    async fn set_active(&self, email: &ValidEmail, active: bool)
        -> StoreResult<Option<Subscriber>>;

    /// `true` if the backend is reachable.
    async fn ping(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a subscription for this email already exists")]
    UniqueViolation,
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
