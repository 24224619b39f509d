use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NewSubscriber, StoreError, StoreResult, Subscriber, SubscriptionStore};
use crate::subscribe::ValidEmail;

/// A process-local `SubscriptionStore`.
///
/// Check-and-insert happens under a single lock, so `create` upholds the uniqueness invariant
/// the same way the Postgres unique index does. Cheap to clone, clones share the records.
/// Can be switched unavailable or slowed down to exercise failure paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<ValidEmail, Subscriber>>>,
    unavailable: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before touching the records.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of store operations attempted so far, `ping` excluded.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    async fn enter(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_by_email(&self, email: &ValidEmail) -> StoreResult<Option<Subscriber>> {
        self.enter().await?;
        Ok(self.records.lock().await.get(email).cloned())
    }

    async fn create(&self, new_subscriber: NewSubscriber) -> StoreResult<Subscriber> {
        self.enter().await?;
        let mut records = self.records.lock().await;

        if records.contains_key(&new_subscriber.email) {
            return Err(StoreError::UniqueViolation);
        }

        let now = Utc::now();
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: new_subscriber.email,
            is_active: true,
            subscribed_at: new_subscriber.subscribed_at,
            preferences: new_subscriber.preferences,
            created_at: now,
            updated_at: now,
        };
        records.insert(subscriber.email.clone(), subscriber.clone());

        Ok(subscriber)
    }

    async fn set_active(
        &self,
        email: &ValidEmail,
        active: bool,
    ) -> StoreResult<Option<Subscriber>> {
        self.enter().await?;
        let mut records = self.records.lock().await;

        let updated = records.get_mut(email).map(|subscriber| {
            subscriber.is_active = active;
            subscriber.updated_at = Utc::now();
            subscriber.clone()
        });

        Ok(updated)
    }

    async fn ping(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}
