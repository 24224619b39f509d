//! The subscribe-and-notify workflow.
//!
//! For a single request: validate and normalize the email, run the advisory duplicate check,
//! persist the record and, once it is committed, announce it on the event channel.
//! Publishing is best-effort: a failed or slow publish is logged and the subscription stands.

mod email;

pub use email::{EmailError, ValidEmail};

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    config::WorkflowConfig,
    events::{EventPublisher, NewSubscriberEvent, PublishError},
    model::{NewSubscriber, Preferences, StoreError, SubscriptionStore},
};

/// Channel every new subscription is announced on.
pub const SUBSCRIBE_CHANNEL: &str = "newsletter:subscribe";

// ###################################
// ->  STRUCTS
// ###################################
/// What the caller gets back from a successful subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionReceipt {
    pub email: ValidEmail,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SubscribeWorkflow {
    store: Arc<dyn SubscriptionStore>,
    publisher: Arc<dyn EventPublisher>,
    channel: String,
    store_timeout: Duration,
    publish_timeout: Duration,
}

impl SubscribeWorkflow {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        publisher: Arc<dyn EventPublisher>,
        channel: impl Into<String>,
        workflow_config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            channel: channel.into(),
            store_timeout: workflow_config.store_timeout(),
            publish_timeout: workflow_config.publish_timeout(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    #[tracing::instrument(name = "Subscribing to the newsletter", skip(self, email, preferences))]
    pub async fn subscribe(
        &self,
        email: Option<&str>,
        preferences: Option<Preferences>,
    ) -> Result<SubscriptionReceipt, SubscribeError> {
        let email = ValidEmail::parse(email.unwrap_or_default())?;

        // Advisory only. The store's unique constraint settles races below.
        let existing = self
            .with_store_timeout("find_by_email", self.store.find_by_email(&email))
            .await?;
        match existing {
            Some(subscriber) if subscriber.is_active => {
                return Err(SubscribeError::AlreadySubscribed)
            }
            // An inactive record is not reactivated, the insert below decides.
            Some(_) => info!("{:<20} - found an inactive subscription", "subscribe"),
            None => {}
        }

        let subscriber = self
            .with_store_timeout(
                "create",
                self.store.create(NewSubscriber::new(email, preferences)),
            )
            .await
            .map_err(|er| match er {
                SubscribeError::Store(StoreError::UniqueViolation) => {
                    SubscribeError::DuplicateOnWrite
                }
                er => er,
            })?;
        info!("{:<20} - new subscriber persisted", "subscribe");

        self.announce(&subscriber.email).await;

        Ok(SubscriptionReceipt {
            email: subscriber.email,
            subscribed_at: subscriber.subscribed_at,
        })
    }

    /// Publishes the new-subscriber event. Never fails, the record is already committed.
    async fn announce(&self, email: &ValidEmail) {
        let event = NewSubscriberEvent {
            email: email.to_string(),
        };

        let publish = async {
            match serde_json::to_string(&event) {
                Ok(payload) => self.publisher.publish(&self.channel, &payload).await,
                Err(er) => Err(PublishError::from(er)),
            }
        };

        match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(Ok(())) => info!("{:<20} - event published on '{}'", "announce", self.channel),
            Ok(Err(er)) => warn!(
                error = %er,
                "{:<20} - failed to publish the new subscriber event",
                "announce"
            ),
            Err(_) => warn!(
                timeout = ?self.publish_timeout,
                "{:<20} - publishing the new subscriber event timed out",
                "announce"
            ),
        }
    }

    async fn with_store_timeout<T, F>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<T, SubscribeError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| SubscribeError::Timeout {
                operation,
                after: self.store_timeout,
            })?
            .map_err(SubscribeError::Store)
    }
}

// ###################################
// ->  ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("validation error: {0}")]
    Validation(#[from] EmailError),
    #[error("email is already actively subscribed")]
    AlreadySubscribed,
    #[error("email was subscribed concurrently")]
    DuplicateOnWrite,
    #[error("store call '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("store error: {0}")]
    Store(StoreError),
}
