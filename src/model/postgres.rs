use async_trait::async_trait;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::{
    ModelManager, NewSubscriber, StoreError, StoreResult, Subscriber, SubscriptionStore,
};
use crate::subscribe::ValidEmail;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// `SubscriptionStore` on top of the `newsletter_subscriptions` table.
/// The `UNIQUE` constraint on `email` is what keeps concurrent inserts honest.
#[derive(Clone, Debug)]
pub struct PgSubscriptionStore {
    model_mgr: ModelManager,
}

impl PgSubscriptionStore {
    pub fn new(model_mgr: ModelManager) -> Self {
        Self { model_mgr }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    #[tracing::instrument(name = "Looking up subscriber", skip(self))]
    async fn find_by_email(&self, email: &ValidEmail) -> StoreResult<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"SELECT id, email, is_active, subscribed_at, preferences, created_at, updated_at
            FROM newsletter_subscriptions
            WHERE email = $1"#,
        )
        .bind(email.as_ref())
        .fetch_optional(self.model_mgr.db())
        .await?;

        Ok(subscriber)
    }

    #[tracing::instrument(
        name = "Saving new subscriber to the database",
        skip(self, new_subscriber),
        fields(subscriber_email = %new_subscriber.email)
    )]
    async fn create(&self, new_subscriber: NewSubscriber) -> StoreResult<Subscriber> {
        let query_result = sqlx::query_as::<_, Subscriber>(
            r#"INSERT INTO newsletter_subscriptions (id, email, is_active, subscribed_at, preferences)
            VALUES ($1, $2, TRUE, $3, $4)
            RETURNING id, email, is_active, subscribed_at, preferences, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(new_subscriber.email.as_ref())
        .bind(new_subscriber.subscribed_at)
        .bind(Json(&new_subscriber.preferences))
        .fetch_one(self.model_mgr.db())
        .await;

        query_result.map_err(map_write_error)
    }

    #[tracing::instrument(name = "Toggling subscriber activity", skip(self))]
    async fn set_active(
        &self,
        email: &ValidEmail,
        active: bool,
    ) -> StoreResult<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"UPDATE newsletter_subscriptions
            SET is_active = $2, updated_at = now()
            WHERE email = $1
            RETURNING id, email, is_active, subscribed_at, preferences, created_at, updated_at"#,
        )
        .bind(email.as_ref())
        .bind(active)
        .fetch_optional(self.model_mgr.db())
        .await?;

        Ok(subscriber)
    }

    async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(self.model_mgr.db()).await {
            Ok(_) => true,
            Err(er) => {
                debug!("{:<20} - {er}", "db ping failed");
                false
            }
        }
    }
}

/// Separates a unique-constraint violation from every other database failure.
fn map_write_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(er) if er.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation
        }
        _ => StoreError::Sqlx(error),
    }
}
