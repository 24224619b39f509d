//! Best-effort broadcast of subscription events over Redis pub/sub.

use async_trait::async_trait;
use fred::{
    interfaces::PubsubInterface,
    prelude::{ClientLike, Config, Pool},
    types::Builder,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::RedisConfig;

/// Payload announced on the subscribe channel.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewSubscriberEvent {
    pub email: String,
}

/// Something that can fan a payload out to whoever listens on `channel`.
/// No delivery guarantees beyond the call itself succeeding.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publisher connection error: {0}")]
    Connection(String),
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<fred::error::Error> for PublishError {
    fn from(value: fred::error::Error) -> Self {
        Self::Connection(value.to_string())
    }
}

/// Holds a Redis connection pool that is cheaply cloneable.
/// Built once at startup; every publish borrows the next pooled client instead of reconnecting.
#[derive(Clone, Debug)]
pub struct RedisPublisher {
    pool: Pool,
}

impl RedisPublisher {
    pub async fn init(redis_config: &RedisConfig) -> Result<Self, PublishError> {
        info!("{:<20} - Initializing the REDIS pool", "init_redis");
        let conf = Config::from_url(redis_config.uri.expose_secret())?;

        let connection_timeout = redis_config.connection_timeout();
        let pool = Builder::from_config(conf)
            .with_connection_config(|config| config.connection_timeout = connection_timeout)
            .build_pool(redis_config.pool_size.max(1))?;

        pool.init().await?;
        info!("{:<20} - connected to REDIS", "init_redis");

        Ok(RedisPublisher { pool })
    }

    /// Closes every pooled connection.
    pub async fn quit(&self) {
        info!("{:<20} - Closing the REDIS pool", "close_redis");
        if let Err(er) = self.pool.quit().await {
            debug!("{:<20} - {er}", "redis quit failed");
        }
    }
}

#[async_trait]
impl EventPublisher for RedisPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PublishError> {
        let receivers: i64 = self
            .pool
            .next()
            .publish(channel.to_string(), payload.to_string())
            .await?;
        debug!("{:<20} - '{channel}' reached {receivers} receivers", "publish");

        Ok(())
    }
}
