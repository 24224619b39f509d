//! Persistence for subscriptions.
//!
//! `ModelManager` owns the Postgres pool. It is created once at startup,
//! handed to the stores that need it and closed explicitly on shutdown.

mod memory;
mod postgres;
mod subscriber;

pub use memory::MemoryStore;
pub use postgres::PgSubscriptionStore;
pub use subscriber::{
    NewSubscriber, Preferences, StoreError, StoreResult, Subscriber, SubscriptionStore,
};

use sqlx::{postgres::PgPoolOptions, Connection, PgConnection, PgPool};
use tracing::info;

use crate::config::DbConfig;

#[derive(Clone, Debug)]
pub struct ModelManager {
    db: PgPool,
}

impl ModelManager {
    pub async fn init(db_config: &DbConfig) -> Result<Self> {
        info!("{:<20} - Initializing the DB pool", "init_db");

        let db_pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(db_config.acquire_timeout())
            .connect_with(db_config.connection_options())
            .await
            .map_err(Error::FailToCreatePool)?;

        Ok(Self { db: db_pool })
    }

    /// Runs the embedded migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<()> {
        info!("{:<20} - Running DB migrations", "migrate_db");
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }

    /// Creates the database named in `db_config`, connecting without selecting a database.
    pub async fn create_database(db_config: &DbConfig) -> Result<()> {
        let mut connection =
            PgConnection::connect_with(&db_config.connection_options_without_db()).await?;

        let sql = format!(r#"CREATE DATABASE "{}";"#, db_config.db_name);
        sqlx::query(&sql).execute(&mut connection).await?;
        connection.close().await?;

        Ok(())
    }

    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Waits for checked-out connections to come back and closes the pool.
    pub async fn close(&self) {
        info!("{:<20} - Closing the DB pool", "close_db");
        self.db.close().await;
    }
}

// ###################################
// ->   ERROR
// ###################################
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create db pool: {0}")]
    FailToCreatePool(#[source] sqlx::Error),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("sqlx migration error: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),
}
