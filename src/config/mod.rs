//! Builds an `AppConfig` from layered sources.
//!
//! Layers, lowest precedence first:
//! 1. `config/base.toml`
//! 2. `config/{local|production}.toml`, picked by `APP_ENVIRONMENT` (defaults to `local`)
//! 3. `APP_` prefixed env vars, nested with `__`, e.g. `APP_NET_CONFIG__APP_PORT=8000`
//! 4. The well-known `PORT`, `DATABASE_URL` and `REDIS_URL` env vars

mod error;
mod types;

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::SecretString;
use tracing::info;

// Re-export config structs
pub use error::{ConfigError, ConfigResult};
pub use types::{
    AppConfig, DbConfig, Environment, NetConfig, RedisConfig, SslRequire, WorkflowConfig,
};

impl AppConfig {
    /// Loads the configuration for the current process.
    /// Looks for the config files in `./config` relative to the current directory.
    pub fn load() -> ConfigResult<Self> {
        info!("{:<20} - Initializing the configuration", "AppConfig::load");
        let base_path = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        let config_dir = base_path.join("config");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()?;
        info!("{:<20} - {}", "environment", environment.as_ref());

        let mut config: AppConfig = Self::figment(&config_dir, environment).extract()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// The file and `APP_` env layers, without the well-known overrides.
    pub fn figment(config_dir: &Path, environment: Environment) -> Figment {
        let environment_filename = format!("{}.toml", environment.as_ref().to_lowercase());

        Figment::new()
            .merge(Toml::file(config_dir.join("base.toml")))
            .merge(Toml::file(config_dir.join(environment_filename)))
            .merge(Env::prefixed("APP_").split("__"))
    }

    /// Applies `PORT`, `DATABASE_URL` and `REDIS_URL`, looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.net_config.app_port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }

        if let Some(database_url) = lookup("DATABASE_URL") {
            let parsed = DbConfig::try_from(database_url.as_str())?;
            // Pool tuning is not part of the URL, keep what the files say.
            self.db_config = DbConfig {
                max_connections: self.db_config.max_connections,
                acquire_timeout_millis: self.db_config.acquire_timeout_millis,
                migrate_on_start: self.db_config.migrate_on_start,
                ..parsed
            };
        }

        if let Some(redis_url) = lookup("REDIS_URL") {
            self.redis_config.uri = SecretString::from(redis_url);
        }

        Ok(())
    }
}
