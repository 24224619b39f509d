use std::{net::SocketAddr, sync::Arc};

use derive_more::Deref;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::AppConfig,
    events::{EventPublisher, RedisPublisher},
    model::{ModelManager, PgSubscriptionStore, SubscriptionStore},
    subscribe::SubscribeWorkflow,
    Result,
};

// ###################################
// ->  Structs
// ###################################
pub struct App {
    pub app_state: AppState,
    pub listener: TcpListener,
    /// Pools owned by this process, released after the server stops.
    /// `None` when the caller manages its own store and publisher.
    pub resources: Option<Resources>,
}

impl App {
    pub fn new(app_state: AppState, listener: TcpListener) -> Self {
        App {
            app_state,
            listener,
            resources: None,
        }
    }

    /// Connects to Postgres and Redis and binds the listener.
    /// Any failure here is fatal to startup.
    pub async fn build_from_config(config: AppConfig) -> Result<Self> {
        let model_mgr = ModelManager::init(&config.db_config).await?;
        if config.db_config.migrate_on_start {
            model_mgr.migrate().await?;
        }

        let publisher = match RedisPublisher::init(&config.redis_config).await {
            Ok(publisher) => publisher,
            Err(er) => {
                model_mgr.close().await;
                return Err(er.into());
            }
        };

        let workflow = SubscribeWorkflow::new(
            Arc::new(PgSubscriptionStore::new(model_mgr.clone())) as Arc<dyn SubscriptionStore>,
            Arc::new(publisher.clone()) as Arc<dyn EventPublisher>,
            config.redis_config.channel.clone(),
            config.workflow_config,
        );
        let app_state = AppState::new(workflow, config.net_config.expose_error_details);

        let addr = SocketAddr::from((config.net_config.host, config.net_config.app_port));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("{:<20} - {}", "Listening on:", addr);

        Ok(App {
            app_state,
            listener,
            resources: Some(Resources {
                model_mgr,
                publisher,
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Process-wide connection pools, explicitly initialized and explicitly torn down.
pub struct Resources {
    model_mgr: ModelManager,
    publisher: RedisPublisher,
}

impl Resources {
    pub async fn release(self) {
        self.publisher.quit().await;
        self.model_mgr.close().await;
    }
}

pub struct InternalState {
    pub workflow: SubscribeWorkflow,
    pub expose_error_details: bool,
}

/// Application state containing all global data.
/// It implements `Deref` to easily access the fields on `InternalState`
/// Uses an `Arc` so it can be cloned around.
#[derive(Clone, Deref)]
pub struct AppState(Arc<InternalState>);

impl AppState {
    pub fn new(workflow: SubscribeWorkflow, expose_error_details: bool) -> Self {
        AppState(Arc::new(InternalState {
            workflow,
            expose_error_details,
        }))
    }
}
