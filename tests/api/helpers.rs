use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use newsletter_api::{
    config::WorkflowConfig,
    events::{EventPublisher, PublishError},
    init_dbg_tracing,
    model::{MemoryStore, SubscriptionStore},
    subscribe::{SubscribeWorkflow, SUBSCRIBE_CHANNEL},
    App, AppState,
};
use reqwest::Response;
use serde_json::Value;
use tokio::net::TcpListener;

/// Trying to bind port 0 will trigger an OS scan for an available port
/// which will then be bound to the application.
const TEST_SOCK_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 0);

const TEST_WORKFLOW_CONFIG: WorkflowConfig = WorkflowConfig {
    store_timeout_millis: 200,
    publish_timeout_millis: 100,
};

fn _init_test_subscriber() {
    static SUBSCRIBER: OnceLock<()> = OnceLock::new();
    SUBSCRIBER.get_or_init(|| {
        init_dbg_tracing();
    });
}

/// Records every publish, or refuses them all when `failing` is set.
#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), PublishError> {
        if self.failing {
            return Err(PublishError::Connection("broker unreachable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((channel.to_string(), payload.to_string()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub http_client: reqwest::Client,
    pub store: MemoryStore,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(MemoryStore::new(), RecordingPublisher::default(), false).await
    }

    /// Serves the full router on a random port with the given store and publisher.
    pub async fn spawn_with(
        store: MemoryStore,
        publisher: RecordingPublisher,
        expose_error_details: bool,
    ) -> Result<Self> {
        // _init_test_subscriber();

        let publisher = Arc::new(publisher);
        let workflow = SubscribeWorkflow::new(
            Arc::new(store.clone()) as Arc<dyn SubscriptionStore>,
            publisher.clone() as Arc<dyn EventPublisher>,
            SUBSCRIBE_CHANNEL,
            TEST_WORKFLOW_CONFIG,
        );
        let app_state = AppState::new(workflow, expose_error_details);

        let listener = TcpListener::bind(TEST_SOCK_ADDR).await?;
        let addr = listener.local_addr()?;
        let app = App::new(app_state, listener);

        tokio::spawn(newsletter_api::serve(app, std::future::pending()));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(TestApp {
            addr,
            http_client,
            store,
            publisher,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn post_subscribe(&self, body: &Value) -> Result<Response> {
        let res = self
            .http_client
            .post(self.url("/api/newsletter/subscribe"))
            .json(body)
            .send()
            .await?;
        Ok(res)
    }
}
