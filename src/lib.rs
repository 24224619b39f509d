//! A newsletter subscription service.
//!
//! `POST /api/newsletter/subscribe` validates and stores a subscriber in Postgres,
//! then announces it on a Redis pub/sub channel.

mod app;
pub mod config;
mod error;
pub mod events;
pub mod model;
pub mod subscribe;
pub mod web;

pub use app::{App, AppState, InternalState, Resources};
pub use error::{Error, Result};
pub use web::{serve, shutdown_signal};

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Human readable, colored output for development builds.
/// `RUST_LOG` takes precedence over the default filter.
pub fn init_dbg_tracing() {
    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("newsletter_api=debug,tower_http=info,info")),
        )
        .compact()
        .init();
}

/// One JSON object per line for release builds.
pub fn init_production_tracing() {
    tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
