//! Contains all the routes that this application can handle.

mod api;
mod health;
mod home;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    web::{Error, WebResult},
    AppState,
};

/// All the routes of the server
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .nest("/api", api_routes())
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .with_state(app_state)
}

/// API - Routes nested under "/api" path
fn api_routes() -> Router<AppState> {
    Router::new().nest("/newsletter", newsletter_routes())
}

/// NEWSLETTER - Routes nested under "/api/newsletter" path
fn newsletter_routes() -> Router<AppState> {
    Router::new().route("/subscribe", post(api::subscribe))
}

async fn route_not_found() -> WebResult<()> {
    Err(Error::RouteNotFound)
}
