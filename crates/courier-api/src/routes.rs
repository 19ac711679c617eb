//! API routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{campaigns, health, webhooks};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Health check routes
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    // Campaign routes
    let campaign_routes = Router::new()
        .route("/", post(campaigns::create_campaign))
        .route("/:campaign_id", get(campaigns::get_campaign))
        .route("/:campaign_id/send", post(campaigns::send_campaign));

    let api_v1 = Router::new()
        .nest("/campaigns", campaign_routes)
        .with_state(state.clone());

    // Provider callback routes, outside the versioned API surface
    let webhook_routes = Router::new()
        .route("/delivery", post(webhooks::receive_delivery))
        .with_state(state);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
}
