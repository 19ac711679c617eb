//! Delivery webhook handlers

use axum::{extract::State, Json};
use courier_core::ProviderEvent;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Acknowledgement returned to the provider
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
}

/// Receive a provider delivery callback
///
/// POST /webhooks/delivery
///
/// Always acknowledges with 200 so the provider never retries: an event
/// the service cannot use is logged and dropped, not bounced back. The
/// body is taken raw for the same reason, a malformed payload must not
/// surface as an extractor rejection.
pub async fn receive_delivery(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Json<WebhookResponse> {
    let payload: ProviderEvent = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unparseable delivery webhook acknowledged and dropped: {}", e);
            return Json(WebhookResponse {
                received: true,
                event_id: None,
            });
        }
    };

    let outcome = state.ingestor.ingest(payload).await;

    Json(WebhookResponse {
        received: true,
        event_id: outcome.event_id,
    })
}
