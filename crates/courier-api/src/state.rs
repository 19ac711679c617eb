//! Shared API state

use courier_core::{DispatchOrchestrator, WebhookIngestor};
use courier_storage::db::DatabasePool;
use courier_storage::store::CampaignStore;
use std::sync::Arc;

/// State shared by all request handlers.
///
/// `db_pool` is absent when the service runs against the in-memory
/// backend; the readiness probe then reports ready unconditionally.
pub struct AppState {
    pub campaigns: Arc<dyn CampaignStore>,
    pub orchestrator: Arc<DispatchOrchestrator>,
    pub ingestor: Arc<WebhookIngestor>,
    pub db_pool: Option<DatabasePool>,
}
