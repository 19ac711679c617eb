//! Courier - campaign dispatch service entry point

use anyhow::Result;
use courier_api::AppState;
use courier_common::config::Config;
use courier_core::{
    BulkSender, CampaignSender, DirectSender, DispatchOrchestrator, HttpTransport,
    MetricsAggregator, PgQueueAdapter, QueuedSender, Transport, WebhookIngestor,
};
use courier_storage::db::DatabasePool;
use courier_storage::postgres::{PgCampaignStore, PgEventStore};
use courier_storage::store::{CampaignStore, EventStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Courier dispatch service...");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    let campaigns: Arc<dyn CampaignStore> =
        Arc::new(PgCampaignStore::new(db_pool.pool().clone()));
    let events: Arc<dyn EventStore> = Arc::new(PgEventStore::new(db_pool.pool().clone()));
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.transport));

    // Sender strategy is fixed at startup: queued hand-off or an
    // in-process send pass.
    let sender: Arc<dyn CampaignSender> = if config.dispatch.use_queue {
        info!("Dispatch strategy: queued");
        Arc::new(QueuedSender::new(Arc::new(PgQueueAdapter::new(
            db_pool.pool().clone(),
        ))))
    } else {
        info!("Dispatch strategy: direct");
        Arc::new(DirectSender::new(BulkSender::new(
            campaigns.clone(),
            events.clone(),
            transport,
            Duration::from_millis(config.dispatch.throttle_ms),
        )))
    };

    let orchestrator = Arc::new(DispatchOrchestrator::new(
        campaigns.clone(),
        sender,
        config.dispatch.max_recipients,
    ));
    let ingestor = Arc::new(WebhookIngestor::new(
        events,
        MetricsAggregator::new(campaigns.clone()),
    ));

    let state = Arc::new(AppState {
        campaigns,
        orchestrator,
        ingestor,
        db_pool: Some(db_pool),
    });

    let app = courier_api::create_router(state);
    let bind = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Starting API server on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Courier shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,courier=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
