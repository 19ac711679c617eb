//! Courier Core - Campaign dispatch and delivery tracking
//!
//! This crate provides the campaign lifecycle orchestration, the bulk send
//! pass, the deferred-dispatch queue hand-off, and the webhook ingestion and
//! metrics aggregation path.

pub mod dispatch;
pub mod metrics;
pub mod queue;
pub mod transport;
pub mod webhook;

pub use dispatch::{
    BulkSender, CampaignSender, DirectSender, DispatchError, DispatchOrchestrator,
    DispatchOutcome, DispatchRequest, DispatchResult, QueuedSender, SendFailure, SendReport,
};
pub use metrics::MetricsAggregator;
pub use queue::{DispatchJob, PgQueueAdapter, QueueAdapter};
pub use transport::{HttpTransport, OutboundMessage, Transport, TransportError};
pub use webhook::{IngestOutcome, ProviderEvent, WebhookIngestor};
