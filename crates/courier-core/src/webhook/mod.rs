//! Webhook ingestion - provider delivery callbacks

mod ingestor;
mod mapping;

pub use ingestor::{
    BounceDetail, ClickDetail, ComplaintDetail, IngestOutcome, ProviderEvent, ProviderEventData,
    Recipients, WebhookIngestor,
};
pub use mapping::canonical_event_type;
