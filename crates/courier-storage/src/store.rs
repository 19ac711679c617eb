//! Store contracts consumed by the dispatch and ingestion flows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::types::CampaignId;
use courier_common::Result;

use crate::models::{
    Campaign, CampaignStatus, CounterField, CreateCampaign, DeliveryEvent, NewDeliveryEvent,
};

/// Campaign persistence contract.
///
/// Status transitions are compare-and-swap on the campaign's version token;
/// counter updates are atomic in-place increments. These are the only two
/// write disciplines the dispatch and ingestion flows rely on to stay
/// correct under concurrent webhook bursts.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Create a campaign in draft status
    async fn create(&self, input: CreateCampaign) -> Result<Campaign>;

    /// Fetch a campaign by id
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;

    /// Transition a campaign's status, guarded by the version token.
    ///
    /// Returns the updated campaign, or `None` when the stored version no
    /// longer matches `expected_version` (a concurrent transition won).
    /// `sent_at` is stamped when provided and left untouched otherwise.
    async fn transition(
        &self,
        id: CampaignId,
        expected_version: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Campaign>>;

    /// Set the recipient count for a dispatch pass
    async fn set_recipient_count(&self, id: CampaignId, count: i32) -> Result<()>;

    /// Atomically add `delta` to one of the campaign's outcome counters
    async fn increment_counter(
        &self,
        id: CampaignId,
        field: CounterField,
        delta: i64,
    ) -> Result<()>;
}

/// Delivery event persistence contract (append-only log)
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a delivery event.
    ///
    /// Duplicate `(message_id, event_type)` pairs are suppressed: the call
    /// succeeds but returns `None`, so callers can tell a fresh event from
    /// a provider redelivery.
    async fn append(&self, event: NewDeliveryEvent) -> Result<Option<DeliveryEvent>>;

    /// All events recorded for a provider message id, oldest first
    async fn find_by_message_id(&self, message_id: &str) -> Result<Vec<DeliveryEvent>>;
}
