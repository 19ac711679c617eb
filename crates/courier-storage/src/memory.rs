//! In-memory store implementations
//!
//! Backs local development and the test suites with the same contracts as
//! the PostgreSQL stores. Writes take the lock for the whole mutation, so
//! counter increments and version checks behave like their SQL
//! counterparts under concurrent callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::types::CampaignId;
use courier_common::Result;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Campaign, CampaignStatus, CounterField, CreateCampaign, DeliveryEvent, NewDeliveryEvent,
};
use crate::store::{CampaignStore, EventStore};

/// Campaign store backed by a process-local map
#[derive(Default)]
pub struct MemoryCampaignStore {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
}

impl MemoryCampaignStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            subject: input.subject,
            from_address: input.from_address,
            from_name: input.from_name,
            reply_to: input.reply_to,
            html_body: input.html_body,
            text_body: input.text_body,
            status: CampaignStatus::Draft.to_string(),
            scheduled_at: input.scheduled_at,
            recipient_count: 0,
            sent_count: 0,
            opened_count: 0,
            clicked_count: 0,
            bounced_count: 0,
            unsubscribed_count: 0,
            version: 1,
            created_at: now,
            updated_at: now,
            sent_at: None,
        };

        let mut campaigns = self.campaigns.write().await;
        campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn transition(
        &self,
        id: CampaignId,
        expected_version: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Campaign>> {
        let mut campaigns = self.campaigns.write().await;
        let Some(campaign) = campaigns.get_mut(&id) else {
            return Ok(None);
        };

        if campaign.version != expected_version {
            return Ok(None);
        }

        campaign.status = status.to_string();
        if sent_at.is_some() {
            campaign.sent_at = sent_at;
        }
        campaign.version += 1;
        campaign.updated_at = Utc::now();

        Ok(Some(campaign.clone()))
    }

    async fn set_recipient_count(&self, id: CampaignId, count: i32) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        if let Some(campaign) = campaigns.get_mut(&id) {
            campaign.recipient_count = count;
            campaign.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_counter(
        &self,
        id: CampaignId,
        field: CounterField,
        delta: i64,
    ) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        if let Some(campaign) = campaigns.get_mut(&id) {
            let counter = match field {
                CounterField::Sent => &mut campaign.sent_count,
                CounterField::Opened => &mut campaign.opened_count,
                CounterField::Clicked => &mut campaign.clicked_count,
                CounterField::Bounced => &mut campaign.bounced_count,
                CounterField::Unsubscribed => &mut campaign.unsubscribed_count,
            };
            *counter += delta as i32;
            campaign.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Delivery event store backed by a process-local log
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<EventLog>,
}

#[derive(Default)]
struct EventLog {
    events: Vec<DeliveryEvent>,
    seen: HashSet<(String, String)>,
}

impl MemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded events
    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.events.is_empty()
    }

    /// Snapshot of all recorded events, oldest first
    pub async fn all(&self) -> Vec<DeliveryEvent> {
        self.inner.read().await.events.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewDeliveryEvent) -> Result<Option<DeliveryEvent>> {
        let mut log = self.inner.write().await;

        let key = (event.message_id.clone(), event.event_type.to_string());
        if !log.seen.insert(key) {
            return Ok(None);
        }

        let stored = DeliveryEvent {
            id: Uuid::new_v4(),
            campaign_id: event.campaign_id,
            message_id: event.message_id,
            recipient: event.recipient,
            event_type: event.event_type.to_string(),
            metadata: event.metadata,
            occurred_at: event.occurred_at,
            created_at: Utc::now(),
        };

        log.events.push(stored.clone());
        Ok(Some(stored))
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Vec<DeliveryEvent>> {
        let log = self.inner.read().await;
        Ok(log
            .events
            .iter()
            .filter(|e| e.message_id == message_id)
            .cloned()
            .collect())
    }
}
