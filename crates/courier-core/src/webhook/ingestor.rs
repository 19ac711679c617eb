//! Webhook ingestor - provider callbacks into the delivery event log

use chrono::{DateTime, Utc};
use courier_common::types::EventId;
use courier_common::{Error, Result};
use courier_storage::models::NewDeliveryEvent;
use courier_storage::store::EventStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::mapping::canonical_event_type;
use crate::metrics::MetricsAggregator;

/// Provider webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: ProviderEventData,
}

/// Payload detail block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEventData {
    pub email_id: Option<String>,
    #[serde(default)]
    pub to: Recipients,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub click: Option<ClickDetail>,
    pub bounce: Option<BounceDetail>,
    pub complaint: Option<ComplaintDetail>,
}

/// The provider sends `to` as either one address or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

impl Recipients {
    /// First address, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            Recipients::One(address) => Some(address),
            Recipients::Many(addresses) => addresses.first().map(String::as_str),
        }
    }
}

/// Click detail attached to `clicked` events
#[derive(Debug, Clone, Deserialize)]
pub struct ClickDetail {
    pub link: Option<String>,
    pub timestamp: Option<String>,
}

/// Bounce detail attached to `bounced` events
#[derive(Debug, Clone, Deserialize)]
pub struct BounceDetail {
    pub reason: Option<String>,
    #[serde(rename = "type")]
    pub bounce_type: Option<String>,
}

/// Complaint detail attached to `complained` events
#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintDetail {
    pub feedback_type: Option<String>,
}

/// What the webhook boundary reports back to the provider
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub accepted: bool,
    pub event_id: Option<EventId>,
}

/// Receives provider delivery callbacks and appends canonical events.
///
/// The boundary never signals failure to the provider: internal errors are
/// logged and swallowed so a broken ingestion path cannot trigger a provider
/// retry storm. Duplicate deliveries are suppressed by the event store.
pub struct WebhookIngestor {
    events: Arc<dyn EventStore>,
    metrics: MetricsAggregator,
}

impl WebhookIngestor {
    /// Create a new ingestor
    pub fn new(events: Arc<dyn EventStore>, metrics: MetricsAggregator) -> Self {
        Self { events, metrics }
    }

    /// Ingest one provider callback. Always acknowledges.
    pub async fn ingest(&self, payload: ProviderEvent) -> IngestOutcome {
        match self.try_ingest(payload).await {
            Ok(event_id) => IngestOutcome {
                accepted: true,
                event_id,
            },
            Err(e) => {
                warn!("Delivery event dropped: {}", e);
                IngestOutcome {
                    accepted: true,
                    event_id: None,
                }
            }
        }
    }

    async fn try_ingest(&self, payload: ProviderEvent) -> Result<Option<EventId>> {
        let Some(event_type) = canonical_event_type(&payload.event_type) else {
            debug!(provider_type = %payload.event_type, "unknown event type acknowledged and dropped");
            return Ok(None);
        };

        let message_id = payload
            .data
            .email_id
            .clone()
            .ok_or_else(|| Error::Ingestion("payload carries no email_id".to_string()))?;

        // Correlation by replay: any earlier event for this message that
        // knows its campaign settles the question. The send-time `sent`
        // event recorded by the bulk sender is normally that event.
        let prior = self.events.find_by_message_id(&message_id).await?;
        let campaign_id = prior.iter().find_map(|e| e.campaign_id);

        let recipient = payload
            .data
            .to
            .first()
            .map(str::to_string)
            .or_else(|| prior.first().map(|e| e.recipient.clone()))
            .unwrap_or_default();

        let event = NewDeliveryEvent {
            campaign_id,
            message_id,
            recipient,
            event_type,
            metadata: Self::metadata(&payload),
            occurred_at: payload.created_at.unwrap_or_else(Utc::now),
        };

        let Some(stored) = self.events.append(event).await? else {
            debug!(provider_type = %payload.event_type, "duplicate delivery suppressed");
            return Ok(None);
        };

        self.metrics.apply(&stored).await?;

        Ok(Some(stored.id))
    }

    fn metadata(payload: &ProviderEvent) -> serde_json::Value {
        let mut metadata = serde_json::Map::new();

        if let Some(ref subject) = payload.data.subject {
            metadata.insert("subject".to_string(), serde_json::json!(subject));
        }
        if let Some(ref from) = payload.data.from {
            metadata.insert("from".to_string(), serde_json::json!(from));
        }
        if let Some(ref click) = payload.data.click {
            metadata.insert(
                "click".to_string(),
                serde_json::json!({ "link": click.link, "timestamp": click.timestamp }),
            );
        }
        if let Some(ref bounce) = payload.data.bounce {
            metadata.insert(
                "bounce".to_string(),
                serde_json::json!({ "reason": bounce.reason, "type": bounce.bounce_type }),
            );
        }
        if let Some(ref complaint) = payload.data.complaint {
            metadata.insert(
                "complaint".to_string(),
                serde_json::json!({ "feedback_type": complaint.feedback_type }),
            );
        }

        serde_json::Value::Object(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_storage::memory::{MemoryCampaignStore, MemoryEventStore};
    use courier_storage::models::{CreateCampaign, DeliveryEventType};
    use courier_storage::store::CampaignStore;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    struct Fixture {
        campaigns: Arc<MemoryCampaignStore>,
        events: Arc<MemoryEventStore>,
        ingestor: WebhookIngestor,
    }

    impl Fixture {
        fn new() -> Self {
            let campaigns = Arc::new(MemoryCampaignStore::new());
            let events = Arc::new(MemoryEventStore::new());
            let ingestor = WebhookIngestor::new(
                events.clone(),
                MetricsAggregator::new(campaigns.clone()),
            );
            Self {
                campaigns,
                events,
                ingestor,
            }
        }

        /// Create a campaign and record its send-time `sent` event, the way
        /// the bulk sender does.
        async fn sent_campaign(&self, message_id: &str) -> Uuid {
            let campaign = self
                .campaigns
                .create(CreateCampaign {
                    subject: "Launch day".to_string(),
                    from_address: "news@example.com".to_string(),
                    from_name: None,
                    reply_to: None,
                    html_body: Some("<p>hi</p>".to_string()),
                    text_body: None,
                    scheduled_at: None,
                })
                .await
                .unwrap();

            self.events
                .append(courier_storage::models::NewDeliveryEvent {
                    campaign_id: Some(campaign.id),
                    message_id: message_id.to_string(),
                    recipient: "alice@example.com".to_string(),
                    event_type: DeliveryEventType::Sent,
                    metadata: serde_json::json!({}),
                    occurred_at: Utc::now(),
                })
                .await
                .unwrap();

            campaign.id
        }
    }

    fn payload(event_type: &str, email_id: &str) -> ProviderEvent {
        serde_json::from_value(serde_json::json!({
            "type": event_type,
            "created_at": "2024-03-01T12:00:00Z",
            "data": {
                "email_id": email_id,
                "to": ["alice@example.com"],
                "subject": "Launch day",
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_type_is_acknowledged_and_dropped() {
        let fixture = Fixture::new();

        let outcome = fixture
            .ingestor
            .ingest(payload("contact.created", "msg-1"))
            .await;

        assert!(outcome.accepted);
        assert!(outcome.event_id.is_none());
        assert!(fixture.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_opened_event_increments_campaign_counter() {
        let fixture = Fixture::new();
        let campaign_id = fixture.sent_campaign("msg-1").await;

        let outcome = fixture.ingestor.ingest(payload("email.opened", "msg-1")).await;
        assert!(outcome.accepted);
        assert!(outcome.event_id.is_some());

        let campaign = fixture.campaigns.get(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.opened_count, 1);
        assert_eq!(campaign.clicked_count, 0);
        assert_eq!(campaign.bounced_count, 0);
        assert_eq!(campaign.unsubscribed_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_does_not_double_count() {
        // The source this design replaces appended unconditionally and
        // double-counted provider retries; the unique (message_id, type)
        // constraint closes that gap.
        let fixture = Fixture::new();
        let campaign_id = fixture.sent_campaign("msg-1").await;

        let first = fixture.ingestor.ingest(payload("email.opened", "msg-1")).await;
        let second = fixture.ingestor.ingest(payload("email.opened", "msg-1")).await;

        assert!(first.accepted && second.accepted);
        assert!(first.event_id.is_some());
        assert!(second.event_id.is_none());

        let campaign = fixture.campaigns.get(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.opened_count, 1);
    }

    #[tokio::test]
    async fn test_correlation_by_send_time_event() {
        let fixture = Fixture::new();
        let campaign_id = fixture.sent_campaign("msg-1").await;

        fixture.ingestor.ingest(payload("email.clicked", "msg-1")).await;

        let recorded = fixture.events.find_by_message_id("msg-1").await.unwrap();
        let clicked = recorded
            .iter()
            .find(|e| e.event_type == "clicked")
            .unwrap();
        assert_eq!(clicked.campaign_id, Some(campaign_id));
    }

    #[tokio::test]
    async fn test_uncorrelated_message_is_still_recorded() {
        let fixture = Fixture::new();

        let outcome = fixture
            .ingestor
            .ingest(payload("email.delivered", "msg-unknown"))
            .await;

        assert!(outcome.accepted);
        assert!(outcome.event_id.is_some());

        let recorded = fixture.events.find_by_message_id("msg-unknown").await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].campaign_id, None);
    }

    #[tokio::test]
    async fn test_missing_email_id_is_swallowed() {
        let fixture = Fixture::new();

        let payload: ProviderEvent = serde_json::from_value(serde_json::json!({
            "type": "email.opened",
            "created_at": "2024-03-01T12:00:00Z",
            "data": {}
        }))
        .unwrap();

        let outcome = fixture.ingestor.ingest(payload).await;
        assert!(outcome.accepted);
        assert!(outcome.event_id.is_none());
        assert!(fixture.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_bounce_detail_lands_in_metadata() {
        let fixture = Fixture::new();
        fixture.sent_campaign("msg-1").await;

        let payload: ProviderEvent = serde_json::from_value(serde_json::json!({
            "type": "email.bounced",
            "created_at": "2024-03-01T12:00:00Z",
            "data": {
                "email_id": "msg-1",
                "to": "alice@example.com",
                "bounce": { "reason": "mailbox full", "type": "soft" }
            }
        }))
        .unwrap();

        fixture.ingestor.ingest(payload).await;

        let recorded = fixture.events.find_by_message_id("msg-1").await.unwrap();
        let bounced = recorded.iter().find(|e| e.event_type == "bounced").unwrap();
        assert_eq!(bounced.metadata["bounce"]["reason"], serde_json::json!("mailbox full"));
        assert_eq!(bounced.recipient, "alice@example.com");
    }

    #[tokio::test]
    async fn test_delayed_delivery_ingests_as_bounce() {
        let fixture = Fixture::new();
        let campaign_id = fixture.sent_campaign("msg-1").await;

        fixture
            .ingestor
            .ingest(payload("email.delivery_delayed", "msg-1"))
            .await;

        let campaign = fixture.campaigns.get(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.bounced_count, 1);
    }
}
