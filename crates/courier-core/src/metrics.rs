//! Metrics aggregation - campaign counters driven by delivery events

use courier_storage::models::{CounterField, DeliveryEvent, DeliveryEventType};
use courier_storage::store::CampaignStore;
use std::sync::Arc;
use tracing::debug;

/// Updates campaign counters in response to ingested delivery events.
///
/// Every update is a single atomic increment on the store; concurrent
/// webhook deliveries for the same campaign never lose counts.
pub struct MetricsAggregator {
    campaigns: Arc<dyn CampaignStore>,
}

impl MetricsAggregator {
    /// Create a new aggregator
    pub fn new(campaigns: Arc<dyn CampaignStore>) -> Self {
        Self { campaigns }
    }

    /// Apply one delivery event to its campaign's counters.
    ///
    /// Events without a resolved campaign, and event types that are not
    /// counted outcomes, are no-ops.
    pub async fn apply(&self, event: &DeliveryEvent) -> courier_common::Result<()> {
        let Some(campaign_id) = event.campaign_id else {
            debug!(message_id = %event.message_id, "event has no campaign, skipping counters");
            return Ok(());
        };

        let field = match event.event_type_enum() {
            Some(DeliveryEventType::Opened) => CounterField::Opened,
            Some(DeliveryEventType::Clicked) => CounterField::Clicked,
            Some(DeliveryEventType::Bounced) => CounterField::Bounced,
            Some(DeliveryEventType::Unsubscribed) => CounterField::Unsubscribed,
            _ => return Ok(()),
        };

        self.campaigns.increment_counter(campaign_id, field, 1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_storage::memory::MemoryCampaignStore;
    use courier_storage::models::{Campaign, CreateCampaign};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    async fn campaign(store: &MemoryCampaignStore) -> Campaign {
        store
            .create(CreateCampaign {
                subject: "Hello".to_string(),
                from_address: "news@example.com".to_string(),
                from_name: None,
                reply_to: None,
                html_body: None,
                text_body: Some("hello".to_string()),
                scheduled_at: None,
            })
            .await
            .unwrap()
    }

    fn event(campaign_id: Option<Uuid>, event_type: &str) -> DeliveryEvent {
        DeliveryEvent {
            id: Uuid::new_v4(),
            campaign_id,
            message_id: "msg-1".to_string(),
            recipient: "alice@example.com".to_string(),
            event_type: event_type.to_string(),
            metadata: serde_json::json!({}),
            occurred_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_counted_outcome_increments_exactly_one_counter() {
        let store = Arc::new(MemoryCampaignStore::new());
        let campaign = campaign(&store).await;
        let aggregator = MetricsAggregator::new(store.clone());

        aggregator
            .apply(&event(Some(campaign.id), "opened"))
            .await
            .unwrap();

        let current = store.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(current.opened_count, 1);
        assert_eq!(current.clicked_count, 0);
        assert_eq!(current.bounced_count, 0);
        assert_eq!(current.unsubscribed_count, 0);
    }

    #[tokio::test]
    async fn test_uncounted_outcome_is_a_noop() {
        let store = Arc::new(MemoryCampaignStore::new());
        let campaign = campaign(&store).await;
        let aggregator = MetricsAggregator::new(store.clone());

        aggregator
            .apply(&event(Some(campaign.id), "delivered"))
            .await
            .unwrap();

        let current = store.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(current.opened_count, 0);
        assert_eq!(current.bounced_count, 0);
    }

    #[tokio::test]
    async fn test_unresolved_campaign_is_a_noop() {
        let store = Arc::new(MemoryCampaignStore::new());
        let campaign = campaign(&store).await;
        let aggregator = MetricsAggregator::new(store.clone());

        aggregator.apply(&event(None, "opened")).await.unwrap();

        let current = store.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(current.opened_count, 0);
    }
}
