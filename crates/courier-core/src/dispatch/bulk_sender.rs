//! Bulk sender - sequential, throttled delivery attempts for a recipient list

use chrono::Utc;
use courier_storage::models::{Campaign, CounterField, DeliveryEventType, NewDeliveryEvent};
use courier_storage::store::{CampaignStore, EventStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::DispatchError;
use crate::transport::{OutboundMessage, Transport};

/// One recipient that could not be delivered to
#[derive(Debug, Clone, Serialize)]
pub struct SendFailure {
    pub recipient: String,
    pub reason: String,
}

/// Aggregate outcome of one attempt pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<SendFailure>,
}

/// Drives sequential delivery attempts for a recipient list.
///
/// Delivery is strictly sequential with a fixed minimum delay between
/// attempts to respect the transport's rate limits. A failed recipient never
/// aborts the pass; the failure is recorded and the loop moves on.
pub struct BulkSender {
    campaigns: Arc<dyn CampaignStore>,
    events: Arc<dyn EventStore>,
    transport: Arc<dyn Transport>,
    throttle: Duration,
}

impl BulkSender {
    /// Create a new bulk sender
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        events: Arc<dyn EventStore>,
        transport: Arc<dyn Transport>,
        throttle: Duration,
    ) -> Self {
        Self {
            campaigns,
            events,
            transport,
            throttle,
        }
    }

    /// Attempt delivery to every recipient and account for the outcomes.
    ///
    /// Returns the per-pass report; raises only when the final counter
    /// write-back fails, which the orchestrator treats as total failure.
    pub async fn send_all(
        &self,
        campaign: &Campaign,
        recipients: &[String],
    ) -> Result<SendReport, DispatchError> {
        let mut report = SendReport::default();

        info!(
            campaign_id = %campaign.id,
            recipients = recipients.len(),
            "Starting bulk send pass"
        );

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }

            let message = OutboundMessage {
                from: campaign.sender(),
                to: recipient.clone(),
                subject: campaign.subject.clone(),
                html_body: campaign.html_body.clone(),
                text_body: campaign.text_body.clone(),
                reply_to: campaign.reply_to.clone(),
                campaign_id: Some(campaign.id),
            };

            match self.transport.send(&message).await {
                Ok(message_id) => {
                    report.success += 1;
                    // Recording the campaign id here, at send time, is what
                    // lets webhook ingestion correlate the very first
                    // provider callback for this message.
                    self.record_event(NewDeliveryEvent {
                        campaign_id: Some(campaign.id),
                        message_id,
                        recipient: recipient.clone(),
                        event_type: DeliveryEventType::Sent,
                        metadata: serde_json::json!({}),
                        occurred_at: Utc::now(),
                    })
                    .await;
                }
                Err(e) => {
                    let reason = e.to_string();
                    debug!(recipient = %recipient, reason = %reason, "delivery attempt failed");

                    report.failed += 1;
                    report.errors.push(SendFailure {
                        recipient: recipient.clone(),
                        reason: reason.clone(),
                    });

                    // The provider never assigned an id; synthesize one so
                    // the bounce still lands in the append-only log.
                    self.record_event(NewDeliveryEvent {
                        campaign_id: Some(campaign.id),
                        message_id: format!("unsent-{}", Uuid::new_v4()),
                        recipient: recipient.clone(),
                        event_type: DeliveryEventType::Bounced,
                        metadata: serde_json::json!({ "reason": reason }),
                        occurred_at: Utc::now(),
                    })
                    .await;
                }
            }
        }

        self.campaigns
            .set_recipient_count(campaign.id, recipients.len() as i32)
            .await?;

        if report.success > 0 {
            self.campaigns
                .increment_counter(campaign.id, CounterField::Sent, report.success as i64)
                .await?;
        }

        if report.failed > 0 {
            self.campaigns
                .increment_counter(campaign.id, CounterField::Bounced, report.failed as i64)
                .await?;
        }

        info!(
            campaign_id = %campaign.id,
            success = report.success,
            failed = report.failed,
            "Bulk send pass finished"
        );

        Ok(report)
    }

    /// Append an event, tolerating store failures.
    ///
    /// Event accounting must not abort a delivery pass that is otherwise
    /// making progress.
    async fn record_event(&self, event: NewDeliveryEvent) {
        if let Err(e) = self.events.append(event).await {
            warn!("Failed to record delivery event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use courier_storage::memory::{MemoryCampaignStore, MemoryEventStore};
    use courier_storage::models::CreateCampaign;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that fails for a configured set of recipients
    pub(crate) struct FlakyTransport {
        fail_for: HashSet<String>,
        calls: AtomicUsize,
    }

    impl FlakyTransport {
        pub(crate) fn new<I: IntoIterator<Item = &'static str>>(fail_for: I) -> Self {
            Self {
                fail_for: fail_for.into_iter().map(String::from).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.contains(&message.to) {
                Err(TransportError::Provider {
                    status: 422,
                    message: "mailbox unavailable".to_string(),
                })
            } else {
                Ok(format!("msg-{}", message.to))
            }
        }
    }

    async fn draft(store: &MemoryCampaignStore) -> Campaign {
        store
            .create(CreateCampaign {
                subject: "Launch day".to_string(),
                from_address: "news@example.com".to_string(),
                from_name: Some("Example News".to_string()),
                reply_to: None,
                html_body: Some("<p>We launched.</p>".to_string()),
                text_body: None,
                scheduled_at: None,
            })
            .await
            .unwrap()
    }

    fn sender(
        campaigns: &Arc<MemoryCampaignStore>,
        events: &Arc<MemoryEventStore>,
        transport: &Arc<FlakyTransport>,
    ) -> BulkSender {
        BulkSender::new(
            campaigns.clone(),
            events.clone(),
            transport.clone(),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_partial_failure_accounting() {
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let events = Arc::new(MemoryEventStore::new());
        let transport = Arc::new(FlakyTransport::new(["bob@example.com"]));
        let campaign = draft(&campaigns).await;

        let recipients = vec![
            "alice@example.com".to_string(),
            "bob@example.com".to_string(),
            "carol@example.com".to_string(),
        ];

        let report = sender(&campaigns, &events, &transport)
            .send_all(&campaign, &recipients)
            .await
            .unwrap();

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].recipient, "bob@example.com");
        assert!(report.errors[0].reason.contains("mailbox unavailable"));

        let current = campaigns.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(current.recipient_count, 3);
        assert_eq!(current.sent_count, 2);
        assert_eq!(current.bounced_count, 1);
    }

    #[tokio::test]
    async fn test_one_failure_never_aborts_the_pass() {
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let events = Arc::new(MemoryEventStore::new());
        let transport = Arc::new(FlakyTransport::new(["a@example.com"]));
        let campaign = draft(&campaigns).await;

        // The failing recipient comes first; everyone after still gets tried
        let recipients = vec![
            "a@example.com".to_string(),
            "b@example.com".to_string(),
            "c@example.com".to_string(),
        ];

        sender(&campaigns, &events, &transport)
            .send_all(&campaign, &recipients)
            .await
            .unwrap();

        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_events_are_recorded_with_campaign_attached() {
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let events = Arc::new(MemoryEventStore::new());
        let transport = Arc::new(FlakyTransport::new(["bob@example.com"]));
        let campaign = draft(&campaigns).await;

        let recipients = vec!["alice@example.com".to_string(), "bob@example.com".to_string()];

        sender(&campaigns, &events, &transport)
            .send_all(&campaign, &recipients)
            .await
            .unwrap();

        let recorded = events.all().await;
        assert_eq!(recorded.len(), 2);

        let sent: Vec<_> = recorded.iter().filter(|e| e.event_type == "sent").collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice@example.com");
        assert_eq!(sent[0].campaign_id, Some(campaign.id));

        let bounced: Vec<_> = recorded.iter().filter(|e| e.event_type == "bounced").collect();
        assert_eq!(bounced.len(), 1);
        assert_eq!(bounced[0].recipient, "bob@example.com");
        assert_eq!(bounced[0].metadata["reason"], serde_json::json!(
            "Provider rejected the message (422): mailbox unavailable"
        ));
    }

    #[tokio::test]
    async fn test_sent_events_resolve_by_message_id() {
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let events = Arc::new(MemoryEventStore::new());
        let transport = Arc::new(FlakyTransport::new([]));
        let campaign = draft(&campaigns).await;

        sender(&campaigns, &events, &transport)
            .send_all(&campaign, &["alice@example.com".to_string()])
            .await
            .unwrap();

        // The provider message id recorded at send time is the correlation
        // key a later webhook will arrive with.
        let found = events.find_by_message_id("msg-alice@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].campaign_id, Some(campaign.id));
    }
}
