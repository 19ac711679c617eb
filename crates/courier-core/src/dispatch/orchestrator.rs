//! Dispatch orchestrator - owns the campaign lifecycle state machine
//!
//! State machine: draft -> sending (immediate dispatch), draft -> scheduled
//! (deferred dispatch), scheduled -> sending (job activation),
//! sending -> sent (attempt pass finished, partial failures included),
//! sending -> failed (orchestration failure). `sent` and `failed` are
//! terminal. Every transition is a compare-and-swap on the campaign's
//! version token.

use chrono::Utc;
use courier_common::types::CampaignId;
use courier_storage::models::{Campaign, CampaignStatus};
use courier_storage::store::CampaignStore;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::bulk_sender::SendReport;
use super::sender::{CampaignSender, DispatchOutcome};
use super::DispatchError;

/// A dispatch request for one campaign
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub recipients: Vec<String>,
    pub send_now: bool,
}

/// Outcome reported to the dispatch caller
#[derive(Debug)]
pub struct DispatchResult {
    pub campaign: Campaign,
    pub queued: bool,
    pub report: Option<SendReport>,
}

/// Owns the campaign lifecycle and decides the direct-vs-queued path.
pub struct DispatchOrchestrator {
    campaigns: Arc<dyn CampaignStore>,
    sender: Arc<dyn CampaignSender>,
    max_recipients: usize,
}

impl DispatchOrchestrator {
    /// Create a new orchestrator with the configured sender strategy
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        sender: Arc<dyn CampaignSender>,
        max_recipients: usize,
    ) -> Self {
        Self {
            campaigns,
            sender,
            max_recipients,
        }
    }

    /// Dispatch a campaign to a recipient list.
    ///
    /// Immediate dispatch moves the campaign to `sending` and stamps
    /// `sent_at` optimistically before the attempt pass begins; deferred
    /// dispatch moves it to `scheduled`. A campaign in a terminal state
    /// (`sent` or `failed`) rejects the request with no side effects.
    pub async fn dispatch(
        &self,
        campaign_id: CampaignId,
        request: DispatchRequest,
    ) -> Result<DispatchResult, DispatchError> {
        let campaign = self
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        match campaign.status_enum() {
            Some(CampaignStatus::Sent) => return Err(DispatchError::AlreadySent),
            Some(status) if status.is_terminal() => return Err(DispatchError::Terminal),
            _ => {}
        }

        self.validate_recipients(&request.recipients)?;

        self.campaigns
            .set_recipient_count(campaign_id, request.recipients.len() as i32)
            .await?;

        let (target, sent_at) = if request.send_now {
            (CampaignStatus::Sending, Some(Utc::now()))
        } else {
            (CampaignStatus::Scheduled, None)
        };

        let campaign = self
            .campaigns
            .transition(campaign_id, campaign.version, target, sent_at)
            .await?
            .ok_or(DispatchError::Conflict)?;

        info!(
            campaign_id = %campaign_id,
            status = %campaign.status,
            recipients = request.recipients.len(),
            "Campaign dispatch started"
        );

        let outcome = self
            .sender
            .deliver(&campaign, &request.recipients, request.send_now)
            .await;

        match outcome {
            Ok(DispatchOutcome::Completed(report)) => {
                // The pass finished; partial per-recipient failures still
                // count as a sent campaign.
                let campaign = self.finish(campaign).await?;
                info!(
                    campaign_id = %campaign_id,
                    success = report.success,
                    failed = report.failed,
                    "Campaign sent"
                );
                Ok(DispatchResult {
                    campaign,
                    queued: false,
                    report: Some(report),
                })
            }
            Ok(DispatchOutcome::Enqueued { job_id }) => {
                info!(campaign_id = %campaign_id, job_id = %job_id, "Campaign dispatch queued");
                Ok(DispatchResult {
                    campaign,
                    queued: true,
                    report: None,
                })
            }
            Ok(DispatchOutcome::Deferred) => Ok(DispatchResult {
                campaign,
                queued: false,
                report: None,
            }),
            Err(e) => {
                error!(campaign_id = %campaign_id, "Campaign dispatch failed: {}", e);
                self.mark_failed(campaign).await;
                Err(e)
            }
        }
    }

    fn validate_recipients(&self, recipients: &[String]) -> Result<(), DispatchError> {
        if recipients.is_empty() {
            return Err(DispatchError::InvalidRecipients(
                "recipient list is empty".to_string(),
            ));
        }

        if recipients.len() > self.max_recipients {
            return Err(DispatchError::InvalidRecipients(format!(
                "recipient list exceeds the maximum of {}",
                self.max_recipients
            )));
        }

        for recipient in recipients {
            if !courier_common::types::is_email_shaped(recipient) {
                return Err(DispatchError::InvalidRecipients(format!(
                    "not a valid address: {}",
                    recipient
                )));
            }
        }

        Ok(())
    }

    /// Transition to `sent` after the attempt pass.
    ///
    /// A version miss here means something else transitioned the campaign
    /// mid-send; the pass already ran, so the current record wins.
    async fn finish(&self, campaign: Campaign) -> Result<Campaign, DispatchError> {
        match self
            .campaigns
            .transition(campaign.id, campaign.version, CampaignStatus::Sent, None)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                warn!(
                    campaign_id = %campaign.id,
                    "concurrent transition during send pass, keeping stored status"
                );
                self.campaigns
                    .get(campaign.id)
                    .await?
                    .ok_or(DispatchError::NotFound)
            }
        }
    }

    /// Best-effort transition to `failed`; the original error still
    /// propagates to the caller.
    async fn mark_failed(&self, campaign: Campaign) {
        match self
            .campaigns
            .transition(campaign.id, campaign.version, CampaignStatus::Failed, None)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(campaign_id = %campaign.id, "could not mark campaign failed: version moved");
            }
            Err(e) => {
                error!(campaign_id = %campaign.id, "could not mark campaign failed: {}", e);
            }
        }
    }
}
