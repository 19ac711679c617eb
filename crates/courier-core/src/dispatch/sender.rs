//! Campaign sender strategies - direct in-process send or queue hand-off

use async_trait::async_trait;
use courier_common::types::JobId;
use courier_storage::models::Campaign;
use std::sync::Arc;
use tracing::debug;

use super::bulk_sender::{BulkSender, SendReport};
use super::DispatchError;
use crate::queue::{DispatchJob, QueueAdapter};

/// What happened to a dispatch once the orchestrator handed it over
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The attempt pass ran to completion in-process
    Completed(SendReport),
    /// The job was handed to the queue; an external worker finishes it
    Enqueued { job_id: JobId },
    /// Nothing to do now; the campaign stays scheduled
    Deferred,
}

/// Delivery strategy selected at construction time: either the bulk sender
/// runs synchronously, or the job is handed to the queue adapter.
#[async_trait]
pub trait CampaignSender: Send + Sync {
    async fn deliver(
        &self,
        campaign: &Campaign,
        recipients: &[String],
        send_now: bool,
    ) -> Result<DispatchOutcome, DispatchError>;
}

/// Runs the attempt pass synchronously inside the dispatch request
pub struct DirectSender {
    bulk: BulkSender,
}

impl DirectSender {
    /// Create a direct sender
    pub fn new(bulk: BulkSender) -> Self {
        Self { bulk }
    }
}

#[async_trait]
impl CampaignSender for DirectSender {
    async fn deliver(
        &self,
        campaign: &Campaign,
        recipients: &[String],
        send_now: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !send_now {
            // A scheduled campaign with no queue waits for its activation;
            // nothing runs inside this request.
            debug!(campaign_id = %campaign.id, "dispatch deferred to scheduled activation");
            return Ok(DispatchOutcome::Deferred);
        }

        let report = self.bulk.send_all(campaign, recipients).await?;
        Ok(DispatchOutcome::Completed(report))
    }
}

/// Hands the job to the queue and returns without waiting
pub struct QueuedSender {
    queue: Arc<dyn QueueAdapter>,
}

impl QueuedSender {
    /// Create a queued sender
    pub fn new(queue: Arc<dyn QueueAdapter>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl CampaignSender for QueuedSender {
    async fn deliver(
        &self,
        campaign: &Campaign,
        recipients: &[String],
        send_now: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let job = DispatchJob {
            campaign_id: campaign.id,
            recipients: recipients.to_vec(),
            scheduled_at: if send_now { None } else { campaign.scheduled_at },
        };

        let job_id = self
            .queue
            .enqueue(&job)
            .await
            .map_err(|e| DispatchError::Queue(e.to_string()))?;

        Ok(DispatchOutcome::Enqueued { job_id })
    }
}
