//! Queue adapter - hand-off of deferred dispatch jobs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::types::{CampaignId, JobId};
use courier_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Job payload for a deferred campaign dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchJob {
    pub campaign_id: CampaignId,
    pub recipients: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// External collaborator that accepts a deferred bulk-send job.
///
/// The job is executed by an external worker pool; the orchestrator never
/// waits for it and must tolerate the worker never reporting back.
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    async fn enqueue(&self, job: &DispatchJob) -> Result<JobId>;
}

/// Queue adapter backed by the jobs table
pub struct PgQueueAdapter {
    pool: PgPool,
}

impl PgQueueAdapter {
    /// Create a new queue adapter
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueAdapter for PgQueueAdapter {
    async fn enqueue(&self, job: &DispatchJob) -> Result<JobId> {
        let job_id = Uuid::now_v7();

        let payload = serde_json::to_value(job)
            .map_err(|e| Error::Internal(format!("Failed to encode dispatch job: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, queue, payload, status, attempts, max_attempts, scheduled_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job_id)
        .bind("dispatch")
        .bind(&payload)
        .bind("pending")
        .bind(0i32)
        .bind(5i32)
        .bind(job.scheduled_at.unwrap_or_else(Utc::now))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        info!(job_id = %job_id, campaign_id = %job.campaign_id, "Enqueued dispatch job");
        Ok(job_id)
    }
}
