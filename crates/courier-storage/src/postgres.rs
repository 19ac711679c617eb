//! PostgreSQL store implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::types::CampaignId;
use courier_common::{Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Campaign, CampaignStatus, CounterField, CreateCampaign, DeliveryEvent, NewDeliveryEvent,
};
use crate::store::{CampaignStore, EventStore};

fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Campaign store backed by PostgreSQL
#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    /// Create a new campaign store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, subject, from_address, from_name, reply_to,
                html_body, text_body, scheduled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.subject)
        .bind(&input.from_address)
        .bind(&input.from_name)
        .bind(&input.reply_to)
        .bind(&input.html_body)
        .bind(&input.text_body)
        .bind(input.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn transition(
        &self,
        id: CampaignId,
        expected_version: i64,
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = $3,
                sent_at = COALESCE($4, sent_at),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(status.to_string())
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn set_recipient_count(&self, id: CampaignId, count: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE campaigns SET
                recipient_count = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(count)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn increment_counter(
        &self,
        id: CampaignId,
        field: CounterField,
        delta: i64,
    ) -> Result<()> {
        // Single in-place increment; the column name comes from the
        // CounterField enum, never from caller input.
        let column = field.column();
        let sql = format!(
            "UPDATE campaigns SET {column} = {column} + $2, updated_at = NOW() WHERE id = $1"
        );

        sqlx::query(&sql)
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

/// Delivery event store backed by PostgreSQL
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create a new event store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewDeliveryEvent) -> Result<Option<DeliveryEvent>> {
        let id = Uuid::new_v4();

        // The unique index on (message_id, event_type) makes redeliveries a
        // no-op instead of a double count.
        sqlx::query_as::<_, DeliveryEvent>(
            r#"
            INSERT INTO delivery_events (
                id, campaign_id, message_id, recipient, event_type,
                metadata, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (message_id, event_type) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(event.campaign_id)
        .bind(&event.message_id)
        .bind(&event.recipient)
        .bind(event.event_type.to_string())
        .bind(&event.metadata)
        .bind(event.occurred_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Vec<DeliveryEvent>> {
        sqlx::query_as::<_, DeliveryEvent>(
            r#"
            SELECT * FROM delivery_events
            WHERE message_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
