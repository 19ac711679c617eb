//! Database models

use chrono::{DateTime, Utc};
use courier_common::types::{CampaignId, EventId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    /// Terminal states accept no further dispatch transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Sent | CampaignStatus::Failed)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Sending => write!(f, "sending"),
            CampaignStatus::Sent => write!(f, "sent"),
            CampaignStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "failed" => Ok(CampaignStatus::Failed),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Canonical delivery event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEventType {
    Sent,
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Complained,
    Unsubscribed,
}

impl std::fmt::Display for DeliveryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryEventType::Sent => write!(f, "sent"),
            DeliveryEventType::Delivered => write!(f, "delivered"),
            DeliveryEventType::Opened => write!(f, "opened"),
            DeliveryEventType::Clicked => write!(f, "clicked"),
            DeliveryEventType::Bounced => write!(f, "bounced"),
            DeliveryEventType::Complained => write!(f, "complained"),
            DeliveryEventType::Unsubscribed => write!(f, "unsubscribed"),
        }
    }
}

impl std::str::FromStr for DeliveryEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryEventType::Sent),
            "delivered" => Ok(DeliveryEventType::Delivered),
            "opened" => Ok(DeliveryEventType::Opened),
            "clicked" => Ok(DeliveryEventType::Clicked),
            "bounced" => Ok(DeliveryEventType::Bounced),
            "complained" => Ok(DeliveryEventType::Complained),
            "unsubscribed" => Ok(DeliveryEventType::Unsubscribed),
            _ => Err(format!("Invalid delivery event type: {}", s)),
        }
    }
}

/// Campaign outcome counters that may be incremented by event ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    Sent,
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
}

impl CounterField {
    /// Column name in the campaigns table
    pub fn column(&self) -> &'static str {
        match self {
            CounterField::Sent => "sent_count",
            CounterField::Opened => "opened_count",
            CounterField::Clicked => "clicked_count",
            CounterField::Bounced => "bounced_count",
            CounterField::Unsubscribed => "unsubscribed_count",
        }
    }
}

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub subject: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub recipient_count: i32,
    pub sent_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub bounced_count: i32,
    pub unsubscribed_count: i32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Formatted sender, "Name <address>" when a display name is set
    pub fn sender(&self) -> String {
        if let Some(ref name) = self.from_name {
            format!("{} <{}>", name, self.from_address)
        } else {
            self.from_address.clone()
        }
    }
}

/// Input for creating a campaign
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub subject: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Delivery event model (append-only)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: EventId,
    pub campaign_id: Option<CampaignId>,
    pub message_id: String,
    pub recipient: String,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryEvent {
    /// Get event type enum
    pub fn event_type_enum(&self) -> Option<DeliveryEventType> {
        self.event_type.parse().ok()
    }
}

/// Input for appending a delivery event
#[derive(Debug, Clone)]
pub struct NewDeliveryEvent {
    pub campaign_id: Option<CampaignId>,
    pub message_id: String,
    pub recipient: String,
    pub event_type: DeliveryEventType,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}
