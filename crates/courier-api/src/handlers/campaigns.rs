//! Campaign handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use courier_core::{DispatchError, DispatchRequest, SendFailure};
use courier_storage::models::{Campaign, CreateCampaign};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::AppState;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Campaign response
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub subject: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub status: String,
    pub recipient_count: i32,
    pub sent_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub bounced_count: i32,
    pub unsubscribed_count: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            subject: c.subject,
            from_address: c.from_address,
            from_name: c.from_name,
            reply_to: c.reply_to,
            status: c.status,
            recipient_count: c.recipient_count,
            sent_count: c.sent_count,
            opened_count: c.opened_count,
            clicked_count: c.clicked_count,
            bounced_count: c.bounced_count,
            unsubscribed_count: c.unsubscribed_count,
            scheduled_at: c.scheduled_at,
            sent_at: c.sent_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub subject: String,
    pub from_address: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Request body for dispatching a campaign
#[derive(Debug, Deserialize)]
pub struct SendCampaignRequest {
    pub recipients: Vec<String>,
    #[serde(default = "default_send_now", alias = "sendNow")]
    pub send_now: bool,
}

fn default_send_now() -> bool {
    true
}

/// Dispatch response
#[derive(Debug, Serialize)]
pub struct SendCampaignResponse {
    pub campaign: CampaignResponse,
    pub message: String,
    pub recipients: usize,
    pub queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SendFailure>>,
}

fn validation_error(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "validation_error".to_string(),
            message: message.to_string(),
        }),
    )
}

/// Create a new campaign
///
/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.subject.is_empty() {
        return Err(validation_error("Subject is required"));
    }

    if input.html_body.is_none() && input.text_body.is_none() {
        return Err(validation_error("Either html_body or text_body is required"));
    }

    if !courier_common::types::is_email_shaped(&input.from_address) {
        return Err(validation_error("from_address is not a valid address"));
    }

    let create_input = CreateCampaign {
        subject: input.subject,
        from_address: input.from_address,
        from_name: input.from_name,
        reply_to: input.reply_to,
        html_body: input.html_body,
        text_body: input.text_body,
        scheduled_at: input.scheduled_at,
    };

    let campaign = state.campaigns.create(create_input).await.map_err(|e| {
        error!("Failed to create campaign: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error".to_string(),
                message: "Failed to create campaign".to_string(),
            }),
        )
    })?;

    info!("Created campaign {}", campaign.id);

    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// Get a campaign by ID
///
/// GET /api/v1/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaigns
        .get(campaign_id)
        .await
        .map_err(|e| {
            error!("Failed to get campaign: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Failed to get campaign".to_string(),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: "Campaign not found".to_string(),
                }),
            )
        })?;

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Dispatch a campaign to a recipient list
///
/// POST /api/v1/campaigns/:campaign_id/send
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
    Json(input): Json<SendCampaignRequest>,
) -> Result<Json<SendCampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let recipients = input.recipients.len();

    let result = state
        .orchestrator
        .dispatch(
            campaign_id,
            DispatchRequest {
                recipients: input.recipients,
                send_now: input.send_now,
            },
        )
        .await
        .map_err(dispatch_error)?;

    let message = if result.queued {
        "Campaign queued for sending".to_string()
    } else if result.report.is_some() {
        "Campaign sent".to_string()
    } else {
        "Campaign scheduled".to_string()
    };

    let (success, failed, errors) = match result.report {
        Some(report) => (
            Some(report.success),
            Some(report.failed),
            Some(report.errors),
        ),
        None => (None, None, None),
    };

    Ok(Json(SendCampaignResponse {
        campaign: CampaignResponse::from(result.campaign),
        message,
        recipients,
        queued: result.queued,
        success,
        failed,
        errors,
    }))
}

fn dispatch_error(e: DispatchError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Failed to dispatch campaign: {}", e);
    let (status, error) = match &e {
        DispatchError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        DispatchError::AlreadySent => (StatusCode::BAD_REQUEST, "already_sent"),
        DispatchError::Terminal => (StatusCode::CONFLICT, "terminal_state"),
        DispatchError::InvalidRecipients(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DispatchError::Conflict => (StatusCode::CONFLICT, "conflict"),
        DispatchError::Queue(_) | DispatchError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "dispatch_error")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: e.to_string(),
        }),
    )
}
