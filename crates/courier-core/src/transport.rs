//! Transport - outbound delivery through the provider's HTTP API

use async_trait::async_trait;
use courier_common::config::TransportConfig;
use courier_common::types::CampaignId;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Provider rejected the message ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// One outbound message for one recipient
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub reply_to: Option<String>,
    pub campaign_id: Option<CampaignId>,
}

/// External collaborator that actually delivers one message to one recipient.
///
/// Returns the provider-assigned message id on success; that id is the
/// correlation key for every delivery event the provider reports back later.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

/// Transport backed by the provider's REST API
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport from configuration
    pub fn new(config: &TransportConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        // The campaign id rides along as a custom header so delivery events
        // can be attributed on the provider side as well.
        let headers = message
            .campaign_id
            .map(|id| serde_json::json!({ "X-Campaign-Id": id.to_string() }));

        let body = SendRequest {
            from: &message.from,
            to: [&message.to],
            subject: &message.subject,
            html: message.html_body.as_deref(),
            text: message.text_body.as_deref(),
            reply_to: message.reply_to.as_deref(),
            headers,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        debug!(message_id = %parsed.id, recipient = %message.to, "provider accepted message");

        Ok(parsed.id)
    }
}
