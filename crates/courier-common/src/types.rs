//! Common types for Courier

use uuid::Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for delivery events
pub type EventId = Uuid;

/// Unique identifier for queued dispatch jobs
pub type JobId = Uuid;

/// Check that a string is shaped like an email address.
///
/// This is deliberately a shape check, not RFC 5321 validation: a non-empty
/// local part, a single `@`, and a domain containing a dot. The transport
/// provider is the final authority on deliverability.
pub fn is_email_shaped(address: &str) -> bool {
    let mut parts = address.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !address.contains(char::is_whitespace)
}
