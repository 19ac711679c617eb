//! Provider event vocabulary to canonical event types

use courier_storage::models::DeliveryEventType;

/// Map a provider event-type string to the canonical classification.
///
/// The provider namespaces its types (`email.delivered`); the prefix is
/// stripped before lookup. Unknown types map to `None` and are acknowledged
/// and dropped by the ingestor. A delayed delivery is treated as a bounce:
/// the provider gave up on the attempt.
pub fn canonical_event_type(provider_type: &str) -> Option<DeliveryEventType> {
    let name = provider_type.strip_prefix("email.").unwrap_or(provider_type);

    match name {
        "sent" => Some(DeliveryEventType::Sent),
        "delivered" => Some(DeliveryEventType::Delivered),
        "opened" => Some(DeliveryEventType::Opened),
        "clicked" => Some(DeliveryEventType::Clicked),
        "bounced" => Some(DeliveryEventType::Bounced),
        "complained" => Some(DeliveryEventType::Complained),
        "delivery_delayed" => Some(DeliveryEventType::Bounced),
        _ => None,
    }
}
