use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// One line of a provider invoice. `quantity` counts paid property slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: i32,
    pub unit_amount_cents: i64,
    pub currency: String,
}

/// Payment-provider event body, tagged by the provider's event type string.
///
/// A closed enum instead of a string switch: adding an event variant forces
/// every match over it to be revisited, so a new type cannot silently fall
/// through unhandled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    #[serde(rename = "payment.succeeded")]
    PaymentSucceeded {
        line_items: Vec<LineItem>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    },
    #[serde(rename = "subscription.renewed")]
    SubscriptionRenewed {
        line_items: Vec<LineItem>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    },
    #[serde(rename = "subscription.cancelled")]
    SubscriptionCancelled { cancelled_at: DateTime<Utc> },
}

impl PaymentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentSucceeded { .. } => "payment.succeeded",
            PaymentEvent::SubscriptionRenewed { .. } => "subscription.renewed",
            PaymentEvent::SubscriptionCancelled { .. } => "subscription.cancelled",
        }
    }
}

/// Verified webhook envelope handed over by the transport layer. Signature
/// checking is the transport's responsibility; the core trusts an envelope
/// once it parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub tenant_id: Uuid,
    #[serde(flatten)]
    pub event: PaymentEvent,
}

impl WebhookEvent {
    /// Parse a provider payload. Unknown event types and malformed bodies are
    /// rejected and left for manual review, never guessed at.
    pub fn from_value(value: &serde_json::Value) -> AppResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::UnrecognizedWebhookEvent(format!("{}", e)))
    }

    pub fn from_json(payload: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| AppError::UnrecognizedWebhookEvent(format!("invalid JSON: {}", e)))?;
        Self::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payment_succeeded() {
        let payload = serde_json::json!({
            "event_id": "evt_123",
            "tenant_id": "8c5f0e6e-3f4e-4e9f-9a93-6a9c2a3a1b10",
            "type": "payment.succeeded",
            "line_items": [
                { "quantity": 4, "unit_amount_cents": 9900, "currency": "EUR" }
            ],
            "period_start": "2026-01-01T00:00:00Z",
            "period_end": "2027-01-01T00:00:00Z"
        });

        let envelope = WebhookEvent::from_value(&payload).unwrap();
        assert_eq!(envelope.event_id, "evt_123");
        assert_eq!(envelope.event.event_type(), "payment.succeeded");
        match envelope.event {
            PaymentEvent::PaymentSucceeded { ref line_items, .. } => {
                assert_eq!(line_items.len(), 1);
                assert_eq!(line_items[0].quantity, 4);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_parse_cancellation() {
        let payload = serde_json::json!({
            "event_id": "evt_456",
            "tenant_id": "8c5f0e6e-3f4e-4e9f-9a93-6a9c2a3a1b10",
            "type": "subscription.cancelled",
            "cancelled_at": "2026-05-01T09:30:00Z"
        });

        let envelope = WebhookEvent::from_value(&payload).unwrap();
        assert_eq!(envelope.event.event_type(), "subscription.cancelled");
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let payload = serde_json::json!({
            "event_id": "evt_789",
            "tenant_id": "8c5f0e6e-3f4e-4e9f-9a93-6a9c2a3a1b10",
            "type": "payment.teleported"
        });

        assert!(matches!(
            WebhookEvent::from_value(&payload).unwrap_err(),
            AppError::UnrecognizedWebhookEvent(_)
        ));
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        // Missing line_items and period fields
        let payload = serde_json::json!({
            "event_id": "evt_790",
            "tenant_id": "8c5f0e6e-3f4e-4e9f-9a93-6a9c2a3a1b10",
            "type": "payment.succeeded"
        });
        assert!(matches!(
            WebhookEvent::from_value(&payload).unwrap_err(),
            AppError::UnrecognizedWebhookEvent(_)
        ));

        assert!(matches!(
            WebhookEvent::from_json("not json at all").unwrap_err(),
            AppError::UnrecognizedWebhookEvent(_)
        ));
    }

    #[test]
    fn test_round_trip_serialization() {
        let payload = serde_json::json!({
            "event_id": "evt_123",
            "tenant_id": "8c5f0e6e-3f4e-4e9f-9a93-6a9c2a3a1b10",
            "type": "subscription.renewed",
            "line_items": [
                { "quantity": 2, "unit_amount_cents": 9900, "currency": "EUR" }
            ],
            "period_start": "2026-01-01T00:00:00Z",
            "period_end": "2027-01-01T00:00:00Z"
        });

        let envelope = WebhookEvent::from_value(&payload).unwrap();
        let serialized = serde_json::to_value(&envelope).unwrap();
        let reparsed = WebhookEvent::from_value(&serialized).unwrap();
        assert_eq!(envelope, reparsed);
    }
}
