//! Test data factories for creating valid test fixtures.
//!
//! Each factory creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    payment_event::{LineItem, PaymentEvent, WebhookEvent},
    subscription::{SubscriptionRecord, SubscriptionStatus},
};

pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Create an active test subscription with sensible defaults.
pub fn create_test_subscription(
    overrides: impl FnOnce(&mut SubscriptionRecord),
) -> SubscriptionRecord {
    let mut record = SubscriptionRecord {
        tenant_id: Uuid::new_v4(),
        status: SubscriptionStatus::Active,
        paid_properties: 4,
        covered_properties: 8,
        current_period_start: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        current_period_end: Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap(),
        last_webhook_event_id: None,
    };
    overrides(&mut record);
    record
}

fn line_items_for(quantity: i32) -> Vec<LineItem> {
    vec![LineItem {
        quantity,
        unit_amount_cents: 9_900,
        currency: "EUR".to_string(),
    }]
}

pub fn payment_succeeded_event(
    event_id: &str,
    tenant_id: Uuid,
    quantity: i32,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> WebhookEvent {
    WebhookEvent {
        event_id: event_id.to_string(),
        tenant_id,
        event: PaymentEvent::PaymentSucceeded {
            line_items: line_items_for(quantity),
            period_start,
            period_end,
        },
    }
}

pub fn renewal_event(
    event_id: &str,
    tenant_id: Uuid,
    quantity: i32,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> WebhookEvent {
    WebhookEvent {
        event_id: event_id.to_string(),
        tenant_id,
        event: PaymentEvent::SubscriptionRenewed {
            line_items: line_items_for(quantity),
            period_start,
            period_end,
        },
    }
}

pub fn cancellation_event(
    event_id: &str,
    tenant_id: Uuid,
    cancelled_at: DateTime<Utc>,
) -> WebhookEvent {
    WebhookEvent {
        event_id: event_id.to_string(),
        tenant_id,
        event: PaymentEvent::SubscriptionCancelled { cancelled_at },
    }
}
