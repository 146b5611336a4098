use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    /// Whether the tenant may currently use its covered-property allowance.
    /// Cancelled subscriptions keep access until the already-paid period
    /// lapses and the sweep demotes them.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial | SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        )
    }

    /// Whether a successful payment may (re)activate from this state.
    pub fn awaits_payment(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial | SubscriptionStatus::Expired
        )
    }
}

/// A tenant's subscription state. Owned exclusively by the reconciler; every
/// other component only reads it. `last_webhook_event_id` exists purely to
/// make reconciliation idempotent against redelivered provider events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tenant_id: Uuid,
    pub status: SubscriptionStatus,
    pub paid_properties: i32,
    pub covered_properties: i32,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub last_webhook_event_id: Option<String>,
}

impl SubscriptionRecord {
    /// The record a tenant starts with on creation.
    pub fn new_trial(
        tenant_id: Uuid,
        created_at: DateTime<Utc>,
        trial_days: i64,
        trial_covered_properties: i32,
    ) -> Self {
        Self {
            tenant_id,
            status: SubscriptionStatus::Trial,
            paid_properties: 0,
            covered_properties: trial_covered_properties,
            current_period_start: created_at,
            current_period_end: created_at + Duration::days(trial_days),
            last_webhook_event_id: None,
        }
    }

    /// A trialing or cancelled record whose period has passed. These are what
    /// the periodic sweep demotes to expired.
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Trial | SubscriptionStatus::Cancelled
        ) && self.current_period_end < now
    }
}

/// Priced answer to "cover N properties for one yearly period". Computed per
/// request and handed to the checkout flow; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionQuote {
    pub requested_properties: i32,
    pub paid_properties: i32,
    pub covered_properties: i32,
    pub total_amount_cents: i64,
    pub currency: String,
}

/// Read-only answer to "may this tenant manage `additional` more properties".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyEligibility {
    pub allowed: bool,
    pub shortfall: i64,
}
