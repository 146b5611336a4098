use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::meter::MeterCategory;
use crate::app_error::{AppError, AppResult};

/// A half-open billing window in UTC. Construction enforces that the end lies
/// strictly after the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::InvalidPeriod(format!(
                "period end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// One billed utility position: a meter's consumption priced by its tariff.
/// `unit_price` records the per-meter override when one was applied; `None`
/// means the category formula priced the charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub category: MeterCategory,
    pub consumption: Decimal,
    pub unit_price: Option<Decimal>,
    pub amount: Decimal,
    pub currency: String,
}

/// One bill per billing period per lease. Created unpaid; `paid`/`paid_at`
/// are flipped later by the payment-confirmation action outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub charges: Vec<Charge>,
    pub rent_amount: Option<Decimal>,
    pub total_amount: Decimal,
    pub currency: String,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}
