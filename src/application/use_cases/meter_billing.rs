use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        bill::{Bill, BillingPeriod, Charge},
        meter::{ConsumptionRecord, MeterCategory, MeterReading, OcrCandidate},
    },
    infra::config::BillingConfig,
};

// ============================================================================
// Billing Math
// ============================================================================

/// Round a monetary amount to 2 decimal places, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sanity-check a new reading against the previous one for the same meter.
///
/// Meters are monotonically increasing counters: a lower value signals meter
/// replacement or a read error and must go through an explicit administrative
/// override, never silent acceptance. A jump above `jump_ceiling` is flagged
/// as [`AppError::ImplausibleJump`], a distinct condition callers may accept
/// after manual confirmation.
pub fn validate_reading(
    current: Decimal,
    previous: Option<Decimal>,
    jump_ceiling: Decimal,
) -> AppResult<()> {
    if current < Decimal::ZERO {
        return Err(AppError::InvalidReading(format!(
            "value {} is negative",
            current
        )));
    }

    if let Some(previous) = previous {
        if current < previous {
            return Err(AppError::InvalidReading(format!(
                "value {} is lower than previous reading {}",
                current, previous
            )));
        }
        let consumed = current - previous;
        if consumed > jump_ceiling {
            return Err(AppError::ImplausibleJump {
                consumed,
                ceiling: jump_ceiling,
            });
        }
    }

    Ok(())
}

/// Consumption between two readings. The first reading of a meter establishes
/// a baseline and never produces a retroactive charge; the clamp absorbs
/// corrections recorded after a meter reset accepted under an override.
pub fn consumption(current: Decimal, previous: Option<Decimal>) -> Decimal {
    match previous {
        None => Decimal::ZERO,
        Some(previous) => (current - previous).max(Decimal::ZERO),
    }
}

/// Convert consumption into a monetary charge.
///
/// Each category formula follows the utility's published pricing convention;
/// none of them reduce to a plain linear multiplier. An explicit `unit_price`
/// (per-meter custom pricing) replaces the category formula entirely.
pub fn tariff_amount(
    category: MeterCategory,
    consumption: Decimal,
    unit_price: Option<Decimal>,
) -> Decimal {
    // No consumption bills nothing; the water formula otherwise carries its
    // standing component.
    if consumption.is_zero() {
        return Decimal::ZERO;
    }

    let amount = match unit_price {
        Some(price) => consumption * price,
        None => match category {
            MeterCategory::Electricity => consumption * Decimal::new(116, 2),
            MeterCategory::Gas => {
                consumption
                    * Decimal::new(10_813, 3)
                    * Decimal::new(25_620, 5)
                    * Decimal::new(121, 2)
            }
            MeterCategory::Water => {
                (consumption * Decimal::new(997, 2) + consumption + Decimal::new(124, 2))
                    * Decimal::new(111, 2)
            }
        },
    };

    round2(amount)
}

/// Fractional rent for a partial occupancy period. All period arithmetic is
/// pinned to UTC; second resolution carries the fractional-day cases.
pub fn prorated_rent(
    monthly_rent: Decimal,
    move_in: DateTime<Utc>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> AppResult<Decimal> {
    let period = BillingPeriod::new(period_start, period_end)?;

    if move_in >= period.end {
        // No occupancy in the period; never a negative charge.
        return Ok(Decimal::ZERO);
    }

    let period_seconds = period.duration_seconds();
    if period_seconds == 0 {
        return Err(AppError::InvalidPeriod(
            "period is shorter than one second".to_string(),
        ));
    }

    let occupied_from = move_in.max(period.start);
    let occupied_seconds = (period.end - occupied_from).num_seconds();

    Ok(round2(
        monthly_rent * Decimal::from(occupied_seconds) / Decimal::from(period_seconds),
    ))
}

/// Derive the consumption record for one meter in a billing run.
pub fn consumption_record(usage: &MeterUsage) -> ConsumptionRecord {
    ConsumptionRecord {
        meter_id: usage.meter_id,
        category: usage.category,
        previous_value: usage.previous_value,
        current_value: usage.current_value,
        consumption: consumption(usage.current_value, usage.previous_value),
    }
}

// ============================================================================
// Input Types
// ============================================================================

/// Explicit join data for one meter in a billing run. The calling layer
/// resolves meters and their readings; the core only computes.
#[derive(Debug, Clone)]
pub struct MeterUsage {
    pub meter_id: Uuid,
    pub category: MeterCategory,
    pub previous_value: Option<Decimal>,
    pub current_value: Decimal,
    /// Per-meter custom price overriding the category formula.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct RentTerms {
    pub monthly_rent: Decimal,
    pub move_in: DateTime<Utc>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait MeterReadingRepoTrait: Send + Sync {
    async fn latest_for_meter(&self, meter_id: Uuid) -> AppResult<Option<MeterReading>>;

    async fn insert(&self, reading: &MeterReading) -> AppResult<MeterReading>;
}

#[async_trait]
pub trait BillRepoTrait: Send + Sync {
    async fn insert(&self, bill: &Bill) -> AppResult<Bill>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct MeterBillingUseCases {
    reading_repo: Arc<dyn MeterReadingRepoTrait>,
    bill_repo: Arc<dyn BillRepoTrait>,
    config: BillingConfig,
}

impl MeterBillingUseCases {
    pub fn new(
        reading_repo: Arc<dyn MeterReadingRepoTrait>,
        bill_repo: Arc<dyn BillRepoTrait>,
        config: BillingConfig,
    ) -> Self {
        Self {
            reading_repo,
            bill_repo,
            config,
        }
    }

    /// Record a reading extracted by the OCR collaborator.
    ///
    /// The candidate value is untrusted and re-validated against the meter's
    /// latest stored reading. `accept_implausible` is the administrative
    /// override for jumps above the plausibility ceiling; outright invalid
    /// readings are never accepted.
    pub async fn record_reading(
        &self,
        meter_id: Uuid,
        category: MeterCategory,
        candidate: &OcrCandidate,
        taken_at: DateTime<Utc>,
        accept_implausible: bool,
    ) -> AppResult<MeterReading> {
        let value = candidate.value_as_decimal()?;
        let previous = self.reading_repo.latest_for_meter(meter_id).await?;

        if let Some(previous) = &previous {
            if previous.category != category {
                return Err(AppError::InvalidReading(format!(
                    "meter {} is registered as {}, got {}",
                    meter_id, previous.category, category
                )));
            }
        }

        match validate_reading(
            value,
            previous.as_ref().map(|r| r.value),
            self.config.implausible_jump_ceiling,
        ) {
            Ok(()) => {}
            Err(AppError::ImplausibleJump { consumed, ceiling }) if accept_implausible => {
                tracing::warn!(
                    meter_id = %meter_id,
                    consumed = %consumed,
                    ceiling = %ceiling,
                    raw_text = %candidate.raw_text,
                    "Accepting implausible jump after manual confirmation"
                );
            }
            Err(e) => return Err(e),
        }

        let reading = MeterReading {
            id: Uuid::new_v4(),
            meter_id,
            category,
            value,
            taken_at,
        };
        let stored = self.reading_repo.insert(&reading).await?;

        tracing::info!(
            meter_id = %meter_id,
            category = %category,
            value = %value,
            ocr_confidence = candidate.confidence,
            "Recorded meter reading"
        );

        Ok(stored)
    }

    /// Combine per-meter charges and an optional prorated rent into one bill
    /// for the billing period. Deterministic given its inputs; the only
    /// timestamps involved are the caller-supplied period bounds.
    pub async fn assemble_bill(
        &self,
        lease_id: Uuid,
        period: &BillingPeriod,
        meters: &[MeterUsage],
        rent: Option<&RentTerms>,
    ) -> AppResult<Bill> {
        let mut charges = Vec::with_capacity(meters.len());
        for usage in meters {
            let record = consumption_record(usage);
            let amount = tariff_amount(record.category, record.consumption, usage.unit_price);
            charges.push(Charge {
                category: record.category,
                consumption: record.consumption,
                unit_price: usage.unit_price,
                amount,
                currency: self.config.utility_currency.clone(),
            });
        }

        let rent_amount = match rent {
            Some(terms) => Some(prorated_rent(
                terms.monthly_rent,
                terms.move_in,
                period.start,
                period.end,
            )?),
            None => None,
        };

        // Amounts were rounded per charge in the tariff engine; the total is a
        // plain sum and never reopens them.
        let total_amount = charges.iter().map(|c| c.amount).sum::<Decimal>()
            + rent_amount.unwrap_or(Decimal::ZERO);

        let bill = Bill {
            id: Uuid::new_v4(),
            lease_id,
            period_start: period.start,
            period_end: period.end,
            charges,
            rent_amount,
            total_amount,
            currency: self.config.utility_currency.clone(),
            paid: false,
            paid_at: None,
        };

        let stored = self.bill_repo.insert(&bill).await?;

        tracing::info!(
            lease_id = %lease_id,
            charges = stored.charges.len(),
            total = %stored.total_amount,
            "Assembled bill"
        );

        Ok(stored)
    }
}
