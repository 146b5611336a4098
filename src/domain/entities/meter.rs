use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum MeterCategory {
    Electricity,
    Water,
    Gas,
}

impl MeterCategory {
    /// Parse a category string coming from a collaborator. The enum itself is
    /// closed, so unknown categories only exist at this boundary.
    pub fn parse(s: &str) -> AppResult<Self> {
        s.parse::<MeterCategory>()
            .map_err(|_| AppError::UnsupportedMeterCategory(s.to_string()))
    }
}

/// A recorded meter reading. Immutable once stored; superseded only by a newer
/// reading for the same meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub id: Uuid,
    pub meter_id: Uuid,
    pub category: MeterCategory,
    pub value: Decimal,
    pub taken_at: DateTime<Utc>,
}

/// Consumption derived from two readings of one meter. Computed per billing
/// run, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionRecord {
    pub meter_id: Uuid,
    pub category: MeterCategory,
    pub previous_value: Option<Decimal>,
    pub current_value: Decimal,
    pub consumption: Decimal,
}

/// Candidate reading extracted by the OCR collaborator from a photographed
/// meter. The value is untrusted and always re-validated before use;
/// `confidence` is surfaced to human reviewers and never gates validation.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrCandidate {
    pub value: f64,
    pub confidence: f64,
    pub raw_text: String,
}

impl OcrCandidate {
    pub fn value_as_decimal(&self) -> AppResult<Decimal> {
        Decimal::from_f64_retain(self.value).ok_or_else(|| {
            AppError::InvalidReading(format!("unrepresentable value: {}", self.value))
        })
    }
}
