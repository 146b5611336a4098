use env_helpers::get_env_default;
use rust_decimal::Decimal;

/// Billing knobs. The tariff formulas are fixed in code; everything here is
/// deployment-tunable.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Currency utility bills are issued in (ISO 4217).
    pub utility_currency: String,
    /// Currency subscription slots are priced in.
    pub subscription_currency: String,
    /// Yearly price per paid property slot, in cents.
    pub price_per_property_cents: i64,
    /// Trial length granted on tenant creation.
    pub trial_period_days: i64,
    /// Properties a trial tenant may manage.
    pub trial_covered_properties: i32,
    /// Administrative sanity bound on a single quote.
    pub max_quote_properties: i32,
    /// Largest reading jump accepted without manual confirmation.
    pub implausible_jump_ceiling: Decimal,
}

impl BillingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            utility_currency: get_env_default("UTILITY_CURRENCY", defaults.utility_currency),
            subscription_currency: get_env_default(
                "SUBSCRIPTION_CURRENCY",
                defaults.subscription_currency,
            ),
            price_per_property_cents: get_env_default(
                "PRICE_PER_PROPERTY_CENTS",
                defaults.price_per_property_cents,
            ),
            trial_period_days: get_env_default("TRIAL_PERIOD_DAYS", defaults.trial_period_days),
            trial_covered_properties: get_env_default(
                "TRIAL_COVERED_PROPERTIES",
                defaults.trial_covered_properties,
            ),
            max_quote_properties: get_env_default(
                "MAX_QUOTE_PROPERTIES",
                defaults.max_quote_properties,
            ),
            implausible_jump_ceiling: get_env_default(
                "IMPLAUSIBLE_JUMP_CEILING",
                defaults.implausible_jump_ceiling,
            ),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            utility_currency: "EUR".to_string(),
            subscription_currency: "EUR".to_string(),
            price_per_property_cents: 9_900,
            trial_period_days: 15,
            trial_covered_properties: 10,
            max_quote_properties: 100,
            implausible_jump_ceiling: Decimal::new(10_000, 0),
        }
    }
}
