use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription_reconciler::SubscriptionRepoTrait,
    domain::entities::subscription::{PropertyEligibility, SubscriptionQuote},
    infra::config::BillingConfig,
};

// ============================================================================
// Quota Math
// ============================================================================

/// Paid slots needed to cover `requested` properties. Every paid slot grants
/// one additional covered slot, and odd remainders are always charged, never
/// given free.
pub fn paid_properties_for(requested: i32) -> i32 {
    (requested + 1) / 2
}

/// Covered slots granted for `paid` slots. For odd requests this over-covers
/// by one slot, which is the deliberate pricing policy.
pub fn covered_properties_for(paid: i32) -> i32 {
    paid * 2
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait ManagedPropertyRepoTrait: Send + Sync {
    async fn count_by_tenant(&self, tenant_id: Uuid) -> AppResult<i64>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct QuotaUseCases {
    subscription_repo: Arc<dyn SubscriptionRepoTrait>,
    property_repo: Arc<dyn ManagedPropertyRepoTrait>,
    config: BillingConfig,
}

impl QuotaUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepoTrait>,
        property_repo: Arc<dyn ManagedPropertyRepoTrait>,
        config: BillingConfig,
    ) -> Self {
        Self {
            subscription_repo,
            property_repo,
            config,
        }
    }

    /// Price a request to cover `requested` properties for one yearly period.
    pub fn quote(&self, requested: i32) -> AppResult<SubscriptionQuote> {
        if requested <= 0 || requested > self.config.max_quote_properties {
            return Err(AppError::InvalidPropertyCount(requested as i64));
        }

        let paid = paid_properties_for(requested);
        let covered = covered_properties_for(paid);

        Ok(SubscriptionQuote {
            requested_properties: requested,
            paid_properties: paid,
            covered_properties: covered,
            total_amount_cents: paid as i64 * self.config.price_per_property_cents,
            currency: self.config.subscription_currency.clone(),
        })
    }

    /// Read-only check the route layer uses to block property creation or
    /// prompt for an upgrade. Never mutates state.
    pub async fn can_add_property(
        &self,
        tenant_id: Uuid,
        additional: i64,
    ) -> AppResult<PropertyEligibility> {
        let record = self
            .subscription_repo
            .get_by_tenant(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let managed = self.property_repo.count_by_tenant(tenant_id).await?;

        let needed = managed + additional;
        let shortfall = (needed - record.covered_properties as i64).max(0);

        Ok(PropertyEligibility {
            allowed: shortfall == 0,
            shortfall,
        })
    }
}
