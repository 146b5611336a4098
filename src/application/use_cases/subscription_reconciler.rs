use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription_quota::covered_properties_for,
    domain::entities::{
        payment_event::{LineItem, PaymentEvent, WebhookEvent},
        subscription::{SubscriptionRecord, SubscriptionStatus},
    },
    infra::config::BillingConfig,
};

/// Re-reads allowed when a concurrent delivery wins the guarded write.
const MAX_RECONCILE_ATTEMPTS: usize = 3;

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepoTrait: Send + Sync {
    async fn get_by_tenant(&self, tenant_id: Uuid) -> AppResult<Option<SubscriptionRecord>>;

    async fn insert(&self, record: &SubscriptionRecord) -> AppResult<SubscriptionRecord>;

    /// Conditional write: persist `record` only while the stored row still
    /// carries `expected_event_id` as its last applied webhook event. Returns
    /// `None` when the guard fails. Implementations back this with a
    /// transactional conditional UPDATE keyed on tenant identity, which makes
    /// the reconciler's read-check-write a single atomic unit per tenant.
    async fn update_guarded(
        &self,
        tenant_id: Uuid,
        expected_event_id: Option<&str>,
        record: &SubscriptionRecord,
    ) -> AppResult<Option<SubscriptionRecord>>;

    /// Trialing or cancelled records whose period end has passed.
    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<SubscriptionRecord>>;
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionEventInput {
    pub tenant_id: Uuid,
    pub event_type: String,
    pub previous_status: Option<SubscriptionStatus>,
    pub new_status: Option<SubscriptionStatus>,
    pub provider_event_id: Option<String>,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait SubscriptionEventRepoTrait: Send + Sync {
    async fn create(&self, input: &CreateSubscriptionEventInput) -> AppResult<()>;
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of applying one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The event was new and its transition has been committed.
    Applied(SubscriptionRecord),
    /// The event id matched the last applied one: a known redelivery.
    /// Reported as success with the record untouched.
    Duplicate(SubscriptionRecord),
}

impl ReconcileOutcome {
    pub fn record(&self) -> &SubscriptionRecord {
        match self {
            ReconcileOutcome::Applied(record) | ReconcileOutcome::Duplicate(record) => record,
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

fn paid_quantity(line_items: &[LineItem]) -> i32 {
    line_items.iter().map(|item| item.quantity).sum()
}

fn check_period(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    // Rejected outright, never silently clamped.
    if end < start {
        return Err(AppError::InvalidPeriod(format!(
            "period end {} precedes start {}",
            end, start
        )));
    }
    Ok(())
}

fn activate(
    next: &mut SubscriptionRecord,
    line_items: &[LineItem],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) {
    let paid = paid_quantity(line_items);
    next.status = SubscriptionStatus::Active;
    next.paid_properties = paid;
    next.covered_properties = covered_properties_for(paid);
    next.current_period_start = period_start;
    next.current_period_end = period_end;
}

/// Pure transition function of the subscription state machine.
///
/// The match is exhaustive over the event enum, so a newly introduced event
/// variant cannot fall through unhandled. The returned record carries the
/// event id; persisting record and id together is the caller's job.
pub fn apply_event(
    record: &SubscriptionRecord,
    envelope: &WebhookEvent,
) -> AppResult<SubscriptionRecord> {
    let mut next = record.clone();
    next.last_webhook_event_id = Some(envelope.event_id.clone());

    match (record.status, &envelope.event) {
        (
            status,
            PaymentEvent::PaymentSucceeded {
                line_items,
                period_start,
                period_end,
            },
        ) => {
            check_period(*period_start, *period_end)?;
            if !status.awaits_payment() {
                // Renewal invoice for an active record, or a resubscribe
                // before the cancelled period lapsed. The provider has taken
                // the payment either way.
                tracing::debug!(
                    tenant_id = %record.tenant_id,
                    status = %status,
                    "Payment succeeded outside trial/expired"
                );
            }
            activate(&mut next, line_items, *period_start, *period_end);
        }
        (
            SubscriptionStatus::Active,
            PaymentEvent::SubscriptionRenewed {
                line_items,
                period_start,
                period_end,
            },
        ) => {
            check_period(*period_start, *period_end)?;
            if *period_end < record.current_period_end {
                return Err(AppError::InvalidPeriod(format!(
                    "renewal would retreat period end from {} to {}",
                    record.current_period_end, period_end
                )));
            }
            activate(&mut next, line_items, *period_start, *period_end);
        }
        (
            status,
            PaymentEvent::SubscriptionRenewed {
                line_items,
                period_start,
                period_end,
            },
        ) => {
            // Out-of-order delivery (e.g. a renewal racing a cancellation).
            // The provider state is authoritative.
            check_period(*period_start, *period_end)?;
            tracing::warn!(
                tenant_id = %record.tenant_id,
                status = %status,
                "Renewal for a non-active subscription, applying provider state"
            );
            activate(&mut next, line_items, *period_start, *period_end);
        }
        (
            SubscriptionStatus::Active | SubscriptionStatus::Trial,
            PaymentEvent::SubscriptionCancelled { .. },
        ) => {
            // Covered properties and period boundaries stay: access persists
            // through the already-paid period until the sweep demotes the
            // record to expired.
            next.status = SubscriptionStatus::Cancelled;
        }
        (SubscriptionStatus::Cancelled, PaymentEvent::SubscriptionCancelled { .. }) => {
            // Already cancelled; only the event id advances.
        }
        (SubscriptionStatus::Expired, PaymentEvent::SubscriptionCancelled { .. }) => {
            // Lapsed before the cancellation arrived; stays expired.
        }
    }

    Ok(next)
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct ReconcilerUseCases {
    subscription_repo: Arc<dyn SubscriptionRepoTrait>,
    event_repo: Arc<dyn SubscriptionEventRepoTrait>,
    config: BillingConfig,
}

impl ReconcilerUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepoTrait>,
        event_repo: Arc<dyn SubscriptionEventRepoTrait>,
        config: BillingConfig,
    ) -> Self {
        Self {
            subscription_repo,
            event_repo,
            config,
        }
    }

    /// Initial record for a newly created tenant.
    pub async fn start_trial(
        &self,
        tenant_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> AppResult<SubscriptionRecord> {
        let record = SubscriptionRecord::new_trial(
            tenant_id,
            created_at,
            self.config.trial_period_days,
            self.config.trial_covered_properties,
        );
        let stored = self.subscription_repo.insert(&record).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            trial_ends = %stored.current_period_end,
            "Started trial subscription"
        );

        Ok(stored)
    }

    /// Apply one verified webhook delivery.
    ///
    /// A redelivered event (id matching the last applied one) is a success
    /// no-op: providers deliver at least once and a duplicate must never be
    /// applied twice. A genuinely new event commits its transition and the
    /// event id in one guarded write; losing that write to a concurrent
    /// delivery triggers a bounded re-read.
    pub async fn reconcile(&self, envelope: &WebhookEvent) -> AppResult<ReconcileOutcome> {
        for _ in 0..MAX_RECONCILE_ATTEMPTS {
            let record = self
                .subscription_repo
                .get_by_tenant(envelope.tenant_id)
                .await?
                .ok_or(AppError::NotFound)?;

            if record.last_webhook_event_id.as_deref() == Some(envelope.event_id.as_str()) {
                tracing::info!(
                    tenant_id = %envelope.tenant_id,
                    event_id = %envelope.event_id,
                    "Duplicate webhook event, nothing to apply"
                );
                return Ok(ReconcileOutcome::Duplicate(record));
            }

            let next = apply_event(&record, envelope)?;

            let committed = self
                .subscription_repo
                .update_guarded(
                    envelope.tenant_id,
                    record.last_webhook_event_id.as_deref(),
                    &next,
                )
                .await?;

            if let Some(stored) = committed {
                self.log_subscription_event(&record, &stored, envelope).await;
                tracing::info!(
                    tenant_id = %envelope.tenant_id,
                    event_id = %envelope.event_id,
                    event_type = envelope.event.event_type(),
                    previous_status = %record.status,
                    new_status = %stored.status,
                    "Reconciled webhook event"
                );
                return Ok(ReconcileOutcome::Applied(stored));
            }
            // Lost the write race; re-read and re-apply on the fresh record.
        }

        Err(AppError::Internal(format!(
            "could not reconcile event {} after {} attempts",
            envelope.event_id, MAX_RECONCILE_ATTEMPTS
        )))
    }

    /// Demote cancelled and still-trialing records whose paid-for period has
    /// passed. Called by the host's periodic sweep.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let lapsed = self.subscription_repo.list_lapsed(now).await?;

        let mut expired = 0u64;
        for record in lapsed {
            if !record.has_lapsed(now) {
                continue;
            }
            let mut next = record.clone();
            next.status = SubscriptionStatus::Expired;

            // The sweep is not a webhook; the event id stays untouched.
            let committed = self
                .subscription_repo
                .update_guarded(
                    record.tenant_id,
                    record.last_webhook_event_id.as_deref(),
                    &next,
                )
                .await?;

            if committed.is_some() {
                expired += 1;
            } else {
                tracing::debug!(
                    tenant_id = %record.tenant_id,
                    "Lapsed record changed under the sweep, skipping"
                );
            }
        }

        if expired > 0 {
            tracing::info!(expired, "Expired lapsed subscriptions");
        }

        Ok(expired)
    }

    async fn log_subscription_event(
        &self,
        previous: &SubscriptionRecord,
        current: &SubscriptionRecord,
        envelope: &WebhookEvent,
    ) {
        let input = CreateSubscriptionEventInput {
            tenant_id: envelope.tenant_id,
            event_type: envelope.event.event_type().to_string(),
            previous_status: Some(previous.status),
            new_status: Some(current.status),
            provider_event_id: Some(envelope.event_id.clone()),
            metadata: serde_json::to_value(&envelope.event)
                .unwrap_or(serde_json::Value::Null),
        };

        // Audit logging is non-critical; never fail a reconciliation on it.
        if let Err(e) = self.event_repo.create(&input).await {
            tracing::warn!(
                error = %e,
                event_id = %envelope.event_id,
                "Failed to log subscription event"
            );
        }
    }
}
