//! In-memory mock implementations for the billing repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::use_cases::{
        meter_billing::{BillRepoTrait, MeterReadingRepoTrait},
        subscription_quota::ManagedPropertyRepoTrait,
        subscription_reconciler::{
            CreateSubscriptionEventInput, SubscriptionEventRepoTrait, SubscriptionRepoTrait,
        },
    },
    domain::entities::{bill::Bill, meter::MeterReading, subscription::SubscriptionRecord},
};

// ============================================================================
// InMemoryMeterReadingRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryMeterReadingRepo {
    pub readings: Mutex<HashMap<Uuid, Vec<MeterReading>>>,
}

impl InMemoryMeterReadingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: Vec<MeterReading>) -> Self {
        let mut map: HashMap<Uuid, Vec<MeterReading>> = HashMap::new();
        for reading in readings {
            map.entry(reading.meter_id).or_default().push(reading);
        }
        Self {
            readings: Mutex::new(map),
        }
    }
}

#[async_trait]
impl MeterReadingRepoTrait for InMemoryMeterReadingRepo {
    async fn latest_for_meter(&self, meter_id: Uuid) -> AppResult<Option<MeterReading>> {
        Ok(self
            .readings
            .lock()
            .unwrap()
            .get(&meter_id)
            .and_then(|readings| readings.iter().max_by_key(|r| r.taken_at))
            .cloned())
    }

    async fn insert(&self, reading: &MeterReading) -> AppResult<MeterReading> {
        self.readings
            .lock()
            .unwrap()
            .entry(reading.meter_id)
            .or_default()
            .push(reading.clone());
        Ok(reading.clone())
    }
}

// ============================================================================
// InMemoryBillRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillRepo {
    pub bills: Mutex<Vec<Bill>>,
}

impl InMemoryBillRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillRepoTrait for InMemoryBillRepo {
    async fn insert(&self, bill: &Bill) -> AppResult<Bill> {
        self.bills.lock().unwrap().push(bill.clone());
        Ok(bill.clone())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub records: Mutex<HashMap<Uuid, SubscriptionRecord>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SubscriptionRecord>) -> Self {
        let map: HashMap<Uuid, SubscriptionRecord> =
            records.into_iter().map(|r| (r.tenant_id, r)).collect();
        Self {
            records: Mutex::new(map),
        }
    }
}

#[async_trait]
impl SubscriptionRepoTrait for InMemorySubscriptionRepo {
    async fn get_by_tenant(&self, tenant_id: Uuid) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self.records.lock().unwrap().get(&tenant_id).cloned())
    }

    async fn insert(&self, record: &SubscriptionRecord) -> AppResult<SubscriptionRecord> {
        self.records
            .lock()
            .unwrap()
            .insert(record.tenant_id, record.clone());
        Ok(record.clone())
    }

    async fn update_guarded(
        &self,
        tenant_id: Uuid,
        expected_event_id: Option<&str>,
        record: &SubscriptionRecord,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let mut records = self.records.lock().unwrap();

        // One lock for check and write mirrors the transactional conditional
        // UPDATE a real adapter performs.
        match records.get(&tenant_id) {
            Some(stored) if stored.last_webhook_event_id.as_deref() == expected_event_id => {
                records.insert(tenant_id, record.clone());
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<SubscriptionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.has_lapsed(now))
            .cloned()
            .collect())
    }
}

// ============================================================================
// InMemorySubscriptionEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionEventRepo {
    pub events: Mutex<Vec<CreateSubscriptionEventInput>>,
}

impl InMemorySubscriptionEventRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionEventRepoTrait for InMemorySubscriptionEventRepo {
    async fn create(&self, input: &CreateSubscriptionEventInput) -> AppResult<()> {
        self.events.lock().unwrap().push(input.clone());
        Ok(())
    }
}

// ============================================================================
// InMemoryManagedPropertyRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryManagedPropertyRepo {
    pub counts: Mutex<HashMap<Uuid, i64>>,
}

impl InMemoryManagedPropertyRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the managed-property count for a tenant (for testing).
    pub fn set_count(&self, tenant_id: Uuid, count: i64) {
        self.counts.lock().unwrap().insert(tenant_id, count);
    }
}

#[async_trait]
impl ManagedPropertyRepoTrait for InMemoryManagedPropertyRepo {
    async fn count_by_tenant(&self, tenant_id: Uuid) -> AppResult<i64> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&tenant_id)
            .copied()
            .unwrap_or(0))
    }
}
