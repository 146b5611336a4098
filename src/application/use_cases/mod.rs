pub mod meter_billing;
pub mod subscription_quota;
pub mod subscription_reconciler;
