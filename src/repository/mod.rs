pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{
    Lease, LeaseRentAdjustment, LeaseStatus, Payment, PaymentStatus, PaymentType, Tenant, Unit,
    UnitStatus,
};

#[derive(Debug, Clone)]
pub struct NewUnit {
    pub number: String,
    pub floor: i32,
    pub base_rent_value: Decimal,
    pub renovated_rent_value: Decimal,
    pub renovated: bool,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLease {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub contract_signed_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_due_day: i16,
    pub monthly_rent_value: Decimal,
    pub painting_fee_total: Decimal,
    pub painting_fee_installments: i16,
    pub painting_fee_paid: Decimal,
    pub status: LeaseStatus,
    pub parent_lease_id: Option<Uuid>,
    pub generation: i32,
}

#[derive(Debug, Clone)]
pub struct NewRentAdjustment {
    pub lease_id: Uuid,
    pub previous_rent_value: Decimal,
    pub new_rent_value: Decimal,
    pub percentage: Decimal,
    pub reason: Option<String>,
    pub adjusted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub lease_id: Uuid,
    pub payment_type: PaymentType,
    pub reference_month: NaiveDate,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

/// Lease-side fee accumulation applied in the same transaction as a
/// painting-fee payment settling.
#[derive(Debug, Clone, Copy)]
pub struct FeeRollup {
    pub lease_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct PaymentReschedule {
    pub payment_id: Uuid,
    pub new_due_date: NaiveDate,
}

/// Everything a due-day change writes, applied atomically: the optional
/// proportional charge, the superseded payment to cancel, the due-date
/// rewrites, and the lease's new due day.
#[derive(Debug, Clone)]
pub struct DueDayChangePlan {
    pub lease_id: Uuid,
    pub new_due_day: i16,
    pub proportional: Option<NewPayment>,
    pub cancel_payment_id: Option<Uuid>,
    pub reschedules: Vec<PaymentReschedule>,
}

#[derive(Debug, Clone, Default, serde::Serialize, sqlx::FromRow)]
pub struct PaymentTotals {
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub overdue_amount: Decimal,
    pub paid_count: i64,
    pub pending_count: i64,
    pub overdue_count: i64,
}

#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn create(&self, unit: NewUnit) -> Result<Unit, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Unit>, AppError>;
    async fn update_status(&self, id: Uuid, status: UnitStatus) -> Result<Unit, AppError>;
    async fn list_by_status(&self, status: UnitStatus, limit: i64) -> Result<Vec<Unit>, AppError>;
    async fn list(&self, limit: i64) -> Result<Vec<Unit>, AppError>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create(&self, tenant: NewTenant) -> Result<Tenant, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;
    async fn list(&self, limit: i64) -> Result<Vec<Tenant>, AppError>;
}

#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn create(&self, lease: NewLease) -> Result<Lease, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Lease>, AppError>;
    async fn update_status(&self, id: Uuid, status: LeaseStatus) -> Result<Lease, AppError>;
    async fn update_painting_fee_paid(&self, id: Uuid, paid: Decimal) -> Result<Lease, AppError>;
    async fn list(&self, status: Option<LeaseStatus>, limit: i64) -> Result<Vec<Lease>, AppError>;
    /// Active leases whose end date falls within `window_days` of `today`.
    async fn list_expiring_within(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<Lease>, AppError>;
    /// Active or expiring-soon leases whose end date has already passed.
    async fn list_ended_before(&self, today: NaiveDate) -> Result<Vec<Lease>, AppError>;
    async fn get_active_by_unit(&self, unit_id: Uuid) -> Result<Option<Lease>, AppError>;
    async fn get_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Lease>, AppError>;
    async fn count_by_status(&self, status: LeaseStatus) -> Result<i64, AppError>;
    /// Atomic renewal: expire `expire_id`, insert the replacement lease and
    /// the optional rent-adjustment audit row in one transaction.
    async fn update_and_create(
        &self,
        expire_id: Uuid,
        lease: NewLease,
        adjustment: Option<NewRentAdjustment>,
    ) -> Result<Lease, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: NewPayment) -> Result<Payment, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError>;
    /// All payments of a lease ordered by due date.
    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<Payment>, AppError>;
    /// Pending/overdue payments of a lease due strictly after `date`,
    /// ordered by due date.
    async fn list_pending_after(
        &self,
        lease_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, AppError>;
    /// Settle a payment; the optional fee rollup updates the lease's
    /// painting-fee total in the same transaction and fails the whole
    /// operation when the cap would be exceeded.
    async fn mark_as_paid(
        &self,
        id: Uuid,
        payment_date: NaiveDate,
        payment_method: &str,
        notes: Option<&str>,
        fee_rollup: Option<FeeRollup>,
    ) -> Result<Payment, AppError>;
    async fn cancel(&self, id: Uuid) -> Result<Payment, AppError>;
    /// Store-side bulk promotion of pending payments past their due date.
    async fn mark_overdue_bulk(&self, today: NaiveDate) -> Result<u64, AppError>;
    async fn list_overdue(&self, today: NaiveDate, limit: i64) -> Result<Vec<Payment>, AppError>;
    async fn list_upcoming(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, AppError>;
    async fn totals_for_lease(&self, lease_id: Uuid) -> Result<PaymentTotals, AppError>;
    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64, AppError>;
    /// Apply a due-day change atomically; returns the proportional payment
    /// when the plan carries one.
    async fn apply_due_day_change(
        &self,
        plan: DueDayChangePlan,
    ) -> Result<Option<Payment>, AppError>;
}

#[async_trait]
pub trait AdjustmentStore: Send + Sync {
    async fn create(&self, adjustment: NewRentAdjustment) -> Result<LeaseRentAdjustment, AppError>;
    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<LeaseRentAdjustment>, AppError>;
}
