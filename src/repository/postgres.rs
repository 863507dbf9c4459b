use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::model::{
    Lease, LeaseRentAdjustment, LeaseStatus, Payment, PaymentStatus, Tenant, Unit, UnitStatus,
};

use super::{
    AdjustmentStore, DueDayChangePlan, FeeRollup, LeaseStore, NewLease, NewPayment,
    NewRentAdjustment, NewTenant, NewUnit, PaymentStore, PaymentTotals, TenantStore, UnitStore,
};

/// The one-active-lease-per-unit/tenant invariant is backed by partial unique
/// indexes on leases(unit_id) and leases(tenant_id) where status is in
/// ('active', 'expiring_soon'); violations surface as `Conflict`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    if message.contains("23505")
        || message
            .to_ascii_lowercase()
            .contains("duplicate key value violates unique constraint")
    {
        return AppError::Conflict("Duplicate value violates a unique constraint.".to_string());
    }
    AppError::Dependency("Database operation failed.".to_string())
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 1000)
}

#[async_trait]
impl UnitStore for PgStore {
    async fn create(&self, unit: NewUnit) -> Result<Unit, AppError> {
        let current =
            Unit::resolve_current_rent(unit.base_rent_value, unit.renovated_rent_value, unit.renovated);
        sqlx::query_as::<_, Unit>(
            "INSERT INTO units
                (id, number, floor, status, base_rent_value, renovated_rent_value,
                 current_rent_value, renovated, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&unit.number)
        .bind(unit.floor)
        .bind(UnitStatus::Available)
        .bind(unit.base_rent_value)
        .bind(unit.renovated_rent_value)
        .bind(current)
        .bind(unit.renovated)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Unit>, AppError> {
        sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_status(&self, id: Uuid, status: UnitStatus) -> Result<Unit, AppError> {
        sqlx::query_as::<_, Unit>("UPDATE units SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Unit record not found.".to_string()))
    }

    async fn list_by_status(&self, status: UnitStatus, limit: i64) -> Result<Vec<Unit>, AppError> {
        sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE status = $1 ORDER BY number LIMIT $2",
        )
        .bind(status)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list(&self, limit: i64) -> Result<Vec<Unit>, AppError> {
        sqlx::query_as::<_, Unit>("SELECT * FROM units ORDER BY number LIMIT $1")
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn create(&self, tenant: NewTenant) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (id, full_name, national_id, phone, email, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&tenant.full_name)
        .bind(&tenant.national_id)
        .bind(&tenant.phone)
        .bind(&tenant.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn list(&self, limit: i64) -> Result<Vec<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY full_name LIMIT $1")
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

const INSERT_LEASE: &str = "INSERT INTO leases
    (id, unit_id, tenant_id, contract_signed_date, start_date, end_date,
     payment_due_day, monthly_rent_value, painting_fee_total,
     painting_fee_installments, painting_fee_paid, status, parent_lease_id,
     generation, created_at)
 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
 RETURNING *";

#[async_trait]
impl LeaseStore for PgStore {
    async fn create(&self, lease: NewLease) -> Result<Lease, AppError> {
        sqlx::query_as::<_, Lease>(INSERT_LEASE)
            .bind(Uuid::new_v4())
            .bind(lease.unit_id)
            .bind(lease.tenant_id)
            .bind(lease.contract_signed_date)
            .bind(lease.start_date)
            .bind(lease.end_date)
            .bind(lease.payment_due_day)
            .bind(lease.monthly_rent_value)
            .bind(lease.painting_fee_total)
            .bind(lease.painting_fee_installments)
            .bind(lease.painting_fee_paid)
            .bind(lease.status)
            .bind(lease.parent_lease_id)
            .bind(lease.generation)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lease>, AppError> {
        sqlx::query_as::<_, Lease>("SELECT * FROM leases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_status(&self, id: Uuid, status: LeaseStatus) -> Result<Lease, AppError> {
        sqlx::query_as::<_, Lease>("UPDATE leases SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Lease record not found.".to_string()))
    }

    async fn update_painting_fee_paid(&self, id: Uuid, paid: Decimal) -> Result<Lease, AppError> {
        sqlx::query_as::<_, Lease>(
            "UPDATE leases SET painting_fee_paid = $2
             WHERE id = $1 AND $2 <= painting_fee_total
             RETURNING *",
        )
        .bind(id)
        .bind(paid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::Conflict("Painting fee paid would exceed the lease total.".to_string())
        })
    }

    async fn list(&self, status: Option<LeaseStatus>, limit: i64) -> Result<Vec<Lease>, AppError> {
        match status {
            Some(status) => sqlx::query_as::<_, Lease>(
                "SELECT * FROM leases WHERE status = $1 ORDER BY created_at DESC LIMIT $2",
            )
            .bind(status)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error),
            None => sqlx::query_as::<_, Lease>(
                "SELECT * FROM leases ORDER BY created_at DESC LIMIT $1",
            )
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error),
        }
    }

    async fn list_expiring_within(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<Lease>, AppError> {
        sqlx::query_as::<_, Lease>(
            "SELECT * FROM leases
             WHERE status = 'active' AND end_date <= $1
             ORDER BY end_date",
        )
        .bind(today + chrono::Duration::days(window_days))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_ended_before(&self, today: NaiveDate) -> Result<Vec<Lease>, AppError> {
        sqlx::query_as::<_, Lease>(
            "SELECT * FROM leases
             WHERE status IN ('active', 'expiring_soon') AND end_date < $1
             ORDER BY end_date",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_active_by_unit(&self, unit_id: Uuid) -> Result<Option<Lease>, AppError> {
        sqlx::query_as::<_, Lease>(
            "SELECT * FROM leases
             WHERE unit_id = $1 AND status IN ('active', 'expiring_soon')
             LIMIT 1",
        )
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Lease>, AppError> {
        sqlx::query_as::<_, Lease>(
            "SELECT * FROM leases
             WHERE tenant_id = $1 AND status IN ('active', 'expiring_soon')
             LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn count_by_status(&self, status: LeaseStatus) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leases WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_and_create(
        &self,
        expire_id: Uuid,
        lease: NewLease,
        adjustment: Option<NewRentAdjustment>,
    ) -> Result<Lease, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let expired = sqlx::query("UPDATE leases SET status = 'expired' WHERE id = $1")
            .bind(expire_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if expired.rows_affected() == 0 {
            return Err(AppError::NotFound("Lease record not found.".to_string()));
        }

        let created = sqlx::query_as::<_, Lease>(INSERT_LEASE)
            .bind(Uuid::new_v4())
            .bind(lease.unit_id)
            .bind(lease.tenant_id)
            .bind(lease.contract_signed_date)
            .bind(lease.start_date)
            .bind(lease.end_date)
            .bind(lease.payment_due_day)
            .bind(lease.monthly_rent_value)
            .bind(lease.painting_fee_total)
            .bind(lease.painting_fee_installments)
            .bind(lease.painting_fee_paid)
            .bind(lease.status)
            .bind(lease.parent_lease_id)
            .bind(lease.generation)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if let Some(adjustment) = adjustment {
            sqlx::query(
                "INSERT INTO lease_rent_adjustments
                    (id, lease_id, previous_rent_value, new_rent_value, percentage,
                     reason, adjusted_by, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::new_v4())
            .bind(adjustment.lease_id)
            .bind(adjustment.previous_rent_value)
            .bind(adjustment.new_rent_value)
            .bind(adjustment.percentage)
            .bind(&adjustment.reason)
            .bind(adjustment.adjusted_by)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }
}

const INSERT_PAYMENT: &str = "INSERT INTO payments
    (id, lease_id, payment_type, reference_month, amount, status, due_date,
     payment_date, payment_method, notes, created_at)
 VALUES ($1, $2, $3, $4, $5, 'pending', $6, NULL, NULL, $7, $8)
 RETURNING *";

#[async_trait]
impl PaymentStore for PgStore {
    async fn create(&self, payment: NewPayment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(INSERT_PAYMENT)
            .bind(Uuid::new_v4())
            .bind(payment.lease_id)
            .bind(payment.payment_type)
            .bind(payment.reference_month)
            .bind(payment.amount)
            .bind(payment.due_date)
            .bind(&payment.notes)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE lease_id = $1 ORDER BY due_date, created_at",
        )
        .bind(lease_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_pending_after(
        &self,
        lease_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments
             WHERE lease_id = $1
               AND status IN ('pending', 'overdue')
               AND due_date > $2
             ORDER BY due_date, created_at",
        )
        .bind(lease_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn mark_as_paid(
        &self,
        id: Uuid,
        payment_date: NaiveDate,
        payment_method: &str,
        notes: Option<&str>,
        fee_rollup: Option<FeeRollup>,
    ) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let updated = sqlx::query_as::<_, Payment>(
            "UPDATE payments
             SET status = 'paid', payment_date = $2, payment_method = $3,
                 notes = COALESCE($4, notes)
             WHERE id = $1 AND status IN ('pending', 'overdue')
             RETURNING *",
        )
        .bind(id)
        .bind(payment_date)
        .bind(payment_method)
        .bind(notes)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::Conflict("Payment cannot be marked as paid in its current status.".to_string())
        })?;

        if let Some(rollup) = fee_rollup {
            let guarded = sqlx::query(
                "UPDATE leases
                 SET painting_fee_paid = painting_fee_paid + $2
                 WHERE id = $1 AND painting_fee_paid + $2 <= painting_fee_total",
            )
            .bind(rollup.lease_id)
            .bind(rollup.amount)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if guarded.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Painting fee paid would exceed the lease total.".to_string(),
                ));
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    async fn cancel(&self, id: Uuid) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = 'cancelled'
             WHERE id = $1 AND status IN ('pending', 'overdue')
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::Conflict("Payment cannot be cancelled in its current status.".to_string())
        })
    }

    async fn mark_overdue_bulk(&self, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'overdue'
             WHERE status = 'pending' AND due_date < $1",
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_overdue(&self, today: NaiveDate, limit: i64) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments
             WHERE status = 'overdue'
                OR (status = 'pending' AND due_date < $1)
             ORDER BY due_date
             LIMIT $2",
        )
        .bind(today)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_upcoming(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments
             WHERE status = 'pending' AND due_date >= $1 AND due_date <= $2
             ORDER BY due_date
             LIMIT $3",
        )
        .bind(today)
        .bind(today + chrono::Duration::days(days.max(0)))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn totals_for_lease(&self, lease_id: Uuid) -> Result<PaymentTotals, AppError> {
        sqlx::query_as::<_, PaymentTotals>(
            "SELECT
                COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0) AS paid_amount,
                COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending_amount,
                COALESCE(SUM(amount) FILTER (WHERE status = 'overdue'), 0) AS overdue_amount,
                COUNT(*) FILTER (WHERE status = 'paid') AS paid_count,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_count,
                COUNT(*) FILTER (WHERE status = 'overdue') AS overdue_count
             FROM payments WHERE lease_id = $1",
        )
        .bind(lease_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn apply_due_day_change(
        &self,
        plan: DueDayChangePlan,
    ) -> Result<Option<Payment>, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let proportional = match &plan.proportional {
            Some(payment) => Some(
                sqlx::query_as::<_, Payment>(INSERT_PAYMENT)
                    .bind(Uuid::new_v4())
                    .bind(payment.lease_id)
                    .bind(payment.payment_type)
                    .bind(payment.reference_month)
                    .bind(payment.amount)
                    .bind(payment.due_date)
                    .bind(&payment.notes)
                    .bind(Utc::now())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_db_error)?,
            ),
            None => None,
        };

        if let Some(cancel_id) = plan.cancel_payment_id {
            sqlx::query("UPDATE payments SET status = 'cancelled' WHERE id = $1")
                .bind(cancel_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        for reschedule in &plan.reschedules {
            sqlx::query("UPDATE payments SET due_date = $2 WHERE id = $1")
                .bind(reschedule.payment_id)
                .bind(reschedule.new_due_date)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        let lease = sqlx::query("UPDATE leases SET payment_due_day = $2 WHERE id = $1")
            .bind(plan.lease_id)
            .bind(plan.new_due_day)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if lease.rows_affected() == 0 {
            return Err(AppError::NotFound("Lease record not found.".to_string()));
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(proportional)
    }
}

#[async_trait]
impl AdjustmentStore for PgStore {
    async fn create(&self, adjustment: NewRentAdjustment) -> Result<LeaseRentAdjustment, AppError> {
        sqlx::query_as::<_, LeaseRentAdjustment>(
            "INSERT INTO lease_rent_adjustments
                (id, lease_id, previous_rent_value, new_rent_value, percentage,
                 reason, adjusted_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(adjustment.lease_id)
        .bind(adjustment.previous_rent_value)
        .bind(adjustment.new_rent_value)
        .bind(adjustment.percentage)
        .bind(&adjustment.reason)
        .bind(adjustment.adjusted_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<LeaseRentAdjustment>, AppError> {
        sqlx::query_as::<_, LeaseRentAdjustment>(
            "SELECT * FROM lease_rent_adjustments WHERE lease_id = $1 ORDER BY created_at",
        )
        .bind(lease_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
