//! In-memory store used by the service tests. Mirrors the Postgres
//! implementation's guards: unique unit numbers and national ids, the
//! one-active-lease backstop, and the painting-fee cap check inside
//! `mark_as_paid`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{
    Lease, LeaseRentAdjustment, LeaseStatus, Payment, PaymentStatus, Tenant, Unit, UnitStatus,
};

use super::{
    AdjustmentStore, DueDayChangePlan, FeeRollup, LeaseStore, NewLease, NewPayment,
    NewRentAdjustment, NewTenant, NewUnit, PaymentStore, PaymentTotals, TenantStore, UnitStore,
};

#[derive(Default)]
struct Tables {
    units: HashMap<Uuid, Unit>,
    tenants: HashMap<Uuid, Tenant>,
    leases: HashMap<Uuid, Lease>,
    payments: HashMap<Uuid, Payment>,
    adjustments: Vec<LeaseRentAdjustment>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().expect("memory store lock");
        f(&mut tables)
    }
}

fn not_found(entity: &str) -> AppError {
    AppError::NotFound(format!("{entity} record not found."))
}

fn build_lease(lease: NewLease) -> Lease {
    Lease {
        id: Uuid::new_v4(),
        unit_id: lease.unit_id,
        tenant_id: lease.tenant_id,
        contract_signed_date: lease.contract_signed_date,
        start_date: lease.start_date,
        end_date: lease.end_date,
        payment_due_day: lease.payment_due_day,
        monthly_rent_value: lease.monthly_rent_value,
        painting_fee_total: lease.painting_fee_total,
        painting_fee_installments: lease.painting_fee_installments,
        painting_fee_paid: lease.painting_fee_paid,
        status: lease.status,
        parent_lease_id: lease.parent_lease_id,
        generation: lease.generation,
        created_at: Utc::now(),
    }
}

fn build_payment(payment: &NewPayment) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        lease_id: payment.lease_id,
        payment_type: payment.payment_type,
        reference_month: payment.reference_month,
        amount: payment.amount,
        status: PaymentStatus::Pending,
        due_date: payment.due_date,
        payment_date: None,
        payment_method: None,
        notes: payment.notes.clone(),
        created_at: Utc::now(),
    }
}

fn build_adjustment(adjustment: NewRentAdjustment) -> LeaseRentAdjustment {
    LeaseRentAdjustment {
        id: Uuid::new_v4(),
        lease_id: adjustment.lease_id,
        previous_rent_value: adjustment.previous_rent_value,
        new_rent_value: adjustment.new_rent_value,
        percentage: adjustment.percentage,
        reason: adjustment.reason,
        adjusted_by: adjustment.adjusted_by,
        created_at: Utc::now(),
    }
}

fn holds_active(status: LeaseStatus) -> bool {
    matches!(status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
}

fn sorted_by_due_date(mut payments: Vec<Payment>) -> Vec<Payment> {
    payments.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then(a.created_at.cmp(&b.created_at))
    });
    payments
}

#[async_trait]
impl UnitStore for MemoryStore {
    async fn create(&self, unit: NewUnit) -> Result<Unit, AppError> {
        self.with(|tables| {
            if tables.units.values().any(|u| u.number == unit.number) {
                return Err(AppError::Conflict(
                    "Duplicate value violates a unique constraint.".to_string(),
                ));
            }
            let record = Unit {
                id: Uuid::new_v4(),
                number: unit.number,
                floor: unit.floor,
                status: UnitStatus::Available,
                base_rent_value: unit.base_rent_value,
                renovated_rent_value: unit.renovated_rent_value,
                current_rent_value: Unit::resolve_current_rent(
                    unit.base_rent_value,
                    unit.renovated_rent_value,
                    unit.renovated,
                ),
                renovated: unit.renovated,
                created_at: Utc::now(),
            };
            tables.units.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Unit>, AppError> {
        Ok(self.with(|tables| tables.units.get(&id).cloned()))
    }

    async fn update_status(&self, id: Uuid, status: UnitStatus) -> Result<Unit, AppError> {
        self.with(|tables| {
            let unit = tables.units.get_mut(&id).ok_or_else(|| not_found("Unit"))?;
            unit.status = status;
            Ok(unit.clone())
        })
    }

    async fn list_by_status(&self, status: UnitStatus, limit: i64) -> Result<Vec<Unit>, AppError> {
        Ok(self.with(|tables| {
            let mut units: Vec<Unit> = tables
                .units
                .values()
                .filter(|u| u.status == status)
                .cloned()
                .collect();
            units.sort_by(|a, b| a.number.cmp(&b.number));
            units.truncate(limit.max(0) as usize);
            units
        }))
    }

    async fn list(&self, limit: i64) -> Result<Vec<Unit>, AppError> {
        Ok(self.with(|tables| {
            let mut units: Vec<Unit> = tables.units.values().cloned().collect();
            units.sort_by(|a, b| a.number.cmp(&b.number));
            units.truncate(limit.max(0) as usize);
            units
        }))
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn create(&self, tenant: NewTenant) -> Result<Tenant, AppError> {
        self.with(|tables| {
            if tables
                .tenants
                .values()
                .any(|t| t.national_id == tenant.national_id)
            {
                return Err(AppError::Conflict(
                    "Duplicate value violates a unique constraint.".to_string(),
                ));
            }
            let record = Tenant {
                id: Uuid::new_v4(),
                full_name: tenant.full_name,
                national_id: tenant.national_id,
                phone: tenant.phone,
                email: tenant.email,
                created_at: Utc::now(),
            };
            tables.tenants.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(self.with(|tables| tables.tenants.get(&id).cloned()))
    }

    async fn list(&self, limit: i64) -> Result<Vec<Tenant>, AppError> {
        Ok(self.with(|tables| {
            let mut tenants: Vec<Tenant> = tables.tenants.values().cloned().collect();
            tenants.sort_by(|a, b| a.full_name.cmp(&b.full_name));
            tenants.truncate(limit.max(0) as usize);
            tenants
        }))
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn create(&self, lease: NewLease) -> Result<Lease, AppError> {
        self.with(|tables| {
            let duplicate = tables.leases.values().any(|existing| {
                holds_active(existing.status)
                    && holds_active(lease.status)
                    && (existing.unit_id == lease.unit_id || existing.tenant_id == lease.tenant_id)
            });
            if duplicate {
                return Err(AppError::Conflict(
                    "Duplicate value violates a unique constraint.".to_string(),
                ));
            }
            let record = build_lease(lease);
            tables.leases.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lease>, AppError> {
        Ok(self.with(|tables| tables.leases.get(&id).cloned()))
    }

    async fn update_status(&self, id: Uuid, status: LeaseStatus) -> Result<Lease, AppError> {
        self.with(|tables| {
            let lease = tables
                .leases
                .get_mut(&id)
                .ok_or_else(|| not_found("Lease"))?;
            lease.status = status;
            Ok(lease.clone())
        })
    }

    async fn update_painting_fee_paid(&self, id: Uuid, paid: Decimal) -> Result<Lease, AppError> {
        self.with(|tables| {
            let lease = tables
                .leases
                .get_mut(&id)
                .ok_or_else(|| not_found("Lease"))?;
            if paid > lease.painting_fee_total {
                return Err(AppError::Conflict(
                    "Painting fee paid would exceed the lease total.".to_string(),
                ));
            }
            lease.painting_fee_paid = paid;
            Ok(lease.clone())
        })
    }

    async fn list(&self, status: Option<LeaseStatus>, limit: i64) -> Result<Vec<Lease>, AppError> {
        Ok(self.with(|tables| {
            let mut leases: Vec<Lease> = tables
                .leases
                .values()
                .filter(|l| status.map_or(true, |s| l.status == s))
                .cloned()
                .collect();
            leases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            leases.truncate(limit.max(0) as usize);
            leases
        }))
    }

    async fn list_expiring_within(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<Lease>, AppError> {
        let cutoff = today + Duration::days(window_days);
        Ok(self.with(|tables| {
            let mut leases: Vec<Lease> = tables
                .leases
                .values()
                .filter(|l| l.status == LeaseStatus::Active && l.end_date <= cutoff)
                .cloned()
                .collect();
            leases.sort_by_key(|l| l.end_date);
            leases
        }))
    }

    async fn list_ended_before(&self, today: NaiveDate) -> Result<Vec<Lease>, AppError> {
        Ok(self.with(|tables| {
            let mut leases: Vec<Lease> = tables
                .leases
                .values()
                .filter(|l| holds_active(l.status) && l.end_date < today)
                .cloned()
                .collect();
            leases.sort_by_key(|l| l.end_date);
            leases
        }))
    }

    async fn get_active_by_unit(&self, unit_id: Uuid) -> Result<Option<Lease>, AppError> {
        Ok(self.with(|tables| {
            tables
                .leases
                .values()
                .find(|l| l.unit_id == unit_id && holds_active(l.status))
                .cloned()
        }))
    }

    async fn get_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<Lease>, AppError> {
        Ok(self.with(|tables| {
            tables
                .leases
                .values()
                .find(|l| l.tenant_id == tenant_id && holds_active(l.status))
                .cloned()
        }))
    }

    async fn count_by_status(&self, status: LeaseStatus) -> Result<i64, AppError> {
        Ok(self.with(|tables| tables.leases.values().filter(|l| l.status == status).count() as i64))
    }

    async fn update_and_create(
        &self,
        expire_id: Uuid,
        lease: NewLease,
        adjustment: Option<NewRentAdjustment>,
    ) -> Result<Lease, AppError> {
        self.with(|tables| {
            let old = tables
                .leases
                .get_mut(&expire_id)
                .ok_or_else(|| not_found("Lease"))?;
            old.status = LeaseStatus::Expired;
            let record = build_lease(lease);
            tables.leases.insert(record.id, record.clone());
            if let Some(adjustment) = adjustment {
                tables.adjustments.push(build_adjustment(adjustment));
            }
            Ok(record)
        })
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create(&self, payment: NewPayment) -> Result<Payment, AppError> {
        self.with(|tables| {
            let record = build_payment(&payment);
            tables.payments.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self.with(|tables| tables.payments.get(&id).cloned()))
    }

    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<Payment>, AppError> {
        Ok(self.with(|tables| {
            sorted_by_due_date(
                tables
                    .payments
                    .values()
                    .filter(|p| p.lease_id == lease_id)
                    .cloned()
                    .collect(),
            )
        }))
    }

    async fn list_pending_after(
        &self,
        lease_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, AppError> {
        Ok(self.with(|tables| {
            sorted_by_due_date(
                tables
                    .payments
                    .values()
                    .filter(|p| {
                        p.lease_id == lease_id
                            && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Overdue)
                            && p.due_date > date
                    })
                    .cloned()
                    .collect(),
            )
        }))
    }

    async fn mark_as_paid(
        &self,
        id: Uuid,
        payment_date: NaiveDate,
        payment_method: &str,
        notes: Option<&str>,
        fee_rollup: Option<FeeRollup>,
    ) -> Result<Payment, AppError> {
        self.with(|tables| {
            {
                let payment = tables.payments.get(&id).ok_or_else(|| not_found("Payment"))?;
                if !payment.can_be_paid() {
                    return Err(AppError::Conflict(
                        "Payment cannot be marked as paid in its current status.".to_string(),
                    ));
                }
            }
            if let Some(rollup) = fee_rollup {
                let lease = tables
                    .leases
                    .get(&rollup.lease_id)
                    .ok_or_else(|| not_found("Lease"))?;
                if lease.painting_fee_paid + rollup.amount > lease.painting_fee_total {
                    return Err(AppError::Conflict(
                        "Painting fee paid would exceed the lease total.".to_string(),
                    ));
                }
            }
            if let Some(rollup) = fee_rollup {
                if let Some(lease) = tables.leases.get_mut(&rollup.lease_id) {
                    lease.painting_fee_paid += rollup.amount;
                }
            }
            let payment = tables.payments.get_mut(&id).ok_or_else(|| not_found("Payment"))?;
            payment.status = PaymentStatus::Paid;
            payment.payment_date = Some(payment_date);
            payment.payment_method = Some(payment_method.to_string());
            if let Some(notes) = notes {
                payment.notes = Some(notes.to_string());
            }
            Ok(payment.clone())
        })
    }

    async fn cancel(&self, id: Uuid) -> Result<Payment, AppError> {
        self.with(|tables| {
            let payment = tables
                .payments
                .get_mut(&id)
                .ok_or_else(|| not_found("Payment"))?;
            if !payment.can_be_cancelled() {
                return Err(AppError::Conflict(
                    "Payment cannot be cancelled in its current status.".to_string(),
                ));
            }
            payment.status = PaymentStatus::Cancelled;
            Ok(payment.clone())
        })
    }

    async fn mark_overdue_bulk(&self, today: NaiveDate) -> Result<u64, AppError> {
        Ok(self.with(|tables| {
            let mut promoted = 0;
            for payment in tables.payments.values_mut() {
                if payment.status == PaymentStatus::Pending && payment.due_date < today {
                    payment.status = PaymentStatus::Overdue;
                    promoted += 1;
                }
            }
            promoted
        }))
    }

    async fn list_overdue(&self, today: NaiveDate, limit: i64) -> Result<Vec<Payment>, AppError> {
        Ok(self.with(|tables| {
            let mut payments = sorted_by_due_date(
                tables
                    .payments
                    .values()
                    .filter(|p| {
                        p.status == PaymentStatus::Overdue
                            || (p.status == PaymentStatus::Pending && p.due_date < today)
                    })
                    .cloned()
                    .collect(),
            );
            payments.truncate(limit.max(0) as usize);
            payments
        }))
    }

    async fn list_upcoming(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, AppError> {
        let cutoff = today + Duration::days(days.max(0));
        Ok(self.with(|tables| {
            let mut payments = sorted_by_due_date(
                tables
                    .payments
                    .values()
                    .filter(|p| {
                        p.status == PaymentStatus::Pending
                            && p.due_date >= today
                            && p.due_date <= cutoff
                    })
                    .cloned()
                    .collect(),
            );
            payments.truncate(limit.max(0) as usize);
            payments
        }))
    }

    async fn totals_for_lease(&self, lease_id: Uuid) -> Result<PaymentTotals, AppError> {
        Ok(self.with(|tables| {
            let mut totals = PaymentTotals::default();
            for payment in tables.payments.values().filter(|p| p.lease_id == lease_id) {
                match payment.status {
                    PaymentStatus::Paid => {
                        totals.paid_amount += payment.amount;
                        totals.paid_count += 1;
                    }
                    PaymentStatus::Pending => {
                        totals.pending_amount += payment.amount;
                        totals.pending_count += 1;
                    }
                    PaymentStatus::Overdue => {
                        totals.overdue_amount += payment.amount;
                        totals.overdue_count += 1;
                    }
                    PaymentStatus::Cancelled => {}
                }
            }
            totals
        }))
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64, AppError> {
        Ok(self.with(|tables| {
            tables.payments.values().filter(|p| p.status == status).count() as i64
        }))
    }

    async fn apply_due_day_change(
        &self,
        plan: DueDayChangePlan,
    ) -> Result<Option<Payment>, AppError> {
        self.with(|tables| {
            if !tables.leases.contains_key(&plan.lease_id) {
                return Err(not_found("Lease"));
            }
            let proportional = plan.proportional.as_ref().map(|payment| {
                let record = build_payment(payment);
                tables.payments.insert(record.id, record.clone());
                record
            });
            if let Some(cancel_id) = plan.cancel_payment_id {
                if let Some(payment) = tables.payments.get_mut(&cancel_id) {
                    payment.status = PaymentStatus::Cancelled;
                }
            }
            for reschedule in &plan.reschedules {
                if let Some(payment) = tables.payments.get_mut(&reschedule.payment_id) {
                    payment.due_date = reschedule.new_due_date;
                }
            }
            if let Some(lease) = tables.leases.get_mut(&plan.lease_id) {
                lease.payment_due_day = plan.new_due_day;
            }
            Ok(proportional)
        })
    }
}

#[async_trait]
impl AdjustmentStore for MemoryStore {
    async fn create(&self, adjustment: NewRentAdjustment) -> Result<LeaseRentAdjustment, AppError> {
        Ok(self.with(|tables| {
            let record = build_adjustment(adjustment);
            tables.adjustments.push(record.clone());
            record
        }))
    }

    async fn list_by_lease(&self, lease_id: Uuid) -> Result<Vec<LeaseRentAdjustment>, AppError> {
        Ok(self.with(|tables| {
            tables
                .adjustments
                .iter()
                .filter(|a| a.lease_id == lease_id)
                .cloned()
                .collect()
        }))
    }
}
