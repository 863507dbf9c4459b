//! Owns the lease state machine: creation, renewal, cancellation, expiry and
//! the expiring-soon / auto-renew sweeps. Coordinates unit occupancy and
//! delegates payment materialization to the schedule builders.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::model::{
    contract_end_date, Lease, LeaseStatus, Payment, PaymentType, RenewalPolicy, UnitStatus,
    EXPIRING_SOON_WINDOW_DAYS,
};
use crate::repository::{
    LeaseStore, NewLease, NewPayment, NewRentAdjustment, PaymentStore, TenantStore, UnitStore,
};
use crate::services::payment_schedule::{painting_fee_entries, rent_schedule_entries};

#[derive(Debug, Clone)]
pub struct CreateLeaseCommand {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub contract_signed_date: NaiveDate,
    pub start_date: NaiveDate,
    pub payment_due_day: i16,
    pub monthly_rent_value: Decimal,
    pub painting_fee_total: Decimal,
    pub painting_fee_installments: i16,
}

#[derive(Debug, Clone)]
pub struct RenewLeaseCommand {
    pub lease_id: Uuid,
    pub painting_fee_total: Decimal,
    pub painting_fee_installments: i16,
    pub new_rent_value: Option<Decimal>,
    pub reason: Option<String>,
    pub adjusted_by: Option<Uuid>,
}

/// A payment row that failed to persist during otherwise-successful lease
/// creation or renewal. Reported to the caller for backfilling, never fatal.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationError {
    pub payment_type: PaymentType,
    pub reference_month: NaiveDate,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct CreatedLease {
    pub lease: Lease,
    pub payments: Vec<Payment>,
    pub generation_errors: Vec<GenerationError>,
}

#[derive(Debug, Clone)]
pub struct CancelledLease {
    pub lease: Lease,
    pub cancelled_payments: Vec<Payment>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AutoRenewSummary {
    pub renewed: u32,
    pub skipped_for_adjustment: u32,
    pub errors: u32,
}

#[derive(Clone)]
pub struct LeaseLifecycleService {
    units: Arc<dyn UnitStore>,
    tenants: Arc<dyn TenantStore>,
    leases: Arc<dyn LeaseStore>,
    payments: Arc<dyn PaymentStore>,
    policy: RenewalPolicy,
}

impl LeaseLifecycleService {
    pub fn new(
        units: Arc<dyn UnitStore>,
        tenants: Arc<dyn TenantStore>,
        leases: Arc<dyn LeaseStore>,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            units,
            tenants,
            leases,
            payments,
            policy: RenewalPolicy::default(),
        }
    }

    pub async fn create(&self, command: CreateLeaseCommand) -> Result<CreatedLease, LifecycleError> {
        if !(1..=31).contains(&command.payment_due_day) {
            return Err(LifecycleError::InvalidDueDay(command.payment_due_day));
        }
        if !(1..=4).contains(&command.painting_fee_installments) {
            return Err(LifecycleError::InvalidInstallments(
                command.painting_fee_installments,
            ));
        }
        if command.monthly_rent_value <= Decimal::ZERO {
            return Err(LifecycleError::InvalidRentValue);
        }
        if command.painting_fee_total < Decimal::ZERO {
            return Err(LifecycleError::InvalidPaymentAmount);
        }

        let unit = self
            .units
            .get(command.unit_id)
            .await?
            .ok_or(LifecycleError::UnitNotFound(command.unit_id))?;
        if unit.status != UnitStatus::Available {
            return Err(LifecycleError::UnitNotAvailable(unit.id));
        }
        if self.leases.get_active_by_unit(unit.id).await?.is_some() {
            return Err(LifecycleError::UnitAlreadyHasActiveLease(unit.id));
        }

        let tenant = self
            .tenants
            .get(command.tenant_id)
            .await?
            .ok_or(LifecycleError::TenantNotFound(command.tenant_id))?;
        if self.leases.get_active_by_tenant(tenant.id).await?.is_some() {
            return Err(LifecycleError::TenantAlreadyHasActiveLease(tenant.id));
        }

        let lease = self
            .leases
            .create(NewLease {
                unit_id: unit.id,
                tenant_id: tenant.id,
                contract_signed_date: command.contract_signed_date,
                start_date: command.start_date,
                end_date: contract_end_date(command.start_date),
                payment_due_day: command.payment_due_day,
                monthly_rent_value: command.monthly_rent_value,
                painting_fee_total: command.painting_fee_total,
                painting_fee_installments: command.painting_fee_installments,
                painting_fee_paid: Decimal::ZERO,
                status: LeaseStatus::Active,
                parent_lease_id: None,
                generation: 1,
            })
            .await?;

        self.units.update_status(unit.id, UnitStatus::Occupied).await?;

        let mut entries = rent_schedule_entries(&lease);
        if lease.painting_fee_total > Decimal::ZERO {
            entries.extend(painting_fee_entries(
                &lease,
                lease.painting_fee_total,
                lease.painting_fee_installments,
            )?);
        }
        let (payments, generation_errors) = self.persist_entries(entries).await;

        info!(
            lease_id = %lease.id,
            unit_id = %unit.id,
            tenant_id = %tenant.id,
            payments = payments.len(),
            failed = generation_errors.len(),
            "Lease created"
        );

        Ok(CreatedLease {
            lease,
            payments,
            generation_errors,
        })
    }

    pub async fn renew(&self, command: RenewLeaseCommand) -> Result<CreatedLease, LifecycleError> {
        let old = self
            .leases
            .get(command.lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(command.lease_id))?;
        if !old.can_be_renewed() {
            return Err(LifecycleError::CannotRenewLease(old.id));
        }
        if !(1..=4).contains(&command.painting_fee_installments) {
            return Err(LifecycleError::InvalidInstallments(
                command.painting_fee_installments,
            ));
        }
        // The fee already collected travels with the chain; the new total may
        // not undercut it.
        if command.painting_fee_total < old.painting_fee_paid {
            return Err(LifecycleError::PaintingFeePaidExceedsTotal);
        }

        let unit = self
            .units
            .get(old.unit_id)
            .await?
            .ok_or(LifecycleError::UnitNotFound(old.unit_id))?;

        let rent = command.new_rent_value.unwrap_or(unit.current_rent_value);
        if rent <= Decimal::ZERO {
            return Err(LifecycleError::InvalidRentValue);
        }

        let adjustment = command.new_rent_value.map(|new_rent| NewRentAdjustment {
            lease_id: old.id,
            previous_rent_value: old.monthly_rent_value,
            new_rent_value: new_rent,
            percentage: percentage_change(old.monthly_rent_value, new_rent),
            reason: command.reason.clone(),
            adjusted_by: command.adjusted_by,
        });

        let start_date = old.end_date + Duration::days(1);
        let lease = self
            .leases
            .update_and_create(
                old.id,
                NewLease {
                    unit_id: old.unit_id,
                    tenant_id: old.tenant_id,
                    contract_signed_date: start_date,
                    start_date,
                    end_date: contract_end_date(start_date),
                    payment_due_day: old.payment_due_day,
                    monthly_rent_value: rent,
                    painting_fee_total: command.painting_fee_total,
                    painting_fee_installments: command.painting_fee_installments,
                    painting_fee_paid: old.painting_fee_paid,
                    status: LeaseStatus::Active,
                    parent_lease_id: Some(old.id),
                    generation: old.generation + 1,
                },
                adjustment,
            )
            .await?;

        // Painting fee is a first-contract-only charge: only rent is
        // regenerated for the new term.
        let (payments, generation_errors) =
            self.persist_entries(rent_schedule_entries(&lease)).await;

        info!(
            lease_id = %lease.id,
            parent_lease_id = %old.id,
            generation = lease.generation,
            rent_adjusted = command.new_rent_value.is_some(),
            "Lease renewed"
        );

        Ok(CreatedLease {
            lease,
            payments,
            generation_errors,
        })
    }

    pub async fn cancel(&self, lease_id: Uuid) -> Result<Lease, LifecycleError> {
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        match lease.status {
            LeaseStatus::Expired => return Err(LifecycleError::LeaseAlreadyExpired(lease.id)),
            LeaseStatus::Cancelled => return Err(LifecycleError::CannotCancelLease(lease.id)),
            LeaseStatus::Active | LeaseStatus::ExpiringSoon => {}
        }

        let cancelled = self.leases.update_status(lease.id, LeaseStatus::Cancelled).await?;
        self.units
            .update_status(lease.unit_id, UnitStatus::Available)
            .await?;

        info!(lease_id = %lease.id, unit_id = %lease.unit_id, "Lease cancelled");
        Ok(cancelled)
    }

    /// Cancel a lease together with a caller-selected subset of its pending
    /// or overdue payments. Payments already settled are left untouched.
    pub async fn cancel_with_payments(
        &self,
        lease_id: Uuid,
        payment_ids: &[Uuid],
    ) -> Result<CancelledLease, LifecycleError> {
        let mut selected = Vec::with_capacity(payment_ids.len());
        for payment_id in payment_ids {
            let payment = self
                .payments
                .get(*payment_id)
                .await?
                .ok_or(LifecycleError::PaymentNotFound(*payment_id))?;
            if payment.lease_id != lease_id {
                return Err(LifecycleError::PaymentNotOnLease {
                    payment: payment.id,
                    lease: lease_id,
                });
            }
            selected.push(payment);
        }

        let lease = self.cancel(lease_id).await?;

        let mut cancelled_payments = Vec::new();
        for payment in selected {
            if !payment.can_be_cancelled() {
                continue;
            }
            match self.payments.cancel(payment.id).await {
                Ok(cancelled) => cancelled_payments.push(cancelled),
                Err(error) => {
                    warn!(payment_id = %payment.id, error = %error, "Failed to cancel payment")
                }
            }
        }

        Ok(CancelledLease {
            lease,
            cancelled_payments,
        })
    }

    /// Expire a lease whose end date has passed and release its unit.
    /// Calling it on an already-terminal lease is a no-op.
    pub async fn mark_expired(
        &self,
        lease_id: Uuid,
        today: NaiveDate,
    ) -> Result<Lease, LifecycleError> {
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        if matches!(lease.status, LeaseStatus::Expired | LeaseStatus::Cancelled) {
            return Ok(lease);
        }
        if !lease.is_ended(today) {
            return Err(LifecycleError::LeaseNotEnded(lease.id));
        }

        let expired = self.leases.update_status(lease.id, LeaseStatus::Expired).await?;
        self.units
            .update_status(lease.unit_id, UnitStatus::Available)
            .await?;

        info!(lease_id = %lease.id, unit_id = %lease.unit_id, "Lease expired");
        Ok(expired)
    }

    /// Move active leases within the 45-day window of their end date to
    /// `expiring_soon`. Leases already transitioned are not returned by the
    /// store, which makes the sweep idempotent.
    pub async fn check_expiring_soon(&self, today: NaiveDate) -> Result<u32, LifecycleError> {
        let candidates = self
            .leases
            .list_expiring_within(today, EXPIRING_SOON_WINDOW_DAYS)
            .await?;
        let mut transitioned = 0;
        for lease in candidates {
            self.leases
                .update_status(lease.id, LeaseStatus::ExpiringSoon)
                .await?;
            transitioned += 1;
        }
        if transitioned > 0 {
            info!(transitioned, "Expiring-soon check completed");
        }
        Ok(transitioned)
    }

    /// Expire every lease past its end date and release the units.
    pub async fn expire_ended(&self, today: NaiveDate) -> Result<u32, LifecycleError> {
        let ended = self.leases.list_ended_before(today).await?;
        let mut expired = 0;
        for lease in ended {
            self.leases.update_status(lease.id, LeaseStatus::Expired).await?;
            self.units
                .update_status(lease.unit_id, UnitStatus::Available)
                .await?;
            expired += 1;
        }
        if expired > 0 {
            info!(expired, "Expired-lease scan completed");
        }
        Ok(expired)
    }

    /// Renew every expiring lease except the ones due for a manual rent
    /// review under the renewal policy.
    pub async fn auto_renew(&self) -> Result<AutoRenewSummary, LifecycleError> {
        let expiring = self
            .leases
            .list(Some(LeaseStatus::ExpiringSoon), 1000)
            .await?;
        let mut summary = AutoRenewSummary::default();
        for lease in expiring {
            if lease.should_apply_annual_adjustment(&self.policy) {
                summary.skipped_for_adjustment += 1;
                continue;
            }
            let command = RenewLeaseCommand {
                lease_id: lease.id,
                painting_fee_total: lease.painting_fee_total,
                painting_fee_installments: lease.painting_fee_installments,
                new_rent_value: None,
                reason: None,
                adjusted_by: None,
            };
            match self.renew(command).await {
                Ok(_) => summary.renewed += 1,
                Err(error) => {
                    warn!(lease_id = %lease.id, error = %error, "Auto-renew failed");
                    summary.errors += 1;
                }
            }
        }
        info!(
            renewed = summary.renewed,
            skipped = summary.skipped_for_adjustment,
            errors = summary.errors,
            "Auto-renew scan completed"
        );
        Ok(summary)
    }

    /// Persist generated payment entries one by one; a failing row is logged
    /// and reported, never fatal to the surrounding operation.
    async fn persist_entries(
        &self,
        entries: Vec<NewPayment>,
    ) -> (Vec<Payment>, Vec<GenerationError>) {
        let mut payments = Vec::with_capacity(entries.len());
        let mut generation_errors = Vec::new();
        for entry in entries {
            match self.payments.create(entry.clone()).await {
                Ok(payment) => payments.push(payment),
                Err(error) => {
                    warn!(
                        lease_id = %entry.lease_id,
                        payment_type = entry.payment_type.as_str(),
                        reference_month = %entry.reference_month,
                        error = %error,
                        "Failed to generate payment"
                    );
                    generation_errors.push(GenerationError {
                        payment_type: entry.payment_type,
                        reference_month: entry.reference_month,
                        detail: error.to_string(),
                    });
                }
            }
        }
        (payments, generation_errors)
    }
}

fn percentage_change(previous: Decimal, new: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    ((new - previous) / previous * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
