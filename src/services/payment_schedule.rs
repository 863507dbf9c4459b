//! Builds the payment sets tied to a lease: monthly rent installments,
//! painting-fee installments and ad-hoc adjustment entries.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::model::{
    add_months, due_date_in_month, first_of_month, Lease, Payment, PaymentType,
    CONTRACT_LENGTH_MONTHS,
};
use crate::repository::{LeaseStore, NewPayment, PaymentStore};

/// One rent entry for the calendar month of `reference_month`, due on the
/// lease's due day (clamped in short months).
pub fn monthly_rent_entry(lease: &Lease, reference_month: NaiveDate) -> NewPayment {
    let reference_month = first_of_month(reference_month);
    NewPayment {
        lease_id: lease.id,
        payment_type: PaymentType::Rent,
        reference_month,
        amount: lease.monthly_rent_value,
        due_date: due_date_in_month(reference_month, lease.payment_due_day),
        notes: None,
    }
}

/// The full rent schedule of a contract: one entry per calendar month,
/// starting in the month the lease starts.
pub fn rent_schedule_entries(lease: &Lease) -> Vec<NewPayment> {
    let first = first_of_month(lease.start_date);
    (0..CONTRACT_LENGTH_MONTHS)
        .map(|offset| monthly_rent_entry(lease, add_months(first, offset)))
        .collect()
}

/// Painting-fee installments staggered one per month from the lease start.
/// The division remainder lands on the first installment so the entries
/// always sum exactly to the total.
pub fn painting_fee_entries(
    lease: &Lease,
    total: Decimal,
    installments: i16,
) -> Result<Vec<NewPayment>, LifecycleError> {
    if !(1..=4).contains(&installments) {
        return Err(LifecycleError::InvalidInstallments(installments));
    }
    if total <= Decimal::ZERO {
        return Err(LifecycleError::InvalidPaymentAmount);
    }

    let amounts = split_installments(total, installments);
    let first = first_of_month(lease.start_date);
    Ok(amounts
        .into_iter()
        .enumerate()
        .map(|(index, amount)| {
            let reference_month = add_months(first, index as u32);
            NewPayment {
                lease_id: lease.id,
                payment_type: PaymentType::PaintingFee,
                reference_month,
                amount,
                due_date: due_date_in_month(reference_month, lease.payment_due_day),
                notes: Some(format!(
                    "Painting fee installment {}/{}",
                    index + 1,
                    installments
                )),
            }
        })
        .collect())
}

fn split_installments(total: Decimal, count: i16) -> Vec<Decimal> {
    let count_dec = Decimal::from(count);
    let each = (total / count_dec).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut amounts = vec![each; count as usize];
    amounts[0] = total - each * (count_dec - Decimal::ONE);
    amounts
}

/// Persisted generation operations, used by the HTTP layer for backfilling
/// rent gaps and for one-off adjustment charges.
#[derive(Clone)]
pub struct PaymentScheduleService {
    leases: Arc<dyn LeaseStore>,
    payments: Arc<dyn PaymentStore>,
}

impl PaymentScheduleService {
    pub fn new(leases: Arc<dyn LeaseStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { leases, payments }
    }

    pub async fn generate_monthly_rent_payment(
        &self,
        lease_id: Uuid,
        reference_month: NaiveDate,
    ) -> Result<Payment, LifecycleError> {
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        let entry = monthly_rent_entry(&lease, reference_month);
        Ok(self.payments.create(entry).await?)
    }

    /// Persist the painting-fee installments for a lease, e.g. to backfill
    /// rows that failed during creation. `installments` defaults to the
    /// count recorded on the lease.
    pub async fn generate_painting_fee_payments(
        &self,
        lease_id: Uuid,
        installments: Option<i16>,
    ) -> Result<Vec<Payment>, LifecycleError> {
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        let installments = installments.unwrap_or(lease.painting_fee_installments);
        let entries = painting_fee_entries(&lease, lease.painting_fee_total, installments)?;
        let mut payments = Vec::with_capacity(entries.len());
        for entry in entries {
            payments.push(self.payments.create(entry).await?);
        }
        Ok(payments)
    }

    pub async fn generate_adjustment_payment(
        &self,
        lease_id: Uuid,
        amount: Decimal,
        reference_month: NaiveDate,
        due_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Payment, LifecycleError> {
        if amount <= Decimal::ZERO {
            return Err(LifecycleError::InvalidPaymentAmount);
        }
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        let entry = NewPayment {
            lease_id: lease.id,
            payment_type: PaymentType::Adjustment,
            reference_month: first_of_month(reference_month),
            amount,
            due_date,
            notes,
        };
        Ok(self.payments.create(entry).await?)
    }
}
