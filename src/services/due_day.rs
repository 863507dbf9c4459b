//! Mid-contract due-day changes: one proportional settlement payment for the
//! gap between the old and new cycle, plus a rewrite of every affected
//! future due date, applied as a single store transaction.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::model::{
    due_date_in_month, first_of_month, sub_months, LeaseStatus, Payment, PaymentStatus,
    PaymentType, PRORATION_MONTH_DAYS,
};
use crate::repository::{
    DueDayChangePlan, LeaseStore, NewPayment, PaymentReschedule, PaymentStore,
};

#[derive(Debug, Clone, Serialize)]
pub struct ProportionalCharge {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub days: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupersededPayment {
    pub payment_id: Uuid,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduledPayment {
    pub payment_id: Uuid,
    pub reference_month: NaiveDate,
    pub previous_due_date: NaiveDate,
    pub new_due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DueDayChangeReport {
    pub lease_id: Uuid,
    pub previous_due_day: i16,
    pub new_due_day: i16,
    pub effective_date: NaiveDate,
    pub proportional: Option<ProportionalCharge>,
    pub superseded: Option<SupersededPayment>,
    pub rescheduled: Vec<RescheduledPayment>,
}

#[derive(Clone)]
pub struct DueDayChangeService {
    leases: Arc<dyn LeaseStore>,
    payments: Arc<dyn PaymentStore>,
}

impl DueDayChangeService {
    pub fn new(leases: Arc<dyn LeaseStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { leases, payments }
    }

    pub async fn change_payment_due_day(
        &self,
        lease_id: Uuid,
        new_due_day: i16,
        effective_date: NaiveDate,
        reason: Option<String>,
        today: NaiveDate,
    ) -> Result<DueDayChangeReport, LifecycleError> {
        let lease = self
            .leases
            .get(lease_id)
            .await?
            .ok_or(LifecycleError::LeaseNotFound(lease_id))?;
        if !matches!(
            lease.status,
            LeaseStatus::Active | LeaseStatus::ExpiringSoon
        ) {
            return Err(LifecycleError::CannotChangeDueDay(lease.id));
        }
        if !(1..=31).contains(&new_due_day) {
            return Err(LifecycleError::InvalidDueDay(new_due_day));
        }
        if new_due_day == lease.payment_due_day {
            return Err(LifecycleError::DueDayUnchanged);
        }
        if effective_date < today {
            return Err(LifecycleError::InvalidEffectiveDate(
                "the effective date must not be in the past.".to_string(),
            ));
        }
        if effective_date < lease.start_date || effective_date > lease.end_date {
            return Err(LifecycleError::InvalidEffectiveDate(
                "the effective date must fall within the contract period.".to_string(),
            ));
        }

        let history = self.payments.list_by_lease(lease.id).await?;

        // Never reach back over already-settled cycles.
        let last_settled = history
            .iter()
            .filter(|p| {
                matches!(p.status, PaymentStatus::Paid | PaymentStatus::Cancelled)
            })
            .map(|p| p.due_date)
            .max();
        if let Some(settled) = last_settled {
            if effective_date < settled {
                return Err(LifecycleError::InvalidEffectiveDate(
                    "the effective date precedes already-settled payments.".to_string(),
                ));
            }
        }

        // The proration substitutes exactly one billing cycle: reject dates
        // so far out that a second old-schedule payment would come due first.
        let skipped_cycles = history
            .iter()
            .filter(|p| {
                p.status == PaymentStatus::Pending
                    && p.due_date >= today
                    && p.due_date <= effective_date
            })
            .count();
        if skipped_cycles > 1 {
            return Err(LifecycleError::InvalidEffectiveDate(
                "the change may span at most one billing cycle.".to_string(),
            ));
        }

        let last_old_due = last_due_on_or_before(effective_date, lease.payment_due_day);
        let proportional_days = (effective_date - last_old_due).num_days();
        let proportional_amount = (lease.monthly_rent_value
            / Decimal::from(PRORATION_MONTH_DAYS)
            * Decimal::from(proportional_days))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let proportional = if proportional_days > 0 && proportional_amount > Decimal::ZERO {
            let mut notes = format!(
                "Proportional charge for due-day change from day {} to day {}: {} day(s) from {} to {}",
                lease.payment_due_day, new_due_day, proportional_days, last_old_due, effective_date
            );
            if let Some(reason) = reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                notes.push_str(&format!(" ({reason})"));
            }
            Some(NewPayment {
                lease_id: lease.id,
                payment_type: PaymentType::Adjustment,
                reference_month: first_of_month(effective_date),
                amount: proportional_amount,
                due_date: effective_date,
                notes: Some(notes),
            })
        } else {
            None
        };

        let future = self
            .payments
            .list_pending_after(lease.id, effective_date)
            .await?;
        let (superseded, remaining) = match future.split_first() {
            Some((first, rest)) => (Some(first.clone()), rest.to_vec()),
            None => (None, Vec::new()),
        };

        let reschedules: Vec<(Payment, NaiveDate)> = remaining
            .into_iter()
            .map(|payment| {
                let new_due = due_date_in_month(payment.reference_month, new_due_day);
                (payment, new_due)
            })
            .collect();

        let created = self
            .payments
            .apply_due_day_change(DueDayChangePlan {
                lease_id: lease.id,
                new_due_day,
                proportional,
                cancel_payment_id: superseded.as_ref().map(|p| p.id),
                reschedules: reschedules
                    .iter()
                    .map(|(payment, new_due)| PaymentReschedule {
                        payment_id: payment.id,
                        new_due_date: *new_due,
                    })
                    .collect(),
            })
            .await?;

        info!(
            lease_id = %lease.id,
            previous_due_day = lease.payment_due_day,
            new_due_day,
            proportional_days,
            rescheduled = reschedules.len(),
            "Payment due day changed"
        );

        Ok(DueDayChangeReport {
            lease_id: lease.id,
            previous_due_day: lease.payment_due_day,
            new_due_day,
            effective_date,
            proportional: created.map(|payment| ProportionalCharge {
                payment_id: payment.id,
                amount: payment.amount,
                days: proportional_days,
                period_start: last_old_due,
                period_end: effective_date,
            }),
            superseded: superseded.map(|payment| SupersededPayment {
                payment_id: payment.id,
                due_date: payment.due_date,
            }),
            rescheduled: reschedules
                .into_iter()
                .map(|(payment, new_due)| RescheduledPayment {
                    payment_id: payment.id,
                    reference_month: payment.reference_month,
                    previous_due_date: payment.due_date,
                    new_due_date: new_due,
                })
                .collect(),
        })
    }
}

/// The due date under `due_day` that most recently preceded (or equals) the
/// given date, rolling back one month when the date sits before the due day
/// of its own month.
fn last_due_on_or_before(date: NaiveDate, due_day: i16) -> NaiveDate {
    let in_month = due_date_in_month(date, due_day);
    if date >= in_month {
        in_month
    } else {
        due_date_in_month(sub_months(first_of_month(date), 1), due_day)
    }
}
