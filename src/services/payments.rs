//! Payment ledger operations: settling, cancelling and aggregate lookups.
//! Settling a painting-fee installment also rolls its amount up into the
//! lease's fee total, atomically with the payment update.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::model::{Payment, PaymentType};
use crate::repository::{FeeRollup, LeaseStore, PaymentStore, PaymentTotals};

#[derive(Clone)]
pub struct PaymentLedgerService {
    leases: Arc<dyn LeaseStore>,
    payments: Arc<dyn PaymentStore>,
}

impl PaymentLedgerService {
    pub fn new(leases: Arc<dyn LeaseStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { leases, payments }
    }

    pub async fn mark_payment_as_paid(
        &self,
        payment_id: Uuid,
        payment_date: NaiveDate,
        payment_method: &str,
        notes: Option<&str>,
    ) -> Result<Payment, LifecycleError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(LifecycleError::PaymentNotFound(payment_id))?;
        if !payment.can_be_paid() {
            return Err(LifecycleError::PaymentNotPayable(payment.id));
        }

        // Painting-fee installments roll up into the lease; the store applies
        // both writes in one transaction and re-checks the cap.
        let fee_rollup = if payment.payment_type == PaymentType::PaintingFee {
            let lease = self
                .leases
                .get(payment.lease_id)
                .await?
                .ok_or(LifecycleError::LeaseNotFound(payment.lease_id))?;
            if lease.painting_fee_paid + payment.amount > lease.painting_fee_total {
                return Err(LifecycleError::PaintingFeePaidExceedsTotal);
            }
            Some(FeeRollup {
                lease_id: lease.id,
                amount: payment.amount,
            })
        } else {
            None
        };

        let paid = self
            .payments
            .mark_as_paid(payment.id, payment_date, payment_method, notes, fee_rollup)
            .await?;

        info!(
            payment_id = %paid.id,
            lease_id = %paid.lease_id,
            payment_type = paid.payment_type.as_str(),
            amount = %paid.amount,
            "Payment settled"
        );
        Ok(paid)
    }

    pub async fn cancel_payment(&self, payment_id: Uuid) -> Result<Payment, LifecycleError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(LifecycleError::PaymentNotFound(payment_id))?;
        if !payment.can_be_cancelled() {
            return Err(LifecycleError::CannotCancelPayment(payment.id));
        }
        Ok(self.payments.cancel(payment.id).await?)
    }

    pub async fn totals_for_lease(
        &self,
        lease_id: Uuid,
    ) -> Result<PaymentTotals, LifecycleError> {
        if self.leases.get(lease_id).await?.is_none() {
            return Err(LifecycleError::LeaseNotFound(lease_id));
        }
        Ok(self.payments.totals_for_lease(lease_id).await?)
    }

    pub async fn list_overdue(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Payment>, LifecycleError> {
        Ok(self.payments.list_overdue(today, limit).await?)
    }

    pub async fn list_upcoming(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, LifecycleError> {
        Ok(self.payments.list_upcoming(today, days, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeaseStatus, PaymentStatus};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{NewLease, NewPayment};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    async fn seed_lease(store: &MemoryStore, fee_total: Decimal) -> Uuid {
        LeaseStore::create(
            store,
            NewLease {
                unit_id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                contract_signed_date: date(2026, 1, 1),
                start_date: date(2026, 1, 1),
                end_date: date(2026, 7, 1),
                payment_due_day: 10,
                monthly_rent_value: dec!(1500.00),
                painting_fee_total: fee_total,
                painting_fee_installments: 2,
                painting_fee_paid: Decimal::ZERO,
                status: LeaseStatus::Active,
                parent_lease_id: None,
                generation: 1,
            },
        )
        .await
        .expect("lease")
        .id
    }

    async fn seed_payment(
        store: &MemoryStore,
        lease_id: Uuid,
        payment_type: PaymentType,
        amount: Decimal,
        due: NaiveDate,
    ) -> Uuid {
        PaymentStore::create(
            store,
            NewPayment {
                lease_id,
                payment_type,
                reference_month: date(due.year(), due.month(), 1),
                amount,
                due_date: due,
                notes: None,
            },
        )
        .await
        .expect("payment")
        .id
    }

    use chrono::Datelike;

    #[tokio::test]
    async fn marking_paid_records_date_and_method() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = seed_lease(&store, Decimal::ZERO).await;
        let payment_id = seed_payment(
            &store,
            lease_id,
            PaymentType::Rent,
            dec!(1500.00),
            date(2026, 2, 10),
        )
        .await;
        let service = PaymentLedgerService::new(store.clone(), store.clone());

        let paid = service
            .mark_payment_as_paid(payment_id, date(2026, 2, 9), "transfer", None)
            .await
            .expect("settled");
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.payment_date, Some(date(2026, 2, 9)));
        assert_eq!(paid.payment_method.as_deref(), Some("transfer"));

        // Settling twice is rejected.
        assert!(matches!(
            service
                .mark_payment_as_paid(payment_id, date(2026, 2, 10), "cash", None)
                .await,
            Err(LifecycleError::PaymentNotPayable(_))
        ));
    }

    #[tokio::test]
    async fn painting_fee_payment_rolls_up_into_lease() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = seed_lease(&store, dec!(300.00)).await;
        let first = seed_payment(
            &store,
            lease_id,
            PaymentType::PaintingFee,
            dec!(150.00),
            date(2026, 1, 10),
        )
        .await;
        let second = seed_payment(
            &store,
            lease_id,
            PaymentType::PaintingFee,
            dec!(150.00),
            date(2026, 2, 10),
        )
        .await;
        let service = PaymentLedgerService::new(store.clone(), store.clone());

        service
            .mark_payment_as_paid(first, date(2026, 1, 10), "cash", None)
            .await
            .expect("settled");
        service
            .mark_payment_as_paid(second, date(2026, 2, 10), "cash", None)
            .await
            .expect("settled");

        let lease = LeaseStore::get(store.as_ref(), lease_id)
            .await
            .expect("store ok")
            .expect("lease exists");
        assert_eq!(lease.painting_fee_paid, dec!(300.00));
    }

    #[tokio::test]
    async fn fee_rollup_rejects_exceeding_the_total_without_mutation() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = seed_lease(&store, dec!(300.00)).await;
        let oversized = seed_payment(
            &store,
            lease_id,
            PaymentType::PaintingFee,
            dec!(400.00),
            date(2026, 1, 10),
        )
        .await;
        let service = PaymentLedgerService::new(store.clone(), store.clone());

        let err = service
            .mark_payment_as_paid(oversized, date(2026, 1, 10), "cash", None)
            .await
            .expect_err("cap exceeded");
        assert!(matches!(err, LifecycleError::PaintingFeePaidExceedsTotal));

        // Neither side mutated.
        let payment = PaymentStore::get(store.as_ref(), oversized)
            .await
            .expect("store ok")
            .expect("payment exists");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.payment_date, None);
        let lease = LeaseStore::get(store.as_ref(), lease_id)
            .await
            .expect("store ok")
            .expect("lease exists");
        assert_eq!(lease.painting_fee_paid, Decimal::ZERO);
    }

    #[tokio::test]
    async fn cancelling_a_paid_payment_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = seed_lease(&store, Decimal::ZERO).await;
        let payment_id = seed_payment(
            &store,
            lease_id,
            PaymentType::Rent,
            dec!(1500.00),
            date(2026, 2, 10),
        )
        .await;
        let service = PaymentLedgerService::new(store.clone(), store.clone());
        service
            .mark_payment_as_paid(payment_id, date(2026, 2, 9), "transfer", None)
            .await
            .expect("settled");

        assert!(matches!(
            service.cancel_payment(payment_id).await,
            Err(LifecycleError::CannotCancelPayment(_))
        ));
    }

    #[tokio::test]
    async fn totals_aggregate_by_status() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = seed_lease(&store, Decimal::ZERO).await;
        let a = seed_payment(&store, lease_id, PaymentType::Rent, dec!(1500.00), date(2026, 1, 10)).await;
        seed_payment(&store, lease_id, PaymentType::Rent, dec!(1500.00), date(2026, 2, 10)).await;
        let c = seed_payment(&store, lease_id, PaymentType::Rent, dec!(1500.00), date(2026, 3, 10)).await;
        let service = PaymentLedgerService::new(store.clone(), store.clone());

        service
            .mark_payment_as_paid(a, date(2026, 1, 10), "cash", None)
            .await
            .expect("settled");
        service.cancel_payment(c).await.expect("cancelled");

        let totals = service.totals_for_lease(lease_id).await.expect("totals");
        assert_eq!(totals.paid_amount, dec!(1500.00));
        assert_eq!(totals.paid_count, 1);
        assert_eq!(totals.pending_amount, dec!(1500.00));
        assert_eq!(totals.pending_count, 1);
        assert_eq!(totals.overdue_count, 0);
    }
}
