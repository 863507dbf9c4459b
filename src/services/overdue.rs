//! Periodic promotion of pending payments past their due date to `overdue`.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::error::LifecycleError;
use crate::repository::PaymentStore;

#[derive(Clone)]
pub struct OverdueSweeper {
    payments: Arc<dyn PaymentStore>,
}

impl OverdueSweeper {
    pub fn new(payments: Arc<dyn PaymentStore>) -> Self {
        Self { payments }
    }

    /// One store-side bulk transition; rows already overdue are unaffected,
    /// so running the sweep twice is a no-op the second time.
    pub async fn check_overdue_payments(&self, today: NaiveDate) -> Result<u64, LifecycleError> {
        let promoted = self.payments.mark_overdue_bulk(today).await?;
        if promoted > 0 {
            info!(promoted, "Overdue sweep completed");
        }
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentStatus, PaymentType};
    use crate::repository::memory::MemoryStore;
    use crate::repository::NewPayment;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn rent_due(lease_id: Uuid, due: NaiveDate) -> NewPayment {
        NewPayment {
            lease_id,
            payment_type: PaymentType::Rent,
            reference_month: date(due.year(), due.month(), 1),
            amount: dec!(1500.00),
            due_date: due,
            notes: None,
        }
    }

    use chrono::Datelike;

    #[tokio::test]
    async fn sweep_promotes_only_past_due_pending_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let lease_id = Uuid::new_v4();
        let past = PaymentStore::create(store.as_ref(), rent_due(lease_id, date(2026, 3, 10)))
            .await
            .expect("payment");
        let future = PaymentStore::create(store.as_ref(), rent_due(lease_id, date(2026, 4, 10)))
            .await
            .expect("payment");
        let paid = PaymentStore::create(store.as_ref(), rent_due(lease_id, date(2026, 2, 10)))
            .await
            .expect("payment");
        PaymentStore::mark_as_paid(
            store.as_ref(),
            paid.id,
            date(2026, 2, 9),
            "cash",
            None,
            None,
        )
        .await
        .expect("paid");

        let sweeper = OverdueSweeper::new(store.clone());
        let today = date(2026, 3, 15);

        assert_eq!(sweeper.check_overdue_payments(today).await.expect("sweep"), 1);
        // Second run: zero delta.
        assert_eq!(sweeper.check_overdue_payments(today).await.expect("sweep"), 0);

        let promoted = PaymentStore::get(store.as_ref(), past.id)
            .await
            .expect("store ok")
            .expect("payment exists");
        assert_eq!(promoted.status, PaymentStatus::Overdue);
        let untouched = PaymentStore::get(store.as_ref(), future.id)
            .await
            .expect("store ok")
            .expect("payment exists");
        assert_eq!(untouched.status, PaymentStatus::Pending);
        let settled = PaymentStore::get(store.as_ref(), paid.id)
            .await
            .expect("store ok")
            .expect("payment exists");
        assert_eq!(settled.status, PaymentStatus::Paid);
    }
}
