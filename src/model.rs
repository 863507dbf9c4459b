use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contracts always run for six months; renewals chain new six-month terms.
pub const CONTRACT_LENGTH_MONTHS: u32 = 6;

/// Leases enter `expiring_soon` once they are this close to their end date.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 45;

/// Proration uses a flat 30-day month, not the calendar month length.
pub const PRORATION_MONTH_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "unit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
    Renovation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lease_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Active,
    ExpiringSoon,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Rent,
    PaintingFee,
    Adjustment,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::PaintingFee => "painting_fee",
            Self::Adjustment => "adjustment",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub number: String,
    pub floor: i32,
    pub status: UnitStatus,
    pub base_rent_value: Decimal,
    pub renovated_rent_value: Decimal,
    pub current_rent_value: Decimal,
    pub renovated: bool,
    pub created_at: DateTime<Utc>,
}

impl Unit {
    /// Current rent tracks the renovated value when the unit is renovated.
    pub fn resolve_current_rent(base: Decimal, renovated_rent: Decimal, renovated: bool) -> Decimal {
        if renovated {
            renovated_rent
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lease {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

impl Lease {
    pub fn can_be_renewed(&self) -> bool {
        matches!(self.status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
    }

    pub fn is_ended(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }

    /// True when this lease's renewal must include a manual rent review.
    pub fn should_apply_annual_adjustment(&self, policy: &RenewalPolicy) -> bool {
        policy.adjustment_due(self.generation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaseRentAdjustment {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub previous_rent_value: Decimal,
    pub new_rent_value: Decimal,
    pub percentage: Decimal,
    pub reason: Option<String>,
    pub adjusted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub payment_type: PaymentType,
    pub reference_month: NaiveDate,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn can_be_paid(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Overdue)
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Overdue)
    }
}

/// Renewal cadence: every `cadence_months / contract_length_months`-th
/// generation coincides with a rent-review cycle. With 12-month reviews over
/// 6-month contracts that is every even generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    pub cadence_months: u32,
    pub contract_length_months: u32,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            cadence_months: 12,
            contract_length_months: CONTRACT_LENGTH_MONTHS,
        }
    }
}

impl RenewalPolicy {
    pub fn renewals_per_cadence(&self) -> i32 {
        if self.contract_length_months == 0 {
            return 0;
        }
        (self.cadence_months / self.contract_length_months) as i32
    }

    pub fn adjustment_due(&self, generation: i32) -> bool {
        let span = self.renewals_per_cadence();
        span > 0 && generation % span == 0
    }
}

/// End date of a contract starting on `start`. Month arithmetic clamps to the
/// last day of shorter months (Aug 31 + 6 months = Feb 28/29).
pub fn contract_end_date(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(CONTRACT_LENGTH_MONTHS))
        .unwrap_or(start)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

pub fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

/// Due date for `due_day` within the calendar month of `reference`, clamping
/// to the last day of the month when the day does not exist (e.g. day 31 in
/// April).
pub fn due_date_in_month(reference: NaiveDate, due_day: i16) -> NaiveDate {
    let day = due_day.clamp(1, 31) as u32;
    NaiveDate::from_ymd_opt(reference.year(), reference.month(), day)
        .unwrap_or_else(|| last_day_of_month(reference))
}

pub fn last_day_of_month(reference: NaiveDate) -> NaiveDate {
    let first = first_of_month(reference);
    add_months(first, 1) - Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn contract_runs_exactly_six_months() {
        assert_eq!(contract_end_date(date(2026, 1, 15)), date(2026, 7, 15));
        assert_eq!(contract_end_date(date(2026, 7, 1)), date(2027, 1, 1));
        // Clamped when the target month is shorter.
        assert_eq!(contract_end_date(date(2025, 8, 31)), date(2026, 2, 28));
    }

    #[test]
    fn due_day_clamps_to_short_months() {
        assert_eq!(due_date_in_month(date(2026, 4, 1), 31), date(2026, 4, 30));
        assert_eq!(due_date_in_month(date(2026, 2, 1), 30), date(2026, 2, 28));
        assert_eq!(due_date_in_month(date(2026, 1, 1), 10), date(2026, 1, 10));
    }

    #[test]
    fn last_day_of_month_handles_year_boundary() {
        assert_eq!(last_day_of_month(date(2026, 12, 5)), date(2026, 12, 31));
        assert_eq!(last_day_of_month(date(2028, 2, 1)), date(2028, 2, 29));
    }

    #[test]
    fn adjustment_is_due_on_even_generations() {
        let policy = RenewalPolicy::default();
        assert_eq!(policy.renewals_per_cadence(), 2);
        for generation in [2, 4, 6] {
            assert!(policy.adjustment_due(generation));
        }
        for generation in [1, 3, 5] {
            assert!(!policy.adjustment_due(generation));
        }
    }

    #[test]
    fn current_rent_follows_renovation_flag() {
        let base = Decimal::new(150_000, 2);
        let renovated = Decimal::new(180_000, 2);
        assert_eq!(Unit::resolve_current_rent(base, renovated, false), base);
        assert_eq!(Unit::resolve_current_rent(base, renovated, true), renovated);
    }
}
