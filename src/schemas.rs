use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::model::{LeaseStatus, UnitStatus};

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_limit() -> i64 {
    100
}
fn default_installments() -> i16 {
    1
}
fn default_painting_fee_total() -> Decimal {
    Decimal::ZERO
}
fn default_false() -> bool {
    false
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUnitInput {
    #[validate(length(min = 1, max = 20))]
    pub number: String,
    pub floor: i32,
    pub base_rent_value: Decimal,
    pub renovated_rent_value: Option<Decimal>,
    #[serde(default = "default_false")]
    pub renovated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUnitStatusInput {
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTenantInput {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 1, max = 32))]
    pub national_id: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeaseInput {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub contract_signed_date: NaiveDate,
    pub start_date: NaiveDate,
    #[validate(range(min = 1, max = 31))]
    pub payment_due_day: i16,
    pub monthly_rent_value: Decimal,
    #[serde(default = "default_painting_fee_total")]
    pub painting_fee_total: Decimal,
    #[serde(default = "default_installments")]
    #[validate(range(min = 1, max = 4))]
    pub painting_fee_installments: i16,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenewLeaseInput {
    pub painting_fee_total: Decimal,
    #[serde(default = "default_installments")]
    #[validate(range(min = 1, max = 4))]
    pub painting_fee_installments: i16,
    pub new_rent_value: Option<Decimal>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub adjusted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelLeaseInput {
    #[serde(default)]
    pub payment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangeDueDayInput {
    #[validate(range(min = 1, max = 31))]
    pub new_due_day: i16,
    pub effective_date: NaiveDate,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateRentPaymentInput {
    pub reference_month: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GeneratePaintingFeeInput {
    #[validate(range(min = 1, max = 4))]
    pub installments: Option<i16>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateAdjustmentInput {
    pub amount: Decimal,
    pub reference_month: NaiveDate,
    pub due_date: NaiveDate,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarkPaymentPaidInput {
    pub payment_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 40))]
    pub payment_method: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitsQuery {
    pub status: Option<UnitStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeasesQuery {
    pub status: Option<LeaseStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsQuery {
    pub lease_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverdueQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitPath {
    pub unit_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantPath {
    pub tenant_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeasePath {
    pub lease_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: Uuid,
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}
