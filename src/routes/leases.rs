use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::schemas::{
    clamp_limit_in_range, validate_input, CancelLeaseInput, ChangeDueDayInput, CreateLeaseInput,
    GenerateAdjustmentInput, GeneratePaintingFeeInput, GenerateRentPaymentInput, LeasePath,
    LeasesQuery, RenewLeaseInput,
};
use crate::services::lease_lifecycle::{CreateLeaseCommand, CreatedLease, RenewLeaseCommand};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/leases", axum::routing::get(list_leases).post(create_lease))
        .route(
            "/leases/check-expiring",
            axum::routing::post(check_expiring_soon),
        )
        .route("/leases/auto-renew", axum::routing::post(auto_renew))
        .route("/leases/{lease_id}", axum::routing::get(get_lease))
        .route("/leases/{lease_id}/renew", axum::routing::post(renew_lease))
        .route("/leases/{lease_id}/cancel", axum::routing::post(cancel_lease))
        .route(
            "/leases/{lease_id}/mark-expired",
            axum::routing::post(mark_expired),
        )
        .route(
            "/leases/{lease_id}/due-day",
            axum::routing::post(change_due_day),
        )
        .route(
            "/leases/{lease_id}/payments/rent",
            axum::routing::post(generate_rent_payment),
        )
        .route(
            "/leases/{lease_id}/payments/painting-fee",
            axum::routing::post(generate_painting_fee_payments),
        )
        .route(
            "/leases/{lease_id}/payments/adjustment",
            axum::routing::post(generate_adjustment_payment),
        )
}

fn created_lease_body(created: &CreatedLease) -> Value {
    json!({
        "lease": created.lease,
        "payments": created.payments,
        "generation_errors": created.generation_errors,
    })
}

async fn create_lease(
    State(state): State<AppState>,
    Json(payload): Json<CreateLeaseInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let engine = state.engine()?;

    let created = engine
        .lifecycle
        .create(CreateLeaseCommand {
            unit_id: payload.unit_id,
            tenant_id: payload.tenant_id,
            contract_signed_date: payload.contract_signed_date,
            start_date: payload.start_date,
            payment_due_day: payload.payment_due_day,
            monthly_rent_value: payload.monthly_rent_value,
            painting_fee_total: payload.painting_fee_total,
            painting_fee_installments: payload.painting_fee_installments,
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(created_lease_body(&created)),
    ))
}

async fn get_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let lease = engine
        .leases
        .get(path.lease_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lease record not found.".to_string()))?;
    let payments = engine.payments.list_by_lease(lease.id).await?;
    let adjustments = engine.adjustments.list_by_lease(lease.id).await?;
    let totals = engine.payments.totals_for_lease(lease.id).await?;

    Ok(Json(json!({
        "lease": lease,
        "payments": payments,
        "rent_adjustments": adjustments,
        "totals": totals,
    })))
}

async fn list_leases(
    State(state): State<AppState>,
    Query(query): Query<LeasesQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let leases = engine
        .leases
        .list(query.status, clamp_limit_in_range(query.limit, 1, 1000))
        .await?;
    Ok(Json(json!({ "data": leases })))
}

async fn renew_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    Json(payload): Json<RenewLeaseInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let engine = state.engine()?;

    let renewed = engine
        .lifecycle
        .renew(RenewLeaseCommand {
            lease_id: path.lease_id,
            painting_fee_total: payload.painting_fee_total,
            painting_fee_installments: payload.painting_fee_installments,
            new_rent_value: payload.new_rent_value,
            reason: payload.reason,
            adjusted_by: payload.adjusted_by,
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(created_lease_body(&renewed)),
    ))
}

async fn cancel_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    payload: Option<Json<CancelLeaseInput>>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let payment_ids = payload.map(|Json(input)| input.payment_ids).unwrap_or_default();

    if payment_ids.is_empty() {
        let lease = engine.lifecycle.cancel(path.lease_id).await?;
        return Ok(Json(json!({ "lease": lease, "cancelled_payments": [] })));
    }

    let result = engine
        .lifecycle
        .cancel_with_payments(path.lease_id, &payment_ids)
        .await?;
    Ok(Json(json!({
        "lease": result.lease,
        "cancelled_payments": result.cancelled_payments,
    })))
}

async fn mark_expired(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let today = Utc::now().date_naive();
    let lease = engine.lifecycle.mark_expired(path.lease_id, today).await?;
    Ok(Json(json!({ "lease": lease })))
}

async fn check_expiring_soon(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let today = Utc::now().date_naive();
    let transitioned = engine.lifecycle.check_expiring_soon(today).await?;
    Ok(Json(json!({ "transitioned": transitioned })))
}

async fn auto_renew(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let summary = engine.lifecycle.auto_renew().await?;
    Ok(Json(json!(summary)))
}

async fn change_due_day(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    Json(payload): Json<ChangeDueDayInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let engine = state.engine()?;
    let today = Utc::now().date_naive();

    let report = engine
        .due_day
        .change_payment_due_day(
            path.lease_id,
            payload.new_due_day,
            payload.effective_date,
            payload.reason,
            today,
        )
        .await?;
    Ok(Json(json!(report)))
}

async fn generate_rent_payment(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    Json(payload): Json<GenerateRentPaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let engine = state.engine()?;
    let payment = engine
        .schedule
        .generate_monthly_rent_payment(path.lease_id, payload.reference_month)
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "payment": payment })),
    ))
}

async fn generate_painting_fee_payments(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    payload: Option<Json<GeneratePaintingFeeInput>>,
) -> AppResult<impl IntoResponse> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    validate_input(&input)?;
    let engine = state.engine()?;
    let payments = engine
        .schedule
        .generate_painting_fee_payments(path.lease_id, input.installments)
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "payments": payments })),
    ))
}

async fn generate_adjustment_payment(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    Json(payload): Json<GenerateAdjustmentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let engine = state.engine()?;
    let payment = engine
        .schedule
        .generate_adjustment_payment(
            path.lease_id,
            payload.amount,
            payload.reference_month,
            payload.due_date,
            payload.notes,
        )
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "payment": payment })),
    ))
}
