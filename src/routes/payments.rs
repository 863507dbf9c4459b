use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::schemas::{
    clamp_limit_in_range, validate_input, MarkPaymentPaidInput, OverdueQuery, PaymentPath,
    PaymentsQuery, UpcomingQuery,
};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payments", axum::routing::get(list_payments))
        .route("/payments/overdue", axum::routing::get(list_overdue))
        .route("/payments/upcoming", axum::routing::get(list_upcoming))
        .route(
            "/payments/sweep-overdue",
            axum::routing::post(sweep_overdue),
        )
        .route("/payments/{payment_id}", axum::routing::get(get_payment))
        .route(
            "/payments/{payment_id}/mark-paid",
            axum::routing::post(mark_payment_paid),
        )
        .route(
            "/payments/{payment_id}/cancel",
            axum::routing::post(cancel_payment),
        )
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let payments = engine.payments.list_by_lease(query.lease_id).await?;
    Ok(Json(json!({ "data": payments })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let payment = engine
        .payments
        .get(path.payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment record not found.".to_string()))?;
    Ok(Json(json!({ "payment": payment })))
}

async fn list_overdue(
    State(state): State<AppState>,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let today = Utc::now().date_naive();
    let payments = engine
        .ledger
        .list_overdue(today, clamp_limit_in_range(query.limit, 1, 1000))
        .await?;
    Ok(Json(json!({ "data": payments })))
}

async fn list_upcoming(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let today = Utc::now().date_naive();
    let days = query
        .days
        .unwrap_or(state.config.upcoming_window_days)
        .clamp(0, 365);
    let payments = engine
        .ledger
        .list_upcoming(today, days, clamp_limit_in_range(query.limit, 1, 1000))
        .await?;
    Ok(Json(json!({ "days": days, "data": payments })))
}

async fn mark_payment_paid(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    Json(payload): Json<MarkPaymentPaidInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let engine = state.engine()?;
    let payment_date = payload.payment_date.unwrap_or_else(|| Utc::now().date_naive());

    let payment = engine
        .ledger
        .mark_payment_as_paid(
            path.payment_id,
            payment_date,
            &payload.payment_method,
            payload.notes.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "payment": payment })))
}

async fn cancel_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let payment = engine.ledger.cancel_payment(path.payment_id).await?;
    Ok(Json(json!({ "payment": payment })))
}

async fn sweep_overdue(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let today = Utc::now().date_naive();
    let promoted = engine.overdue.check_overdue_payments(today).await?;
    Ok(Json(json!({ "promoted": promoted })))
}
