use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::model::{LeaseStatus, PaymentStatus};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/reports/dashboard", axum::routing::get(dashboard))
}

/// Read-side counts over the lifecycle engine's records.
async fn dashboard(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let engine = state.engine()?;

    let (active, expiring_soon, expired, cancelled) = tokio::try_join!(
        engine.leases.count_by_status(LeaseStatus::Active),
        engine.leases.count_by_status(LeaseStatus::ExpiringSoon),
        engine.leases.count_by_status(LeaseStatus::Expired),
        engine.leases.count_by_status(LeaseStatus::Cancelled),
    )?;
    let (pending, overdue, paid) = tokio::try_join!(
        engine.payments.count_by_status(PaymentStatus::Pending),
        engine.payments.count_by_status(PaymentStatus::Overdue),
        engine.payments.count_by_status(PaymentStatus::Paid),
    )?;

    Ok(Json(json!({
        "leases": {
            "active": active,
            "expiring_soon": expiring_soon,
            "expired": expired,
            "cancelled": cancelled,
        },
        "payments": {
            "pending": pending,
            "overdue": overdue,
            "paid": paid,
        },
    })))
}
