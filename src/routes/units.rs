use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::model::Unit;
use crate::repository::NewUnit;
use crate::schemas::{
    clamp_limit_in_range, validate_input, CreateUnitInput, UnitPath, UnitsQuery,
    UpdateUnitStatusInput,
};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/units", axum::routing::get(list_units).post(create_unit))
        .route("/units/{unit_id}", axum::routing::get(get_unit))
        .route(
            "/units/{unit_id}/status",
            axum::routing::patch(update_unit_status),
        )
}

async fn create_unit(
    State(state): State<AppState>,
    Json(payload): Json<CreateUnitInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    if payload.base_rent_value <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Base rent must be greater than zero.".to_string(),
        ));
    }
    let engine = state.engine()?;

    let renovated_rent = payload.renovated_rent_value.unwrap_or(payload.base_rent_value);
    let unit = engine
        .units
        .create(NewUnit {
            number: payload.number,
            floor: payload.floor,
            base_rent_value: payload.base_rent_value,
            renovated_rent_value: renovated_rent,
            renovated: payload.renovated,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(json!({ "unit": unit }))))
}

async fn get_unit(
    State(state): State<AppState>,
    Path(path): Path<UnitPath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let unit: Unit = engine
        .units
        .get(path.unit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Unit record not found.".to_string()))?;
    Ok(Json(json!({ "unit": unit })))
}

async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitsQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let limit = clamp_limit_in_range(query.limit, 1, 1000);
    let units = match query.status {
        Some(status) => engine.units.list_by_status(status, limit).await?,
        None => engine.units.list(limit).await?,
    };
    Ok(Json(json!({ "data": units })))
}

/// Operator override for maintenance/renovation; lease-driven transitions go
/// through the lifecycle service.
async fn update_unit_status(
    State(state): State<AppState>,
    Path(path): Path<UnitPath>,
    Json(payload): Json<UpdateUnitStatusInput>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let unit = engine.units.update_status(path.unit_id, payload.status).await?;
    Ok(Json(json!({ "unit": unit })))
}
