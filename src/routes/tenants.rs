use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::repository::NewTenant;
use crate::schemas::{
    clamp_limit_in_range, validate_input, CreateTenantInput, TenantPath, TenantsQuery,
};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/tenants",
            axum::routing::get(list_tenants).post(create_tenant),
        )
        .route("/tenants/{tenant_id}", axum::routing::get(get_tenant))
}

async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let engine = state.engine()?;

    let tenant = engine
        .tenants
        .create(NewTenant {
            full_name: payload.full_name,
            national_id: payload.national_id,
            phone: payload.phone,
            email: payload.email,
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "tenant": tenant })),
    ))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let tenant = engine
        .tenants
        .get(path.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant record not found.".to_string()))?;
    Ok(Json(json!({ "tenant": tenant })))
}

async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<TenantsQuery>,
) -> AppResult<Json<Value>> {
    let engine = state.engine()?;
    let tenants = engine
        .tenants
        .list(clamp_limit_in_range(query.limit, 1, 1000))
        .await?;
    Ok(Json(json!({ "data": tenants })))
}
