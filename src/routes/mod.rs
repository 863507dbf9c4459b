use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod leases;
pub mod payments;
pub mod reports;
pub mod tenants;
pub mod units;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(units::router())
        .merge(tenants::router())
        .merge(leases::router())
        .merge(payments::router())
        .merge(reports::router())
}
