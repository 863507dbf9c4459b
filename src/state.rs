use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::repository::postgres::PgStore;
use crate::repository::{AdjustmentStore, LeaseStore, PaymentStore, TenantStore, UnitStore};
use crate::services::due_day::DueDayChangeService;
use crate::services::lease_lifecycle::LeaseLifecycleService;
use crate::services::overdue::OverdueSweeper;
use crate::services::payment_schedule::PaymentScheduleService;
use crate::services::payments::PaymentLedgerService;

/// The lifecycle engine: store handles plus the services wired over them.
#[derive(Clone)]
pub struct Engine {
    pub units: Arc<dyn UnitStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub leases: Arc<dyn LeaseStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub adjustments: Arc<dyn AdjustmentStore>,
    pub lifecycle: LeaseLifecycleService,
    pub schedule: PaymentScheduleService,
    pub due_day: DueDayChangeService,
    pub ledger: PaymentLedgerService,
    pub overdue: OverdueSweeper,
}

impl Engine {
    pub fn from_pool(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        let units: Arc<dyn UnitStore> = store.clone();
        let tenants: Arc<dyn TenantStore> = store.clone();
        let leases: Arc<dyn LeaseStore> = store.clone();
        let payments: Arc<dyn PaymentStore> = store.clone();
        let adjustments: Arc<dyn AdjustmentStore> = store;

        Self {
            lifecycle: LeaseLifecycleService::new(
                units.clone(),
                tenants.clone(),
                leases.clone(),
                payments.clone(),
            ),
            schedule: PaymentScheduleService::new(leases.clone(), payments.clone()),
            due_day: DueDayChangeService::new(leases.clone(), payments.clone()),
            ledger: PaymentLedgerService::new(leases.clone(), payments.clone()),
            overdue: OverdueSweeper::new(payments.clone()),
            units,
            tenants,
            leases,
            payments,
            adjustments,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub engine: Option<Engine>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => Some(crate::db::build_pool(&config, url)?),
            None => {
                tracing::warn!("DATABASE_URL is not set — running without a store");
                None
            }
        };
        let engine = db_pool.clone().map(Engine::from_pool);

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            engine,
        })
    }

    pub fn engine(&self) -> AppResult<&Engine> {
        self.engine.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Database is not configured.".to_string())
        })
    }
}
