use std::time::Duration;

use chrono::{Datelike, Timelike, Utc};
use tokio::time::sleep;

use crate::state::AppState;

/// Spawn the background scheduler that runs the daily lifecycle jobs.
///
/// Each job runs in its own `tokio::spawn` so a failure in one job never
/// crashes the scheduler loop or other jobs.
pub async fn run_background_scheduler(state: AppState) {
    tracing::info!("Background scheduler started");

    let engine = match state.engine.as_ref() {
        Some(engine) => engine.clone(),
        None => {
            tracing::warn!("Scheduler: no database configured, exiting");
            return;
        }
    };

    let daily_hour = state.config.daily_jobs_hour_utc;
    let auto_renew_enabled = state.config.auto_renew_enabled;
    let mut last_daily_run: Option<u32> = None;

    loop {
        sleep(Duration::from_secs(15)).await;

        let now_utc = Utc::now();
        let today = now_utc.date_naive();

        // Daily jobs run once per calendar day, at or after the configured hour.
        let today_ordinal = today.ordinal();
        if last_daily_run == Some(today_ordinal) {
            continue;
        }
        if now_utc.hour() < daily_hour {
            continue;
        }
        last_daily_run = Some(today_ordinal);
        tracing::info!("Scheduler: running daily jobs for {today}");

        // Overdue sweep
        {
            let engine = engine.clone();
            tokio::spawn(async move {
                match engine.overdue.check_overdue_payments(today).await {
                    Ok(promoted) if promoted > 0 => {
                        tracing::info!(promoted, "Scheduler: overdue sweep completed");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "Scheduler: overdue sweep failed");
                    }
                }
            });
        }

        // Expiring-soon check
        {
            let engine = engine.clone();
            tokio::spawn(async move {
                match engine.lifecycle.check_expiring_soon(today).await {
                    Ok(transitioned) if transitioned > 0 => {
                        tracing::info!(transitioned, "Scheduler: expiring-soon check completed");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "Scheduler: expiring-soon check failed");
                    }
                }
            });
        }

        // Expired-lease scan
        {
            let engine = engine.clone();
            tokio::spawn(async move {
                match engine.lifecycle.expire_ended(today).await {
                    Ok(expired) if expired > 0 => {
                        tracing::info!(expired, "Scheduler: expired-lease scan completed");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "Scheduler: expired-lease scan failed");
                    }
                }
            });
        }

        // Auto-renew, except leases held for a manual rent review
        if auto_renew_enabled {
            let engine = engine.clone();
            tokio::spawn(async move {
                match engine.lifecycle.auto_renew().await {
                    Ok(summary) => {
                        if summary.renewed > 0 || summary.skipped_for_adjustment > 0 {
                            tracing::info!(
                                renewed = summary.renewed,
                                skipped = summary.skipped_for_adjustment,
                                errors = summary.errors,
                                "Scheduler: auto-renew completed"
                            );
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Scheduler: auto-renew failed");
                    }
                }
            });
        }
    }
}
