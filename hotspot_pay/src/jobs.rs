use std::time::Duration;

use actix_web::web;
use anyhow::Result;
use common::payments::RefreshSummary;

use crate::state::AppState;

/// One status-check tick. Returns `None` when the previous tick is still running.
pub async fn run_status_check(state: &AppState) -> Result<Option<RefreshSummary>> {
    let Some(_guard) = state.status_check_lock.try_acquire() else {
        log::warn!("Previous status check still running, skipping this tick");
        return Ok(None);
    };

    let summary = state.payments.refresh_open_transactions().await?;
    let synced = state.payments.sync_unsynced_vouchers().await?;
    if summary.checked > 0 || summary.expired > 0 || synced > 0 {
        log::info!(
            "Status check: {} checked, {} completed, {} failed, {} expired, {} vouchers synced",
            summary.checked,
            summary.completed,
            summary.failed,
            summary.expired,
            synced
        );
    }
    Ok(Some(summary))
}

/// One cleanup tick. Returns `None` when the previous tick is still running.
pub async fn run_cleanup(state: &AppState) -> Result<Option<usize>> {
    let Some(_guard) = state.cleanup_lock.try_acquire() else {
        log::warn!("Previous voucher cleanup still running, skipping this tick");
        return Ok(None);
    };

    let removed = state.payments.cleanup_expired_vouchers().await?;
    log::debug!("Voucher cleanup removed {}", removed);
    Ok(Some(removed))
}

pub async fn start_status_check_runner(data: web::Data<AppState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let state = data.clone();
        // Each tick runs detached so a slow gateway cannot delay the clock.
        tokio::spawn(async move {
            if let Err(e) = run_status_check(&state).await {
                log::error!("Status check failed: {:#}", e);
            }
        });
    }
}

pub async fn start_cleanup_runner(data: web::Data<AppState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let state = data.clone();
        tokio::spawn(async move {
            if let Err(e) = run_cleanup(&state).await {
                log::error!("Voucher cleanup failed: {:#}", e);
            }
        });
    }
}
