//! Background scheduled tasks.
//!
//! Call `spawn_all` once during startup to launch them.

use crate::config::TaskConfig;
use crate::services::PayoutService;
use std::time::Duration;

/// Spawn all background tasks. Detached via `tokio::spawn`; does not block.
pub fn spawn_all(payout_service: PayoutService, config: &TaskConfig) {
    // 结算批次对账：补完已打款但未标记的批次
    {
        let svc = payout_service;
        let interval = Duration::from_secs(config.reconcile_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.reconcile_pending_batches().await {
                    Ok(n) if n > 0 => log::info!("Payout batches reconciled: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to reconcile payout batches: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
