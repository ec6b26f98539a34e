//! Scheduled rematch and recompute passes.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::main_lib::AppState;

/// Runs a pass on every tick until the process receives Ctrl-C. The first
/// tick is immediate.
pub async fn run_scheduler(state: Arc<AppState>, period: Duration) {
    info!("Goal scheduler started ({}s interval)", period.as_secs());
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_pass(&state).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, stopping goal scheduler");
                break;
            }
        }
    }
}

/// Rematches, then recomputes, every user. Failures are logged and the next
/// tick retries.
pub async fn run_pass(state: &AppState) {
    let started = Utc::now();

    match state.batch_runner.rematch_all(started).await {
        Ok(summary) if !summary.failed_users.is_empty() => {
            warn!("Rematch failed for {} users", summary.failed_users.len());
        }
        Ok(_) => {}
        Err(e) => error!("Rematch pass failed: {}", e),
    }

    match state.batch_runner.recompute_all(Utc::now()).await {
        Ok(summary) if !summary.failed_users.is_empty() => {
            warn!("Recompute failed for {} users", summary.failed_users.len());
        }
        Ok(_) => {}
        Err(e) => error!("Recompute pass failed: {}", e),
    }

    let elapsed = Utc::now() - started;
    info!("Goal pass finished in {} ms", elapsed.num_milliseconds());
}
