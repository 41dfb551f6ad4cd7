//! Auto-refresh loop tied to the lifetime of a view

use crate::reconcile::StateReconciler;
use rewards_core::AggregateKind;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle to a running auto-refresh loop.
///
/// Dropping the handle stops the loop, so it lives exactly as long as the
/// view that started it.
pub struct AutoRefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutoRefreshHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Refresh `kinds` now and then every `interval` until stopped or until
/// `cancel` fires
pub fn spawn_auto_refresh(
    reconciler: StateReconciler,
    kinds: Vec<AggregateKind>,
    interval: Duration,
    cancel: CancellationToken,
) -> AutoRefreshHandle {
    let task = tokio::spawn(refresh_loop(reconciler, kinds, interval, cancel.clone()));

    AutoRefreshHandle {
        cancel,
        task: Some(task),
    }
}

async fn refresh_loop(
    reconciler: StateReconciler,
    kinds: Vec<AggregateKind>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!("Auto-refresh started for {:?} every {:?}", kinds, interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Auto-refresh stopped");
                return;
            }
            _ = ticker.tick() => {
                let refreshed = reconciler.refresh(&kinds).await;
                debug!("Auto-refresh replaced {} of {} aggregates", refreshed.len(), kinds.len());
            }
        }
    }
}
