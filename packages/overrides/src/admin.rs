//! Admin status gate
//!
//! Editing may only start once the backend confirms admin rights, and a
//! session whose credentials expire is deauthorized by the periodic poll.

use crate::adapter::PersistenceAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AdminGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for AdminGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_admin(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns `true` when the value changed
    pub fn set(&self, is_admin: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != is_admin;
            *current = is_admin;
            changed
        });
        if changed {
            info!(is_admin, "Admin status changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Ask the backend once
    ///
    /// A 401/403 revokes access. Any other failure keeps the current
    /// state; a flaky network should not kick an editor out.
    pub async fn refresh(&self, adapter: &dyn PersistenceAdapter) -> bool {
        match adapter.check_admin_status().await {
            Ok(status) => {
                self.set(status.is_admin);
            }
            Err(err) if err.is_unauthorized() => {
                debug!(error = %err, "Admin check refused");
                self.set(false);
            }
            Err(err) => {
                warn!(error = %err, "Admin check failed; keeping current status");
            }
        }
        self.is_admin()
    }

    /// Re-check every `interval` until cancelled
    pub async fn poll(
        &self,
        adapter: &dyn PersistenceAdapter,
        interval: Duration,
        cancel: &CancellationToken,
    ) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick is immediate; callers have already checked once
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.refresh(adapter).await;
                }
            }
        }
    }
}
