use std::sync::Arc;
use tokio::sync::watch;

/// A one-shot broadcast flag
///
/// Clones share state. `fire` flips it once; later calls are no-ops, so
/// waiters observe exactly one transition.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Already fired, for pages that have no dynamic sections
    pub fn fired() -> Self {
        let signal = Self::new();
        signal.fire();
        signal
    }

    /// Returns `true` only for the call that actually fired it
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
