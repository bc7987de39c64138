//! Bounded retry of unresolved overrides
//!
//! Sections may still be arriving when overrides are first applied. Any
//! selector that does not resolve is retried on a fixed interval until it
//! does or the attempt budget runs out.

use crate::apply::Applier;
use crate::config::RetryPolicy;
use crate::store::OverrideStore;
use folio_dom::Document;
use std::cell::RefCell;
use std::collections::BTreeSet;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Passes made, including the first
    pub attempts: u32,
    /// Selectors applied at least once
    pub applied: Vec<String>,
    /// Selectors still unresolved when the loop stopped
    pub unresolved: Vec<String>,
    pub cancelled: bool,
}

impl ApplyOutcome {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && !self.cancelled
    }
}

/// Apply every cached override, retrying the ones that do not resolve
///
/// The document is borrowed only for the duration of each pass, so other
/// tasks may inject content between ticks. Resolved records are not
/// re-applied on later ticks.
pub async fn apply_until_resolved(
    doc: &RefCell<Document>,
    store: &OverrideStore,
    applier: &Applier,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let mut pending: BTreeSet<&str> = store.selectors().collect();

    if pending.is_empty() {
        return outcome;
    }

    let mut ticker = time::interval(policy.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while outcome.attempts < policy.attempts() {
        tokio::select! {
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            _ = ticker.tick() => {}
        }

        outcome.attempts += 1;
        let report = {
            let mut doc = doc.borrow_mut();
            applier.apply_some(&mut doc, pending.iter().filter_map(|s| store.get(s)))
        };

        for (selector, _) in report.applied {
            pending.remove(selector.as_str());
            outcome.applied.push(selector);
        }

        if pending.is_empty() {
            break;
        }
        debug!(attempt = outcome.attempts, pending = pending.len(), "Overrides still unresolved");
    }

    outcome.unresolved = pending.into_iter().map(str::to_string).collect();

    if !outcome.unresolved.is_empty() && !outcome.cancelled {
        warn!(
            attempts = outcome.attempts,
            selectors = ?outcome.unresolved,
            "Overrides did not resolve within the retry budget"
        );
    }

    outcome
}
