use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::domain::ProposalId;

/// Deadline timers for proposals awaiting resolution, keyed by proposal id
#[derive(Default)]
pub struct PendingRegistry {
    timers: DashMap<ProposalId, AbortHandle>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer, cancelling any earlier one for the same proposal
    pub fn arm(&self, id: ProposalId, timer: AbortHandle) {
        if let Some(previous) = self.timers.insert(id, timer) {
            previous.abort();
            debug!("Replaced deadline timer for proposal {}", id);
        }
    }

    /// Cancel the timer for `id`. Returns false if none was pending.
    pub fn disarm(&self, id: ProposalId) -> bool {
        match self.timers.remove(&id) {
            Some((_, timer)) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the entry without aborting; used by a timer that has fired
    pub fn forget(&self, id: ProposalId) {
        self.timers.remove(&id);
    }

    pub fn contains(&self, id: ProposalId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancel every pending timer
    pub fn clear(&self) {
        let ids: Vec<ProposalId> = self.timers.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.disarm(id);
        }
    }
}
