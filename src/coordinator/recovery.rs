//! Startup recovery of unresolved proposals
//!
//! Proposed proposals get their prompt reattached and their deadline re-armed
//! for the time that is left, or are expired if the deadline passed or the
//! prompt is gone. A prompt that was never posted is presented now. Confirmed proposals whose ledger commit never landed are
//! applied again. Applied proposals are never touched.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::coordinator::ConfirmationCoordinator;
use crate::domain::ProposalStatus;
use crate::error::Result;

/// What a recovery pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoverySummary {
    /// Prompt found and deadline re-armed
    pub reattached: usize,
    /// Deadline passed while the process was down
    pub expired: usize,
    /// Prompt never posted before the restart, presented on this pass
    pub presented: usize,
    /// Prompt no longer exists on the platform
    pub orphaned: usize,
    /// Confirmed proposals applied on this pass
    pub reapplied: usize,
    /// Proposals left for a later pass because of an error
    pub failed: usize,
}

impl RecoverySummary {
    /// Check if anything was pending at startup
    pub fn needs_recovery(&self) -> bool {
        self.reattached
            + self.expired
            + self.presented
            + self.orphaned
            + self.reapplied
            + self.failed
            > 0
    }

    pub fn log_summary(&self) {
        if !self.needs_recovery() {
            info!("No pending proposals - clean startup");
            return;
        }
        info!(
            reattached = self.reattached,
            expired = self.expired,
            presented = self.presented,
            orphaned = self.orphaned,
            reapplied = self.reapplied,
            failed = self.failed,
            "Proposal recovery complete"
        );
    }
}

pub struct RecoveryLoader {
    coordinator: ConfirmationCoordinator,
}

impl RecoveryLoader {
    pub fn new(coordinator: ConfirmationCoordinator) -> Self {
        Self { coordinator }
    }

    pub async fn recover(&self) -> Result<RecoverySummary> {
        let store = self.coordinator.store().clone();
        let confirmable = self.coordinator.confirmable().clone();
        let mut summary = RecoverySummary::default();

        for proposal in store.proposals_with_status(ProposalStatus::Proposed).await? {
            let now = Utc::now();
            if proposal.is_expired_at(now) {
                match self.coordinator.expire(proposal.id).await {
                    Ok(_) => summary.expired += 1,
                    Err(e) => {
                        warn!("Could not expire stale proposal {}: {}", proposal.id, e);
                        summary.failed += 1;
                    }
                }
                continue;
            }

            if proposal.message.is_none() {
                match confirmable.present(&proposal).await {
                    Ok(message) => {
                        store.set_message_ref(proposal.id, &message).await?;
                        summary.presented += 1;
                    }
                    Err(e) => {
                        warn!("Could not present proposal {}: {}", proposal.id, e);
                        summary.failed += 1;
                    }
                }
                self.coordinator.arm(proposal.id, proposal.remaining(now));
                continue;
            }

            match confirmable.reattach(&proposal).await {
                Ok(true) => {
                    self.coordinator.arm(proposal.id, proposal.remaining(now));
                    summary.reattached += 1;
                }
                Ok(false) => match self.coordinator.expire_orphaned(proposal.id).await {
                    Ok(_) => summary.orphaned += 1,
                    Err(e) => {
                        warn!("Could not expire orphaned proposal {}: {}", proposal.id, e);
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    // Keep the deadline so it still resolves one way or another
                    warn!("Reattach of {} failed, re-arming anyway: {}", proposal.id, e);
                    self.coordinator.arm(proposal.id, proposal.remaining(now));
                    summary.failed += 1;
                }
            }
        }

        for proposal in store.proposals_with_status(ProposalStatus::Confirmed).await? {
            match self.coordinator.reapply(proposal.id).await {
                Ok(_) => summary.reapplied += 1,
                Err(e) => {
                    warn!("Reapply of {} failed: {}", proposal.id, e);
                    summary.failed += 1;
                }
            }
        }

        summary.log_summary();
        Ok(summary)
    }
}
