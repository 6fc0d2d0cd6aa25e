//! Confirmation coordinator
//!
//! Owns the Proposed -> {Confirmed, Denied, Expired} state machine. Every
//! transition is decided by a conditional store update, so a deadline timer
//! and a human decision racing each other resolve to exactly one winner.
//! The in-memory timer registry only saves wasted work.
//!
//! The `run()` loop uses `tokio::select!` to:
//!   - Pull inbound `ActorEvent`s and resolve each on its own task
//!   - Stop on shutdown and cancel all pending timers

use chrono::Utc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use super::command::{ActorEvent, Outcome};
use super::registry::PendingRegistry;
use super::validation::{authorize, check_shape, resolve_sides};
use crate::domain::{
    Decision, MatchProposal, MatchSubmission, ParticipantId, ProposalId, ProposalStatus,
};
use crate::error::{MatchbookError, Result};
use crate::ledger::{AppliedMatch, LedgerApplier};
use crate::messenger::{Confirmable, OutcomeNotice};
use crate::persistence::Store;
use crate::services::fanout::NotificationFanout;

struct Inner {
    store: Arc<dyn Store>,
    applier: LedgerApplier,
    confirmable: Arc<dyn Confirmable>,
    fanout: NotificationFanout,
    registry: PendingRegistry,
    timeout: Duration,
}

/// Cheap to clone; all clones share one registry
#[derive(Clone)]
pub struct ConfirmationCoordinator {
    inner: Arc<Inner>,
}

impl ConfirmationCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        applier: LedgerApplier,
        confirmable: Arc<dyn Confirmable>,
        fanout: NotificationFanout,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                applier,
                confirmable,
                fanout,
                registry: PendingRegistry::new(),
                timeout,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn confirmable(&self) -> &Arc<dyn Confirmable> {
        &self.inner.confirmable
    }

    /// Number of proposals with a live deadline timer
    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_pending(&self, id: ProposalId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Validate, persist, present and arm the deadline for a new result
    #[instrument(skip(self, submission), fields(kind = %submission.kind, submitter = %submission.submitter))]
    pub async fn submit(&self, submission: MatchSubmission) -> Result<MatchProposal> {
        check_shape(&submission)?;
        let (team_a, team_b) = resolve_sides(self.inner.store.as_ref(), &submission).await?;

        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(self.inner.timeout)
                .map_err(|e| MatchbookError::Internal(format!("invalid timeout: {}", e)))?;
        let mut proposal = MatchProposal {
            id: ProposalId::new(),
            kind: submission.kind,
            submitter: submission.submitter,
            side_a: submission.side_a,
            side_b: submission.side_b,
            team_a,
            team_b,
            score_a: submission.score_a,
            score_b: submission.score_b,
            status: ProposalStatus::Proposed,
            created_at: now,
            expires_at,
            resolved_at: None,
            resolved_by: None,
            message: None,
        };
        self.inner.store.create_proposal(&proposal).await?;

        match self.inner.confirmable.present(&proposal).await {
            Ok(message) => {
                self.inner.store.set_message_ref(proposal.id, &message).await?;
                proposal.message = Some(message);
            }
            // The proposal still resolves through the API or expires on its own
            Err(e) => warn!("Could not present proposal {}: {}", proposal.id, e),
        }

        self.arm(proposal.id, self.inner.timeout);
        info!(
            "Proposal {} created: {} {:?} {}-{} {:?}, expires {}",
            proposal.id,
            proposal.kind,
            proposal.side_a,
            proposal.score_a,
            proposal.score_b,
            proposal.side_b,
            proposal.expires_at
        );
        Ok(proposal)
    }

    /// Apply an actor's confirm or deny
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        proposal_id: ProposalId,
        actor: ParticipantId,
        decision: Decision,
    ) -> Result<Outcome> {
        let proposal = self.load(proposal_id).await?;
        if proposal.status != ProposalStatus::Proposed {
            return Err(already_resolved(&proposal));
        }
        if proposal.is_expired_at(Utc::now()) {
            // The timer has not fired yet; settle it here so the actor sees why
            self.expire(proposal_id).await?;
            return Err(MatchbookError::conflict(format!(
                "proposal {} has expired",
                proposal_id
            )));
        }

        let team_a = match proposal.team_a {
            Some(id) => self.inner.store.get_team(id).await?,
            None => None,
        };
        let team_b = match proposal.team_b {
            Some(id) => self.inner.store.get_team(id).await?,
            None => None,
        };
        authorize(&proposal, actor, decision, (team_a.as_ref(), team_b.as_ref()))?;

        let won = self
            .inner
            .store
            .transition_proposal(
                proposal_id,
                ProposalStatus::Proposed,
                decision.target_status(),
                Some(actor),
            )
            .await?;
        if !won {
            let current = self.load(proposal_id).await?;
            return Err(already_resolved(&current));
        }
        self.inner.registry.disarm(proposal_id);
        info!("Proposal {} {} by {}", proposal_id, decision.target_status(), actor);

        match decision {
            Decision::Deny => {
                self.conclude(&proposal, &OutcomeNotice::denied(&proposal, actor))
                    .await;
                Ok(Outcome::Denied { by: actor })
            }
            Decision::Confirm => {
                let applied = self.apply_confirmed(&proposal).await?;
                Ok(Outcome::Applied(applied))
            }
        }
    }

    /// Expire a proposal whose deadline has passed; Conflict while it is still open
    #[instrument(skip(self))]
    pub async fn expire(&self, proposal_id: ProposalId) -> Result<Outcome> {
        let proposal = self.load(proposal_id).await?;
        if proposal.status == ProposalStatus::Proposed && !proposal.is_expired_at(Utc::now()) {
            return Err(MatchbookError::conflict(format!(
                "proposal {} is open until {}",
                proposal_id, proposal.expires_at
            )));
        }
        self.close_expired(proposal).await
    }

    /// Expire a proposal whose prompt is gone from the platform, deadline or not
    pub(crate) async fn expire_orphaned(&self, proposal_id: ProposalId) -> Result<Outcome> {
        self.expire_now(proposal_id).await
    }

    async fn expire_now(&self, proposal_id: ProposalId) -> Result<Outcome> {
        let proposal = self.load(proposal_id).await?;
        self.close_expired(proposal).await
    }

    async fn close_expired(&self, proposal: MatchProposal) -> Result<Outcome> {
        let won = self
            .inner
            .store
            .transition_proposal(
                proposal.id,
                ProposalStatus::Proposed,
                ProposalStatus::Expired,
                None,
            )
            .await?;
        if !won {
            let current = self.load(proposal.id).await?;
            return Err(already_resolved(&current));
        }
        self.inner.registry.disarm(proposal.id);
        info!("Proposal {} expired", proposal.id);

        self.conclude(&proposal, &OutcomeNotice::expired(&proposal))
            .await;
        Ok(Outcome::Expired)
    }

    /// Retry ledger application for a proposal left Confirmed by a failed commit
    #[instrument(skip(self))]
    pub async fn reapply(&self, proposal_id: ProposalId) -> Result<Outcome> {
        let proposal = self.load(proposal_id).await?;
        if proposal.status != ProposalStatus::Confirmed {
            return Err(MatchbookError::conflict(format!(
                "proposal {} is {}, only confirmed proposals can be reapplied",
                proposal_id, proposal.status
            )));
        }
        let applied = self.apply_confirmed(&proposal).await?;
        Ok(Outcome::Applied(applied))
    }

    /// Schedule expiry of `proposal_id` after `delay`
    pub fn arm(&self, proposal_id: ProposalId, delay: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            // The handle must be in the registry before `forget` can run
            if registered_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.registry.forget(proposal_id);
            let coordinator = ConfirmationCoordinator { inner };
            // The timer owns the deadline; the wall clock may lag a paused or skewed runtime
            match coordinator.expire_now(proposal_id).await {
                Ok(_) => {}
                Err(e) if e.is_rejection() => {
                    debug!("Deadline for {} lost the race: {}", proposal_id, e)
                }
                Err(e) => error!("Failed to expire proposal {}: {}", proposal_id, e),
            }
        });
        self.inner.registry.arm(proposal_id, task.abort_handle());
        let _ = registered_tx.send(());
        debug!("Armed deadline for {} in {:?}", proposal_id, delay);
    }

    /// Cancel every pending timer; proposals stay Proposed for recovery
    pub fn shutdown(&self) {
        let pending = self.inner.registry.len();
        self.inner.registry.clear();
        info!("Coordinator stopped with {} pending proposals", pending);
    }

    /// Event pump: resolve inbound actor events until shutdown
    pub async fn run(
        self,
        mut events: mpsc::Receiver<ActorEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!("Confirmation coordinator event loop started");
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        info!("Actor event channel closed");
                        break;
                    };
                    let coordinator = self.clone();
                    tokio::spawn(async move { coordinator.handle_event(event).await });
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }
        self.shutdown();
    }

    async fn handle_event(&self, event: ActorEvent) {
        let result = self
            .resolve(event.proposal_id, event.actor, event.decision)
            .await;
        let reason = match result {
            Ok(outcome) => {
                debug!(
                    "Event from {} on {} -> {}",
                    event.actor,
                    event.proposal_id,
                    outcome.as_str()
                );
                return;
            }
            Err(e) if e.is_rejection() => e.to_string(),
            Err(e) => {
                error!("Resolving {} failed: {}", event.proposal_id, e);
                "something went wrong recording this result; it will be retried".to_string()
            }
        };
        if let Err(e) = self
            .inner
            .confirmable
            .reject(event.actor, event.proposal_id, &reason)
            .await
        {
            warn!("Could not notify {} of rejection: {}", event.actor, e);
        }
    }

    async fn apply_confirmed(&self, proposal: &MatchProposal) -> Result<AppliedMatch> {
        let applied = match self.inner.applier.apply(proposal.id).await {
            Ok(applied) => applied,
            Err(e) => {
                error!(
                    "Ledger application of {} failed, left confirmed for retry: {}",
                    proposal.id, e
                );
                return Err(e);
            }
        };

        let notice = OutcomeNotice::applied(proposal, &applied);
        self.conclude(proposal, &notice).await;
        self.inner
            .fanout
            .announce(&notice, proposal.message.is_some())
            .await;
        Ok(applied)
    }

    async fn conclude(&self, proposal: &MatchProposal, notice: &OutcomeNotice) {
        if let Err(e) = self.inner.confirmable.conclude(proposal, notice).await {
            warn!("Could not update prompt for {}: {}", proposal.id, e);
        }
    }

    async fn load(&self, id: ProposalId) -> Result<MatchProposal> {
        self.inner
            .store
            .get_proposal(id)
            .await?
            .ok_or_else(|| MatchbookError::not_found(format!("proposal {}", id)))
    }
}

fn already_resolved(proposal: &MatchProposal) -> MatchbookError {
    MatchbookError::conflict(format!(
        "proposal {} was already {}",
        proposal.id, proposal.status
    ))
}
