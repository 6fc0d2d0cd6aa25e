//! Durable state for participants, teams, proposals, ledger and house account
//!
//! `Store` is the single authority for proposal status and idempotence.
//! Multi-row ledger changes go through a `LedgerTx`: locks are taken in a
//! fixed order (proposal, teams by id, participants by id, house) and nothing
//! is visible until `commit`. Dropping an uncommitted transaction rolls back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{
    HouseAccount, LedgerEntry, MatchKind, MatchProposal, MessageRef, NewLedgerEntry,
    NewParticipant, NewTeam, Participant, ParticipantId, ProposalId, ProposalStatus, Team, TeamId,
};
use crate::error::{MatchbookError, Result};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait Store: Send + Sync {
    // ==================== Participants ====================

    /// Insert a participant, or refresh the display name of an existing one
    async fn register_participant(&self, new: NewParticipant) -> Result<Participant>;

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>>;

    async fn get_participants(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>>;

    async fn set_retired(&self, id: ParticipantId, retired: bool) -> Result<Participant>;

    /// Non-retired participants with at least one match, rating descending
    async fn active_participants(&self, limit: Option<usize>) -> Result<Vec<Participant>>;

    // ==================== Teams ====================

    /// Create a team; a participant may be on at most one team per kind
    async fn create_team(&self, new: NewTeam) -> Result<Team>;

    async fn get_team(&self, id: TeamId) -> Result<Option<Team>>;

    async fn team_of(&self, kind: MatchKind, participant: ParticipantId) -> Result<Option<Team>>;

    /// Teams of one kind with at least two members, rating descending
    async fn ranked_teams(&self, kind: MatchKind, limit: Option<usize>) -> Result<Vec<Team>>;

    // ==================== Proposals ====================

    async fn create_proposal(&self, proposal: &MatchProposal) -> Result<()>;

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<MatchProposal>>;

    async fn proposals_with_status(&self, status: ProposalStatus) -> Result<Vec<MatchProposal>>;

    /// Atomically move `id` from `from` to `to`. Returns false when the
    /// proposal was no longer in `from`, i.e. someone else won the race.
    async fn transition_proposal(
        &self,
        id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
        actor: Option<ParticipantId>,
    ) -> Result<bool>;

    async fn set_message_ref(&self, id: ProposalId, message: &MessageRef) -> Result<()>;

    // ==================== Ledger ====================

    async fn begin_ledger(&self) -> Result<Box<dyn LedgerTx>>;

    async fn ledger_entry_for(&self, proposal: ProposalId) -> Result<Option<LedgerEntry>>;

    async fn recent_ledger(&self, limit: usize) -> Result<Vec<LedgerEntry>>;

    // ==================== House account ====================

    async fn house_account(&self) -> Result<HouseAccount>;

    async fn set_payout_rate(&self, rate: Decimal) -> Result<HouseAccount>;

    /// Move `amount` coins from a participant into the house
    async fn spend_coins(&self, participant: ParticipantId, amount: i64) -> Result<HouseAccount>;
}

/// One open ledger transaction
#[async_trait]
pub trait LedgerTx: Send {
    async fn lock_proposal(&mut self, id: ProposalId) -> Result<Option<MatchProposal>>;

    /// Lock teams in ascending id order
    async fn lock_teams(&mut self, ids: &[TeamId]) -> Result<Vec<Team>>;

    /// Lock participants in ascending id order
    async fn lock_participants(&mut self, ids: &[ParticipantId]) -> Result<Vec<Participant>>;

    async fn lock_house(&mut self) -> Result<HouseAccount>;

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry>;

    async fn update_participant(&mut self, participant: &Participant) -> Result<()>;

    async fn update_team(&mut self, team: &Team) -> Result<()>;

    async fn update_house(&mut self, house: &HouseAccount) -> Result<()>;

    /// Confirmed -> Applied; false if the proposal is not Confirmed
    async fn mark_applied(&mut self, id: ProposalId) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Manual transitions never reach Applied; only a ledger commit does
pub(crate) fn ensure_manual_transition(from: ProposalStatus, to: ProposalStatus) -> Result<()> {
    if to == ProposalStatus::Applied || !from.can_transition_to(to) {
        return Err(MatchbookError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

/// Shape checks shared by every backend before a team is written
pub(crate) fn validate_new_team(new: &NewTeam) -> Result<()> {
    if !new.kind.is_team() {
        return Err(MatchbookError::validation("duels are not played by teams"));
    }
    if new.name.trim().is_empty() {
        return Err(MatchbookError::validation("team name must not be empty"));
    }
    if lock_order(&new.roster).len() != new.roster.len() {
        return Err(MatchbookError::validation("team roster lists a player twice"));
    }
    if !new.roster.contains(&new.owner) {
        return Err(MatchbookError::validation("team owner must be on the roster"));
    }
    if new.kind == MatchKind::Duo && new.roster.len() != 2 {
        return Err(MatchbookError::validation("a duo team has exactly two players"));
    }
    Ok(())
}

/// Sorted, deduplicated copy of `ids` for lock ordering
pub(crate) fn lock_order<T: Ord + Copy>(ids: &[T]) -> Vec<T> {
    let mut sorted = ids.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}
