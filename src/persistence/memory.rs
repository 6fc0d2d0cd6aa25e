//! In-process store for dry runs and tests
//!
//! A single mutex guards all state. Ledger transactions hold the lock for
//! their whole lifetime and work on a copy that replaces the shared state on
//! commit, so an abandoned or failed transaction leaves nothing behind.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::{ensure_manual_transition, lock_order, validate_new_team, LedgerTx, Store};
use crate::config::{EconomyConfig, RatingConfig};
use crate::domain::{
    HouseAccount, LedgerEntry, MatchKind, MatchProposal, MessageRef, NewLedgerEntry,
    NewParticipant, NewTeam, Participant, ParticipantId, ProposalId, ProposalStatus, Team, TeamId,
};
use crate::economy::{debit_coins, validate_payout_rate};
use crate::error::{MatchbookError, Result};

#[derive(Debug, Clone)]
struct MemoryState {
    participants: BTreeMap<ParticipantId, Participant>,
    teams: BTreeMap<TeamId, Team>,
    next_team_id: i64,
    proposals: HashMap<ProposalId, MatchProposal>,
    ledger: Vec<LedgerEntry>,
    house: HouseAccount,
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    initial_rating: f64,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new(initial_rating: f64, payout_rate: Decimal) -> Self {
        let state = MemoryState {
            participants: BTreeMap::new(),
            teams: BTreeMap::new(),
            next_team_id: 1,
            proposals: HashMap::new(),
            ledger: Vec::new(),
            house: HouseAccount {
                balance: 0,
                payout_rate,
                updated_at: Utc::now(),
            },
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            initial_rating,
            fail_next_commit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(rating: &RatingConfig, economy: &EconomyConfig) -> Self {
        Self::new(rating.initial_rating, economy.default_payout_rate)
    }

    /// Make the next ledger commit fail as if the database had gone away
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Seed the house balance directly
    pub async fn set_house_balance(&self, balance: i64) {
        let mut state = self.state.lock().await;
        state.house.balance = balance;
        state.house.updated_at = Utc::now();
    }

    /// Overwrite a participant row, bypassing the ledger
    pub async fn put_participant(&self, participant: Participant) {
        let mut state = self.state.lock().await;
        state.participants.insert(participant.id, participant);
    }

    pub async fn ledger_len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_config(&RatingConfig::default(), &EconomyConfig::default())
    }
}

fn sorted_by_rating<T, F>(mut rows: Vec<T>, key: F, limit: Option<usize>) -> Vec<T>
where
    F: Fn(&T) -> (f64, i64),
{
    rows.sort_by(|a, b| {
        let (ra, ia) = key(a);
        let (rb, ib) = key(b);
        rb.total_cmp(&ra).then(ia.cmp(&ib))
    });
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn register_participant(&self, new: NewParticipant) -> Result<Participant> {
        let mut state = self.state.lock().await;
        let initial_rating = self.initial_rating;
        let participant = state
            .participants
            .entry(new.id)
            .and_modify(|p| p.display_name = new.display_name.clone())
            .or_insert_with(|| Participant {
                id: new.id,
                display_name: new.display_name.clone(),
                rating: initial_rating,
                kills: 0,
                deaths: 0,
                matches: 0,
                coins: 0,
                retired: false,
                created_at: Utc::now(),
            });
        Ok(participant.clone())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self.state.lock().await.participants.get(&id).cloned())
    }

    async fn get_participants(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>> {
        let state = self.state.lock().await;
        Ok(lock_order(ids)
            .iter()
            .filter_map(|id| state.participants.get(id).cloned())
            .collect())
    }

    async fn set_retired(&self, id: ParticipantId, retired: bool) -> Result<Participant> {
        let mut state = self.state.lock().await;
        let participant = state
            .participants
            .get_mut(&id)
            .ok_or_else(|| MatchbookError::not_found(format!("participant {}", id)))?;
        participant.retired = retired;
        Ok(participant.clone())
    }

    async fn active_participants(&self, limit: Option<usize>) -> Result<Vec<Participant>> {
        let state = self.state.lock().await;
        let active = state
            .participants
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        Ok(sorted_by_rating(active, |p| (p.rating, p.id.0), limit))
    }

    async fn create_team(&self, new: NewTeam) -> Result<Team> {
        validate_new_team(&new)?;
        let mut state = self.state.lock().await;

        if state.teams.values().any(|t| t.name == new.name) {
            return Err(MatchbookError::validation(format!(
                "team name '{}' is already taken",
                new.name
            )));
        }
        for member in &new.roster {
            if !state.participants.contains_key(member) {
                return Err(MatchbookError::not_found(format!("participant {}", member)));
            }
            if state
                .teams
                .values()
                .any(|t| t.kind == new.kind && t.has_member(*member))
            {
                return Err(MatchbookError::validation(format!(
                    "participant {} is already on a {} team",
                    member, new.kind
                )));
            }
        }

        let id = TeamId(state.next_team_id);
        state.next_team_id += 1;
        let team = Team {
            id,
            kind: new.kind,
            name: new.name,
            owner: new.owner,
            roster: new.roster,
            rating: self.initial_rating,
            matches: 0,
            wins: 0,
            losses: 0,
        };
        state.teams.insert(id, team.clone());
        Ok(team)
    }

    async fn get_team(&self, id: TeamId) -> Result<Option<Team>> {
        Ok(self.state.lock().await.teams.get(&id).cloned())
    }

    async fn team_of(&self, kind: MatchKind, participant: ParticipantId) -> Result<Option<Team>> {
        let state = self.state.lock().await;
        Ok(state
            .teams
            .values()
            .find(|t| t.kind == kind && t.has_member(participant))
            .cloned())
    }

    async fn ranked_teams(&self, kind: MatchKind, limit: Option<usize>) -> Result<Vec<Team>> {
        let state = self.state.lock().await;
        let teams = state
            .teams
            .values()
            .filter(|t| t.kind == kind && t.roster.len() >= 2)
            .cloned()
            .collect();
        Ok(sorted_by_rating(teams, |t| (t.rating, t.id.0), limit))
    }

    async fn create_proposal(&self, proposal: &MatchProposal) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.proposals.contains_key(&proposal.id) {
            return Err(MatchbookError::conflict(format!(
                "proposal {} already exists",
                proposal.id
            )));
        }
        state.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<MatchProposal>> {
        Ok(self.state.lock().await.proposals.get(&id).cloned())
    }

    async fn proposals_with_status(&self, status: ProposalStatus) -> Result<Vec<MatchProposal>> {
        let state = self.state.lock().await;
        let mut proposals: Vec<MatchProposal> = state
            .proposals
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        proposals.sort_by_key(|p| p.created_at);
        Ok(proposals)
    }

    async fn transition_proposal(
        &self,
        id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
        actor: Option<ParticipantId>,
    ) -> Result<bool> {
        ensure_manual_transition(from, to)?;
        let mut state = self.state.lock().await;
        let proposal = state
            .proposals
            .get_mut(&id)
            .ok_or_else(|| MatchbookError::not_found(format!("proposal {}", id)))?;
        if proposal.status != from {
            debug!(
                "Proposal {} is {}, not {}; {} transition skipped",
                id, proposal.status, from, to
            );
            return Ok(false);
        }
        proposal.status = to;
        proposal.resolved_at = Some(Utc::now());
        proposal.resolved_by = actor;
        Ok(true)
    }

    async fn set_message_ref(&self, id: ProposalId, message: &MessageRef) -> Result<()> {
        let mut state = self.state.lock().await;
        let proposal = state
            .proposals
            .get_mut(&id)
            .ok_or_else(|| MatchbookError::not_found(format!("proposal {}", id)))?;
        proposal.message = Some(message.clone());
        Ok(())
    }

    async fn begin_ledger(&self) -> Result<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let fail_commit = self.fail_next_commit.swap(false, Ordering::SeqCst);
        Ok(Box::new(MemoryLedgerTx {
            guard,
            working,
            fail_commit,
        }))
    }

    async fn ledger_entry_for(&self, proposal: ProposalId) -> Result<Option<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .find(|e| e.proposal_id == proposal)
            .cloned())
    }

    async fn recent_ledger(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state.ledger.iter().rev().take(limit).cloned().collect())
    }

    async fn house_account(&self) -> Result<HouseAccount> {
        Ok(self.state.lock().await.house.clone())
    }

    async fn set_payout_rate(&self, rate: Decimal) -> Result<HouseAccount> {
        validate_payout_rate(rate)?;
        let mut state = self.state.lock().await;
        state.house.payout_rate = rate;
        state.house.updated_at = Utc::now();
        Ok(state.house.clone())
    }

    async fn spend_coins(&self, participant: ParticipantId, amount: i64) -> Result<HouseAccount> {
        let mut state = self.state.lock().await;
        let current = state
            .participants
            .get(&participant)
            .ok_or_else(|| MatchbookError::not_found(format!("participant {}", participant)))?
            .coins;
        let remaining = debit_coins(current, amount)?;

        if let Some(p) = state.participants.get_mut(&participant) {
            p.coins = remaining;
        }
        state.house.balance += amount;
        state.house.updated_at = Utc::now();
        Ok(state.house.clone())
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_proposal(&mut self, id: ProposalId) -> Result<Option<MatchProposal>> {
        Ok(self.working.proposals.get(&id).cloned())
    }

    async fn lock_teams(&mut self, ids: &[TeamId]) -> Result<Vec<Team>> {
        Ok(lock_order(ids)
            .iter()
            .filter_map(|id| self.working.teams.get(id).cloned())
            .collect())
    }

    async fn lock_participants(&mut self, ids: &[ParticipantId]) -> Result<Vec<Participant>> {
        Ok(lock_order(ids)
            .iter()
            .filter_map(|id| self.working.participants.get(id).cloned())
            .collect())
    }

    async fn lock_house(&mut self) -> Result<HouseAccount> {
        Ok(self.working.house.clone())
    }

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry> {
        if self
            .working
            .ledger
            .iter()
            .any(|e| e.proposal_id == entry.proposal_id)
        {
            return Err(MatchbookError::conflict(format!(
                "ledger entry for proposal {} already exists",
                entry.proposal_id
            )));
        }
        let entry = entry.into_entry(self.working.ledger.len() as i64 + 1);
        self.working.ledger.push(entry.clone());
        Ok(entry)
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<()> {
        if participant.coins < 0 {
            return Err(MatchbookError::Storage(format!(
                "participant {} coins would go negative",
                participant.id
            )));
        }
        self.working
            .participants
            .insert(participant.id, participant.clone());
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> Result<()> {
        self.working.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn update_house(&mut self, house: &HouseAccount) -> Result<()> {
        if house.balance < 0 {
            return Err(MatchbookError::Storage(
                "house balance would go negative".into(),
            ));
        }
        self.working.house = house.clone();
        Ok(())
    }

    async fn mark_applied(&mut self, id: ProposalId) -> Result<bool> {
        match self.working.proposals.get_mut(&id) {
            Some(p) if p.status == ProposalStatus::Confirmed => {
                p.status = ProposalStatus::Applied;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryLedgerTx {
            mut guard,
            working,
            fail_commit,
        } = *self;
        if fail_commit {
            warn!("Injected ledger commit failure; rolling back");
            return Err(MatchbookError::Storage("ledger commit failed".into()));
        }
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store_with_players() -> MemoryStore {
        let store = MemoryStore::default();
        for (id, name) in [(1, "alpha"), (2, "bravo"), (3, "charlie")] {
            store
                .register_participant(NewParticipant {
                    id: ParticipantId(id),
                    display_name: name.into(),
                })
                .await
                .unwrap();
        }
        store
    }

    fn proposal() -> MatchProposal {
        let now = Utc::now();
        MatchProposal {
            id: ProposalId::new(),
            kind: MatchKind::Duel,
            submitter: ParticipantId(1),
            side_a: vec![ParticipantId(1)],
            side_b: vec![ParticipantId(2)],
            team_a: None,
            team_b: None,
            score_a: 20,
            score_b: 10,
            status: ProposalStatus::Proposed,
            created_at: now,
            expires_at: now + Duration::seconds(3600),
            resolved_at: None,
            resolved_by: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_and_upsert_name() {
        let store = store_with_players().await;
        let p = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        assert_eq!(p.rating, 1500.0);
        assert_eq!(p.coins, 0);

        let renamed = store
            .register_participant(NewParticipant {
                id: ParticipantId(1),
                display_name: "alpha prime".into(),
            })
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "alpha prime");
        assert_eq!(renamed.created_at, p.created_at);
    }

    #[tokio::test]
    async fn test_conditional_transition_only_fires_once() {
        let store = store_with_players().await;
        let p = proposal();
        store.create_proposal(&p).await.unwrap();

        let first = store
            .transition_proposal(p.id, ProposalStatus::Proposed, ProposalStatus::Confirmed, Some(ParticipantId(2)))
            .await
            .unwrap();
        let second = store
            .transition_proposal(p.id, ProposalStatus::Proposed, ProposalStatus::Expired, None)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let stored = store.get_proposal(p.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Confirmed);
        assert_eq!(stored.resolved_by, Some(ParticipantId(2)));
    }

    #[tokio::test]
    async fn test_dropped_ledger_tx_leaves_no_trace() {
        let store = store_with_players().await;
        {
            let mut tx = store.begin_ledger().await.unwrap();
            let mut players = tx
                .lock_participants(&[ParticipantId(2), ParticipantId(1)])
                .await
                .unwrap();
            assert_eq!(players[0].id, ParticipantId(1));
            players[0].coins = 500;
            tx.update_participant(&players[0]).await.unwrap();
        }
        let p = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        assert_eq!(p.coins, 0);
    }

    #[tokio::test]
    async fn test_injected_commit_failure_rolls_back() {
        let store = store_with_players().await;
        store.fail_next_commit();

        let mut tx = store.begin_ledger().await.unwrap();
        let mut house = tx.lock_house().await.unwrap();
        house.balance = 77;
        tx.update_house(&house).await.unwrap();
        assert!(tx.commit().await.is_err());

        assert_eq!(store.house_account().await.unwrap().balance, 0);

        // The failure is one-shot
        let mut tx = store.begin_ledger().await.unwrap();
        tx.update_house(&house).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.house_account().await.unwrap().balance, 77);
    }

    #[tokio::test]
    async fn test_team_membership_is_unique_per_kind() {
        let store = store_with_players().await;
        store
            .create_team(NewTeam {
                kind: MatchKind::Duo,
                name: "Alpha Bravo".into(),
                owner: ParticipantId(1),
                roster: vec![ParticipantId(1), ParticipantId(2)],
            })
            .await
            .unwrap();

        let clash = store
            .create_team(NewTeam {
                kind: MatchKind::Duo,
                name: "Bravo Charlie".into(),
                owner: ParticipantId(3),
                roster: vec![ParticipantId(3), ParticipantId(2)],
            })
            .await;
        assert!(matches!(clash, Err(MatchbookError::Validation(_))));

        // Same player on an LTS team is fine
        let lts = store
            .create_team(NewTeam {
                kind: MatchKind::Lts,
                name: "Bravo Squad".into(),
                owner: ParticipantId(2),
                roster: vec![ParticipantId(2), ParticipantId(3)],
            })
            .await
            .unwrap();
        assert_eq!(
            store.team_of(MatchKind::Lts, ParticipantId(3)).await.unwrap(),
            Some(lts)
        );
    }

    #[tokio::test]
    async fn test_spend_coins_moves_into_house() {
        let store = store_with_players().await;
        let mut p = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        p.coins = 30;
        store.put_participant(p).await;

        let house = store.spend_coins(ParticipantId(1), 25).await.unwrap();
        assert_eq!(house.balance, 25);
        let p = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        assert_eq!(p.coins, 5);

        let err = store.spend_coins(ParticipantId(1), 25).await.unwrap_err();
        assert!(matches!(err, MatchbookError::Validation(_)));
        assert_eq!(store.house_account().await.unwrap().balance, 25);
    }
}
