//! Applies confirmed proposals to ratings, stats and coins
//!
//! Everything for one proposal happens in a single `LedgerTx`. Any error
//! before `commit` drops the transaction, which leaves the proposal
//! Confirmed and therefore retryable.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::domain::{
    Competitor, LedgerEntry, MatchProposal, NewLedgerEntry, Participant, ParticipantId,
    ProposalId, ProposalStatus, Side, Team, TeamId,
};
use crate::economy::{EconomyAccount, Settlement};
use crate::error::{MatchbookError, Result};
use crate::persistence::{LedgerTx, Store};
use crate::rating::{RatingEngine, RatingUpdate};

/// Result of a committed ledger application
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMatch {
    pub entry: LedgerEntry,
    pub rating: RatingUpdate,
    /// Present for kinds that pay out
    pub settlement: Option<Settlement>,
}

#[derive(Clone)]
pub struct LedgerApplier {
    store: Arc<dyn Store>,
    rating: RatingEngine,
    economy: EconomyAccount,
}

impl LedgerApplier {
    pub fn new(store: Arc<dyn Store>, rating: RatingEngine, economy: EconomyAccount) -> Self {
        Self {
            store,
            rating,
            economy,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self::new(
            store,
            RatingEngine::from_config(&config.rating),
            EconomyAccount::from_config(&config.economy),
        )
    }

    /// Apply a Confirmed proposal exactly once
    #[instrument(skip(self))]
    pub async fn apply(&self, proposal_id: ProposalId) -> Result<AppliedMatch> {
        let mut tx = self.store.begin_ledger().await?;

        let proposal = tx
            .lock_proposal(proposal_id)
            .await?
            .ok_or_else(|| MatchbookError::not_found(format!("proposal {}", proposal_id)))?;
        if proposal.status != ProposalStatus::Confirmed {
            return Err(MatchbookError::conflict(format!(
                "proposal {} is {}, only confirmed proposals can be applied",
                proposal_id, proposal.status
            )));
        }

        let winner = proposal.winner();
        let (winner_id, loser_id, rating, settlement) = if proposal.kind.is_team() {
            let (w, l, rating) = self.apply_teams(tx.as_mut(), &proposal, winner).await?;
            (Competitor::Team(w), Competitor::Team(l), rating, None)
        } else {
            let (w, l, rating, settlement) =
                self.apply_duel(tx.as_mut(), &proposal, winner).await?;
            (Competitor::Participant(w), Competitor::Participant(l), rating, settlement)
        };

        let entry = tx
            .insert_ledger_entry(NewLedgerEntry {
                proposal_id,
                kind: proposal.kind,
                winner: winner_id,
                winner_score: proposal.score(winner),
                winner_rating: rating.winner_after,
                loser: loser_id,
                loser_score: proposal.score(winner.opposite()),
                loser_rating: rating.loser_after,
                submitter: proposal.submitter,
                confirmed_by: proposal.resolved_by,
                created_at: Utc::now(),
            })
            .await?;

        if !tx.mark_applied(proposal_id).await? {
            return Err(MatchbookError::conflict(format!(
                "proposal {} changed status during application",
                proposal_id
            )));
        }
        tx.commit().await?;

        info!(
            "Applied {} {}: {} beat {} {}-{} (rating {:+}/{:+})",
            proposal.kind,
            proposal_id,
            entry.winner,
            entry.loser,
            entry.winner_score,
            entry.loser_score,
            rating.winner_delta(),
            rating.loser_delta()
        );

        Ok(AppliedMatch {
            entry,
            rating,
            settlement,
        })
    }

    async fn apply_teams(
        &self,
        tx: &mut dyn LedgerTx,
        proposal: &MatchProposal,
        winner: Side,
    ) -> Result<(TeamId, TeamId, RatingUpdate)> {
        let team_id = |side: Side| {
            proposal.team(side).ok_or_else(|| {
                MatchbookError::Internal(format!("team proposal {} has no team for {:?}", proposal.id, side))
            })
        };
        let (winner_id, loser_id) = (team_id(winner)?, team_id(winner.opposite())?);

        let mut teams = tx.lock_teams(&[winner_id, loser_id]).await?;
        let mut w = take_team(&mut teams, winner_id)?;
        let mut l = take_team(&mut teams, loser_id)?;

        let rating = self.rating.settle(w.rating, l.rating);
        w.rating = rating.winner_after;
        w.matches += 1;
        w.wins += 1;
        l.rating = rating.loser_after;
        l.matches += 1;
        l.losses += 1;

        tx.update_team(&w).await?;
        tx.update_team(&l).await?;
        Ok((winner_id, loser_id, rating))
    }

    async fn apply_duel(
        &self,
        tx: &mut dyn LedgerTx,
        proposal: &MatchProposal,
        winner: Side,
    ) -> Result<(ParticipantId, ParticipantId, RatingUpdate, Option<Settlement>)> {
        let duelist = |side: Side| {
            proposal.side(side).first().copied().ok_or_else(|| {
                MatchbookError::Internal(format!("duel {} has an empty side", proposal.id))
            })
        };
        let (winner_id, loser_id) = (duelist(winner)?, duelist(winner.opposite())?);
        let (winner_score, loser_score) = (
            i64::from(proposal.score(winner)),
            i64::from(proposal.score(winner.opposite())),
        );

        let mut players = tx.lock_participants(&[winner_id, loser_id]).await?;
        let mut w = take_participant(&mut players, winner_id)?;
        let mut l = take_participant(&mut players, loser_id)?;

        let rating = self.rating.settle(w.rating, l.rating);
        w.rating = rating.winner_after;
        w.kills += winner_score;
        w.deaths += loser_score;
        w.matches += 1;
        l.rating = rating.loser_after;
        l.kills += loser_score;
        l.deaths += winner_score;
        l.matches += 1;

        let settlement = if proposal.kind.pays_out() {
            let mut house = tx.lock_house().await?;
            let settlement = self.economy.settle(&house);
            w.coins += settlement.credit_each();
            l.coins += settlement.credit_each();
            if settlement.house_debit() != 0 {
                house.balance = settlement.house_after;
                house.updated_at = Utc::now();
                tx.update_house(&house).await?;
            }
            Some(settlement)
        } else {
            None
        };

        tx.update_participant(&w).await?;
        tx.update_participant(&l).await?;
        Ok((winner_id, loser_id, rating, settlement))
    }
}

fn take_team(teams: &mut Vec<Team>, id: TeamId) -> Result<Team> {
    let idx = teams
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| MatchbookError::not_found(format!("team {}", id)))?;
    Ok(teams.swap_remove(idx))
}

fn take_participant(players: &mut Vec<Participant>, id: ParticipantId) -> Result<Participant> {
    let idx = players
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| MatchbookError::not_found(format!("participant {}", id)))?;
    Ok(players.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchKind, NewParticipant, NewTeam};
    use crate::persistence::MemoryStore;
    use chrono::Duration;

    async fn seeded() -> (MemoryStore, LedgerApplier) {
        let store = MemoryStore::default();
        for id in 1..=4 {
            store
                .register_participant(NewParticipant {
                    id: ParticipantId(id),
                    display_name: format!("p{}", id),
                })
                .await
                .unwrap();
        }
        let applier = LedgerApplier::new(
            Arc::new(store.clone()),
            RatingEngine::default(),
            EconomyAccount::new(3),
        );
        (store, applier)
    }

    fn duel(score_a: i32, score_b: i32) -> MatchProposal {
        let now = Utc::now();
        MatchProposal {
            id: ProposalId::new(),
            kind: MatchKind::Duel,
            submitter: ParticipantId(1),
            side_a: vec![ParticipantId(1)],
            side_b: vec![ParticipantId(2)],
            team_a: None,
            team_b: None,
            score_a,
            score_b,
            status: ProposalStatus::Proposed,
            created_at: now,
            expires_at: now + Duration::seconds(3600),
            resolved_at: None,
            resolved_by: None,
            message: None,
        }
    }

    async fn confirm(store: &MemoryStore, proposal: &MatchProposal, by: i64) {
        store.create_proposal(proposal).await.unwrap();
        assert!(store
            .transition_proposal(
                proposal.id,
                ProposalStatus::Proposed,
                ProposalStatus::Confirmed,
                Some(ParticipantId(by)),
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_even_duel_applies_ratings_stats_and_coins() {
        let (store, applier) = seeded().await;
        store.set_house_balance(100).await;
        let proposal = duel(20, 10);
        confirm(&store, &proposal, 2).await;

        let applied = applier.apply(proposal.id).await.unwrap();
        assert_eq!(applied.entry.winner, Competitor::Participant(ParticipantId(1)));
        assert_eq!(applied.entry.confirmed_by, Some(ParticipantId(2)));
        assert_eq!(applied.rating.winner_delta(), 16);

        let a = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        let b = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();
        assert_eq!(a.display_rating(), 1516);
        assert_eq!(b.display_rating(), 1484);
        assert_eq!((a.kills, a.deaths, a.matches), (20, 10, 1));
        assert_eq!((b.kills, b.deaths, b.matches), (10, 20, 1));
        // 3 minted plus 5 from the house each
        assert_eq!((a.coins, b.coins), (8, 8));
        assert_eq!(store.house_account().await.unwrap().balance, 90);

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Applied);
    }

    #[tokio::test]
    async fn test_second_apply_is_a_conflict_without_mutation() {
        let (store, applier) = seeded().await;
        let proposal = duel(5, 9);
        confirm(&store, &proposal, 1).await;
        applier.apply(proposal.id).await.unwrap();
        let before = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();

        let err = applier.apply(proposal.id).await.unwrap_err();
        assert!(matches!(err, MatchbookError::Conflict(_)));
        assert_eq!(store.ledger_len().await, 1);
        let after = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unconfirmed_proposal_is_not_applied() {
        let (store, applier) = seeded().await;
        let proposal = duel(3, 1);
        store.create_proposal(&proposal).await.unwrap();

        let err = applier.apply(proposal.id).await.unwrap_err();
        assert!(matches!(err, MatchbookError::Conflict(_)));
        assert_eq!(store.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_proposal_confirmed_and_retryable() {
        let (store, applier) = seeded().await;
        let proposal = duel(20, 10);
        confirm(&store, &proposal, 2).await;

        store.fail_next_commit();
        let err = applier.apply(proposal.id).await.unwrap_err();
        assert!(matches!(err, MatchbookError::Storage(_)));

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Confirmed);
        assert_eq!(store.ledger_len().await, 0);
        let a = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        assert_eq!((a.rating, a.coins, a.matches), (1500.0, 0, 0));

        applier.apply(proposal.id).await.unwrap();
        assert_eq!(store.ledger_len().await, 1);
    }

    #[tokio::test]
    async fn test_team_match_rates_teams_without_coins() {
        let (store, applier) = seeded().await;
        let alpha = store
            .create_team(NewTeam {
                kind: MatchKind::Duo,
                name: "alpha".into(),
                owner: ParticipantId(1),
                roster: vec![ParticipantId(1), ParticipantId(2)],
            })
            .await
            .unwrap();
        let bravo = store
            .create_team(NewTeam {
                kind: MatchKind::Duo,
                name: "bravo".into(),
                owner: ParticipantId(3),
                roster: vec![ParticipantId(3), ParticipantId(4)],
            })
            .await
            .unwrap();

        let mut proposal = duel(4, 7);
        proposal.kind = MatchKind::Duo;
        proposal.side_a = alpha.roster.clone();
        proposal.side_b = bravo.roster.clone();
        proposal.team_a = Some(alpha.id);
        proposal.team_b = Some(bravo.id);
        confirm(&store, &proposal, 3).await;

        let applied = applier.apply(proposal.id).await.unwrap();
        assert!(applied.settlement.is_none());
        assert_eq!(applied.entry.winner, Competitor::Team(bravo.id));

        let alpha = store.get_team(alpha.id).await.unwrap().unwrap();
        let bravo = store.get_team(bravo.id).await.unwrap().unwrap();
        assert_eq!((bravo.wins, bravo.losses, bravo.matches), (1, 0, 1));
        assert_eq!((alpha.wins, alpha.losses, alpha.matches), (0, 1, 1));
        assert_eq!(bravo.display_rating(), 1516);

        let p1 = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
        assert_eq!((p1.rating, p1.coins, p1.matches), (1500.0, 0, 0));
    }
}
