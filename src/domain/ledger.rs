use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::participant::{Competitor, ParticipantId};
use super::proposal::{MatchKind, ProposalId};

/// Immutable record of an applied match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub proposal_id: ProposalId,
    pub kind: MatchKind,
    pub winner: Competitor,
    pub winner_score: i32,
    /// Post-match exact rating
    pub winner_rating: f64,
    pub loser: Competitor,
    pub loser_score: i32,
    pub loser_rating: f64,
    pub submitter: ParticipantId,
    pub confirmed_by: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row before the store assigns its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub proposal_id: ProposalId,
    pub kind: MatchKind,
    pub winner: Competitor,
    pub winner_score: i32,
    pub winner_rating: f64,
    pub loser: Competitor,
    pub loser_score: i32,
    pub loser_rating: f64,
    pub submitter: ParticipantId,
    pub confirmed_by: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn into_entry(self, id: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            proposal_id: self.proposal_id,
            kind: self.kind,
            winner: self.winner,
            winner_score: self.winner_score,
            winner_rating: self.winner_rating,
            loser: self.loser,
            loser_score: self.loser_score,
            loser_rating: self.loser_rating,
            submitter: self.submitter,
            confirmed_by: self.confirmed_by,
            created_at: self.created_at,
        }
    }
}

/// Shared pool that pays a bonus on confirmed duels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseAccount {
    pub balance: i64,
    /// Percent of the balance paid to each duelist
    pub payout_rate: Decimal,
    pub updated_at: DateTime<Utc>,
}
