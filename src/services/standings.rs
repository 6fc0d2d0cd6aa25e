//! Leaderboards and tier lookups

use serde::Serialize;
use std::sync::Arc;

use crate::domain::{Competitor, MatchKind, ParticipantId};
use crate::error::{MatchbookError, Result};
use crate::persistence::Store;
use crate::tier::{TierClassifier, TierLabel};

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub competitor: Competitor,
    pub name: String,
    /// Rounded for display
    pub rating: i64,
    pub matches: i64,
    /// Duels: kills. Team kinds: wins.
    pub won: i64,
    /// Duels: deaths. Team kinds: losses.
    pub lost: i64,
    /// Duels only
    pub tier: Option<TierLabel>,
}

#[derive(Clone)]
pub struct StandingsService {
    store: Arc<dyn Store>,
    tiers: TierClassifier,
}

impl StandingsService {
    pub fn new(store: Arc<dyn Store>, tiers: TierClassifier) -> Self {
        Self { store, tiers }
    }

    /// Rating-descending standings for one kind
    pub async fn leaderboard(&self, kind: MatchKind, limit: usize) -> Result<Vec<Standing>> {
        if kind.is_team() {
            let teams = self.store.ranked_teams(kind, Some(limit)).await?;
            return Ok(teams
                .into_iter()
                .enumerate()
                .map(|(idx, t)| Standing {
                    rank: idx + 1,
                    competitor: Competitor::Team(t.id),
                    rating: t.display_rating(),
                    name: t.name,
                    matches: t.matches,
                    won: t.wins,
                    lost: t.losses,
                    tier: None,
                })
                .collect());
        }

        // Tiers are relative to the whole active population, not just the page
        let population = self.store.active_participants(None).await?;
        let tiers = self.tiers.classify(&population);
        Ok(population
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, p)| Standing {
                rank: idx + 1,
                competitor: Competitor::Participant(p.id),
                rating: p.display_rating(),
                tier: Some(tiers.get(&p.id).copied().unwrap_or(TierLabel::Unranked)),
                name: p.display_name,
                matches: p.matches,
                won: p.kills,
                lost: p.deaths,
            })
            .collect())
    }

    pub async fn tier(&self, participant: ParticipantId) -> Result<TierLabel> {
        if self.store.get_participant(participant).await?.is_none() {
            return Err(MatchbookError::not_found(format!(
                "participant {} is not registered",
                participant
            )));
        }
        let population = self.store.active_participants(None).await?;
        Ok(self.tiers.tier_of(&population, participant))
    }
}
