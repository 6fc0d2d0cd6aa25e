//! Percentile rank badges
//!
//! The three best active participants get podium badges. Everyone else who
//! is active is bucketed by their cumulative position in the remaining
//! population; inactive or unknown participants are unranked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::TierConfig;
use crate::domain::{Participant, ParticipantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLabel {
    First,
    Second,
    Third,
    Diamond,
    Platinum,
    Gold,
    Silver,
    Bronze,
    Unranked,
}

const PODIUM: [TierLabel; 3] = [TierLabel::First, TierLabel::Second, TierLabel::Third];

const BUCKETS: [TierLabel; 5] = [
    TierLabel::Diamond,
    TierLabel::Platinum,
    TierLabel::Gold,
    TierLabel::Silver,
    TierLabel::Bronze,
];

impl TierLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierLabel::First => "first",
            TierLabel::Second => "second",
            TierLabel::Third => "third",
            TierLabel::Diamond => "diamond",
            TierLabel::Platinum => "platinum",
            TierLabel::Gold => "gold",
            TierLabel::Silver => "silver",
            TierLabel::Bronze => "bronze",
            TierLabel::Unranked => "unranked",
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            TierLabel::First => "🥇",
            TierLabel::Second => "🥈",
            TierLabel::Third => "🥉",
            TierLabel::Diamond => "💎",
            TierLabel::Platinum => "🔷",
            TierLabel::Gold => "🟨",
            TierLabel::Silver => "⬜",
            TierLabel::Bronze => "🟫",
            TierLabel::Unranked => "➖",
        }
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TierClassifier {
    cumulative_pct: Vec<u32>,
}

impl TierClassifier {
    /// `cumulative_pct` pairs with diamond..bronze in order; extra entries are ignored
    pub fn new(cumulative_pct: Vec<u32>) -> Self {
        Self { cumulative_pct }
    }

    pub fn from_config(config: &TierConfig) -> Self {
        Self::new(config.cumulative_pct.clone())
    }

    /// Badge for every active participant in `population`
    pub fn classify(&self, population: &[Participant]) -> HashMap<ParticipantId, TierLabel> {
        let mut active: Vec<&Participant> = population.iter().filter(|p| p.is_active()).collect();
        active.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));

        let mut tiers = HashMap::with_capacity(active.len());
        for (p, label) in active.iter().zip(PODIUM) {
            tiers.insert(p.id, label);
        }

        let rest = active.get(PODIUM.len()..).unwrap_or_default();
        let n = rest.len() as u64;
        for (idx, p) in rest.iter().enumerate() {
            let position = idx as u64 + 1;
            let label = self
                .cumulative_pct
                .iter()
                .zip(BUCKETS)
                .find(|(pct, _)| position * 100 <= u64::from(**pct) * n)
                .map(|(_, label)| label)
                .unwrap_or(TierLabel::Unranked);
            tiers.insert(p.id, label);
        }
        tiers
    }

    pub fn tier_of(&self, population: &[Participant], id: ParticipantId) -> TierLabel {
        self.classify(population)
            .get(&id)
            .copied()
            .unwrap_or(TierLabel::Unranked)
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::from_config(&TierConfig::default())
    }
}
