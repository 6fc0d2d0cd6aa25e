use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::proposal::MatchKind;

/// Platform identity of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    /// Exact duel rating; round only for display
    pub rating: f64,
    pub kills: i64,
    pub deaths: i64,
    pub matches: i64,
    pub coins: i64,
    pub retired: bool,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Counted by the tier classifier and the duel leaderboard
    pub fn is_active(&self) -> bool {
        !self.retired && self.matches > 0
    }

    pub fn display_rating(&self) -> i64 {
        display_rating(self.rating)
    }

    pub fn kill_death_ratio(&self) -> f64 {
        if self.deaths > 0 {
            self.kills as f64 / self.deaths as f64
        } else {
            self.kills as f64
        }
    }
}

/// Registration payload (identity linking itself happens elsewhere)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    pub id: ParticipantId,
    pub display_name: String,
}

/// A rated team for duo or LTS matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub kind: MatchKind,
    pub name: String,
    pub owner: ParticipantId,
    pub roster: Vec<ParticipantId>,
    pub rating: f64,
    pub matches: i64,
    pub wins: i64,
    pub losses: i64,
}

impl Team {
    pub fn has_member(&self, id: ParticipantId) -> bool {
        self.roster.contains(&id)
    }

    pub fn display_rating(&self) -> i64 {
        display_rating(self.rating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeam {
    pub kind: MatchKind,
    pub name: String,
    pub owner: ParticipantId,
    pub roster: Vec<ParticipantId>,
}

/// The rated unit on one side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Competitor {
    Participant(ParticipantId),
    Team(TeamId),
}

impl Competitor {
    pub fn raw_id(&self) -> i64 {
        match self {
            Competitor::Participant(id) => id.0,
            Competitor::Team(id) => id.0,
        }
    }

    pub fn for_kind(kind: MatchKind, raw_id: i64) -> Self {
        if kind.is_team() {
            Competitor::Team(TeamId(raw_id))
        } else {
            Competitor::Participant(ParticipantId(raw_id))
        }
    }
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Competitor::Participant(id) => write!(f, "player:{}", id),
            Competitor::Team(id) => write!(f, "team:{}", id),
        }
    }
}

/// Ratings are stored exactly and shown as whole numbers
pub fn display_rating(rating: f64) -> i64 {
    rating.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_requires_matches_and_not_retired() {
        let mut p = Participant {
            id: ParticipantId(7),
            display_name: "gimmic".into(),
            rating: 1516.2,
            kills: 20,
            deaths: 0,
            matches: 0,
            coins: 0,
            retired: false,
            created_at: Utc::now(),
        };
        assert!(!p.is_active());
        p.matches = 1;
        assert!(p.is_active());
        p.retired = true;
        assert!(!p.is_active());

        assert_eq!(p.display_rating(), 1516);
        assert_eq!(p.kill_death_ratio(), 20.0);
    }

    #[test]
    fn test_competitor_for_kind() {
        assert_eq!(
            Competitor::for_kind(MatchKind::Duel, 4),
            Competitor::Participant(ParticipantId(4))
        );
        assert_eq!(
            Competitor::for_kind(MatchKind::Lts, 4),
            Competitor::Team(TeamId(4))
        );
        assert_eq!(Competitor::Team(TeamId(9)).to_string(), "team:9");
    }
}
