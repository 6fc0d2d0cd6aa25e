use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::participant::{ParticipantId, TeamId};

/// Proposal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProposalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Match format being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// 1v1, rated per participant
    Duel,
    /// 2v2 between registered duo teams
    Duo,
    /// Last team standing, 3v3 and up, rated per team
    Lts,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Duel => "duel",
            MatchKind::Duo => "duo",
            MatchKind::Lts => "lts",
        }
    }

    /// Team kinds rate the team rather than the individual players
    pub fn is_team(&self) -> bool {
        !matches!(self, MatchKind::Duel)
    }

    /// Only duels mint coins and draw on the house account
    pub fn pays_out(&self) -> bool {
        matches!(self, MatchKind::Duel)
    }

    /// Allowed number of listed identities per side
    pub fn side_size(&self) -> (usize, Option<usize>) {
        match self {
            MatchKind::Duel => (1, Some(1)),
            MatchKind::Duo => (2, Some(2)),
            MatchKind::Lts => (1, None),
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for MatchKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "duel" | "1v1" => Ok(MatchKind::Duel),
            "duo" | "2v2" => Ok(MatchKind::Duo),
            "lts" => Ok(MatchKind::Lts),
            _ => Err(format!("Unknown match kind: {}", s)),
        }
    }
}

/// Proposal lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Submitted, waiting for the opposing side
    Proposed,
    /// Opposing side agreed; ledger application pending
    Confirmed,
    /// Rejected by either side
    Denied,
    /// Deadline elapsed without a decision
    Expired,
    /// Ledger entry committed
    Applied,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Proposed => "proposed",
            ProposalStatus::Confirmed => "confirmed",
            ProposalStatus::Denied => "denied",
            ProposalStatus::Expired => "expired",
            ProposalStatus::Applied => "applied",
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: ProposalStatus) -> bool {
        use ProposalStatus::*;

        matches!(
            (self, target),
            (Proposed, Confirmed) | (Proposed, Denied) | (Proposed, Expired) | (Confirmed, Applied)
        )
    }

}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ProposalStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "proposed" => Ok(ProposalStatus::Proposed),
            "confirmed" => Ok(ProposalStatus::Confirmed),
            "denied" => Ok(ProposalStatus::Denied),
            "expired" => Ok(ProposalStatus::Expired),
            "applied" => Ok(ProposalStatus::Applied),
            _ => Err(format!("Unknown proposal status: {}", s)),
        }
    }
}

/// A resolving actor's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirm,
    Deny,
}

impl Decision {
    pub fn target_status(&self) -> ProposalStatus {
        match self {
            Decision::Confirm => ProposalStatus::Confirmed,
            Decision::Deny => ProposalStatus::Denied,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Confirm => write!(f, "confirm"),
            Decision::Deny => write!(f, "deny"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Where the interactive confirmation message lives on the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// A reported result as received from the submitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSubmission {
    pub kind: MatchKind,
    pub submitter: ParticipantId,
    pub side_a: Vec<ParticipantId>,
    pub side_b: Vec<ParticipantId>,
    pub score_a: i32,
    pub score_b: i32,
}

/// An unverified match result awaiting counterparty resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub id: ProposalId,
    pub kind: MatchKind,
    pub submitter: ParticipantId,
    pub side_a: Vec<ParticipantId>,
    pub side_b: Vec<ParticipantId>,
    /// Rated teams for team kinds
    pub team_a: Option<TeamId>,
    pub team_b: Option<TeamId>,
    pub score_a: i32,
    pub score_b: i32,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<ParticipantId>,
    pub message: Option<MessageRef>,
}

impl MatchProposal {
    /// Side with the higher score. Ties are rejected at submission.
    pub fn winner(&self) -> Side {
        if self.score_a > self.score_b {
            Side::A
        } else {
            Side::B
        }
    }

    pub fn side(&self, side: Side) -> &[ParticipantId] {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    pub fn team(&self, side: Side) -> Option<TeamId> {
        match side {
            Side::A => self.team_a,
            Side::B => self.team_b,
        }
    }

    pub fn score(&self, side: Side) -> i32 {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    /// Side the submitter reported from
    pub fn submitting_side(&self) -> Side {
        if self.side_a.contains(&self.submitter) {
            Side::A
        } else {
            Side::B
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left until the deadline, zero once elapsed
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proposal(score_a: i32, score_b: i32) -> MatchProposal {
        let now = Utc::now();
        MatchProposal {
            id: ProposalId::new(),
            kind: MatchKind::Duel,
            submitter: ParticipantId(2),
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

    #[test]
    fn test_valid_transitions() {
        use ProposalStatus::*;

        assert!(Proposed.can_transition_to(Confirmed));
        assert!(Proposed.can_transition_to(Denied));
        assert!(Proposed.can_transition_to(Expired));
        assert!(Confirmed.can_transition_to(Applied));

        assert!(!Proposed.can_transition_to(Applied));
        assert!(!Confirmed.can_transition_to(Denied));
        assert!(!Denied.can_transition_to(Confirmed));
        assert!(!Expired.can_transition_to(Proposed));
        assert!(!Applied.can_transition_to(Confirmed));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            ProposalStatus::try_from("PROPOSED").unwrap(),
            ProposalStatus::Proposed
        );
        assert_eq!(
            ProposalStatus::try_from("applied").unwrap(),
            ProposalStatus::Applied
        );
        assert!(ProposalStatus::try_from("pending").is_err());
        assert_eq!(MatchKind::try_from("2v2").unwrap(), MatchKind::Duo);
    }

    #[test]
    fn test_winner_and_submitting_side() {
        let p = proposal(20, 10);
        assert_eq!(p.winner(), Side::A);
        assert_eq!(p.submitting_side(), Side::B);
        assert_eq!(p.submitting_side().opposite(), Side::A);

        let p = proposal(3, 10);
        assert_eq!(p.winner(), Side::B);
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let p = proposal(1, 0);
        assert!(p.remaining(p.created_at) > std::time::Duration::from_secs(3599));
        assert_eq!(
            p.remaining(p.expires_at + Duration::seconds(5)),
            std::time::Duration::ZERO
        );
        assert!(p.is_expired_at(p.expires_at));
    }
}
