//! Messaging platform boundary
//!
//! The coordinator never renders anything itself. It hands proposals and
//! outcomes to a `Confirmable` (the interactive confirm/deny message) and a
//! `Broadcaster` (outcome fanout to subscribed channels).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AffordanceStyle;
use crate::domain::{
    display_rating, Decision, MatchKind, MatchProposal, MessageRef, ParticipantId, ProposalId,
    ProposalStatus, Side,
};
use crate::error::Result;
use crate::ledger::AppliedMatch;

/// Interactive confirmation message for one proposal
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Confirmable: Send + Sync {
    /// Post the confirm/deny prompt and return where it lives
    async fn present(&self, proposal: &MatchProposal) -> Result<MessageRef>;

    /// Re-bind the affordance of a posted prompt after a restart; false when the message is gone
    async fn reattach(&self, proposal: &MatchProposal) -> Result<bool>;

    /// Replace the prompt with the final outcome and remove the controls
    async fn conclude(&self, proposal: &MatchProposal, notice: &OutcomeNotice) -> Result<()>;

    /// Tell an actor why their confirm/deny was refused
    async fn reject(&self, actor: ParticipantId, proposal_id: ProposalId, reason: &str)
        -> Result<()>;
}

/// Sends one outcome to one subscribed channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, channel: &str, notice: &OutcomeNotice) -> Result<()>;
}

/// Rendered result of a resolved proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeNotice {
    pub proposal_id: ProposalId,
    pub kind: MatchKind,
    pub status: ProposalStatus,
    pub title: String,
    pub body: String,
}

impl OutcomeNotice {
    pub fn applied(proposal: &MatchProposal, applied: &AppliedMatch) -> Self {
        let winner = proposal.winner();
        let mut body = format!(
            "{} {} - {} {}\nRating: {} ({:+}) / {} ({:+})",
            side_label(proposal, winner),
            proposal.score(winner),
            proposal.score(winner.opposite()),
            side_label(proposal, winner.opposite()),
            display_rating(applied.rating.winner_after),
            applied.rating.winner_delta(),
            display_rating(applied.rating.loser_after),
            applied.rating.loser_delta(),
        );
        if let Some(s) = applied.settlement {
            body.push_str(&format!("\nCoins: +{} each", s.credit_each()));
            if s.payout_each > 0 {
                body.push_str(&format!(" (house paid {} each)", s.payout_each));
            }
        }

        Self {
            proposal_id: proposal.id,
            kind: proposal.kind,
            status: ProposalStatus::Applied,
            title: format!("{} result confirmed", kind_title(proposal.kind)),
            body,
        }
    }

    pub fn denied(proposal: &MatchProposal, by: ParticipantId) -> Self {
        Self {
            proposal_id: proposal.id,
            kind: proposal.kind,
            status: ProposalStatus::Denied,
            title: format!("{} result denied", kind_title(proposal.kind)),
            body: format!("Denied by {}", mention(by)),
        }
    }

    pub fn expired(proposal: &MatchProposal) -> Self {
        Self {
            proposal_id: proposal.id,
            kind: proposal.kind,
            status: ProposalStatus::Expired,
            title: format!("{} result expired", kind_title(proposal.kind)),
            body: "Nobody confirmed the result in time".to_string(),
        }
    }

    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

/// Body of the confirm/deny prompt
pub fn prompt_text(proposal: &MatchProposal, style: AffordanceStyle) -> String {
    let opponents = proposal
        .side(proposal.submitting_side().opposite())
        .iter()
        .map(|p| mention(*p))
        .collect::<Vec<_>>()
        .join(" ");
    let (confirm, deny) = (
        control_label(style, Decision::Confirm),
        control_label(style, Decision::Deny),
    );

    format!(
        "{} reported a {} result:\n{} {} - {} {}\n{}: {} to confirm, {} to deny.",
        mention(proposal.submitter),
        kind_title(proposal.kind),
        side_label(proposal, Side::A),
        proposal.score_a,
        proposal.score_b,
        side_label(proposal, Side::B),
        opponents,
        confirm,
        deny,
    )
}

/// Visible control for a decision under the given affordance
pub fn control_label(style: AffordanceStyle, decision: Decision) -> &'static str {
    match (style, decision) {
        (AffordanceStyle::Buttons, Decision::Confirm) => "confirm",
        (AffordanceStyle::Buttons, Decision::Deny) => "deny",
        (AffordanceStyle::Reactions, Decision::Confirm) => "✅",
        (AffordanceStyle::Reactions, Decision::Deny) => "❌",
    }
}

/// Map an inbound button id or reaction back to a decision
pub fn parse_control(style: AffordanceStyle, control: &str) -> Option<Decision> {
    [Decision::Confirm, Decision::Deny]
        .into_iter()
        .find(|d| control_label(style, *d) == control.trim())
}

fn mention(id: ParticipantId) -> String {
    format!("<@{}>", id)
}

fn side_label(proposal: &MatchProposal, side: Side) -> String {
    match proposal.team(side) {
        Some(team) => format!("team {}", team),
        None => proposal
            .side(side)
            .iter()
            .map(|p| mention(*p))
            .collect::<Vec<_>>()
            .join(" & "),
    }
}

fn kind_title(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Duel => "1v1",
        MatchKind::Duo => "2v2",
        MatchKind::Lts => "LTS",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn proposal() -> MatchProposal {
        let now = Utc::now();
        MatchProposal {
            id: ProposalId::new(),
            kind: MatchKind::Duel,
            submitter: ParticipantId(11),
            side_a: vec![ParticipantId(11)],
            side_b: vec![ParticipantId(22)],
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

    #[test]
    fn test_controls_round_trip_per_style() {
        assert_eq!(parse_control(AffordanceStyle::Reactions, "✅"), Some(Decision::Confirm));
        assert_eq!(parse_control(AffordanceStyle::Reactions, "❌"), Some(Decision::Deny));
        assert_eq!(parse_control(AffordanceStyle::Buttons, "deny"), Some(Decision::Deny));
        assert_eq!(parse_control(AffordanceStyle::Buttons, "✅"), None);
        assert_eq!(parse_control(AffordanceStyle::Reactions, "👍"), None);
    }

    #[test]
    fn test_prompt_pings_the_opposing_side() {
        let text = prompt_text(&proposal(), AffordanceStyle::Reactions);
        assert!(text.starts_with("<@11> reported a 1v1 result"));
        assert!(text.contains("<@22>: ✅ to confirm"));
    }

    #[test]
    fn test_denied_notice_names_the_actor() {
        let notice = OutcomeNotice::denied(&proposal(), ParticipantId(22));
        assert_eq!(notice.status, ProposalStatus::Denied);
        assert_eq!(notice.text(), "1v1 result denied\nDenied by <@22>");
    }
}
