//! Submission checks and resolve authority
//!
//! `check_shape` is pure and runs before anything touches the store, so a
//! malformed or self-played match never produces a proposal row.

use std::collections::BTreeSet;

use crate::domain::{
    Decision, MatchKind, MatchProposal, MatchSubmission, ParticipantId, Side, Team, TeamId,
};
use crate::error::{MatchbookError, Result};
use crate::persistence::Store;

pub fn check_shape(submission: &MatchSubmission) -> Result<()> {
    let (min, max) = submission.kind.side_size();
    for (label, side) in [("A", &submission.side_a), ("B", &submission.side_b)] {
        let n = side.len();
        if n < min || max.is_some_and(|max| n > max) {
            let expected = match max {
                Some(max) if max == min => format!("exactly {}", min),
                Some(max) => format!("{} to {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(MatchbookError::validation(format!(
                "side {} of a {} match needs {} players, got {}",
                label, submission.kind, expected, n
            )));
        }
        let unique: BTreeSet<_> = side.iter().collect();
        if unique.len() != n {
            return Err(MatchbookError::validation(format!(
                "side {} lists the same player twice",
                label
            )));
        }
    }

    if submission.side_a.iter().any(|p| submission.side_b.contains(p)) {
        return Err(MatchbookError::validation(
            "a player cannot be on both sides of a match",
        ));
    }
    if submission.score_a < 0 || submission.score_b < 0 {
        return Err(MatchbookError::validation("scores must not be negative"));
    }
    if submission.score_a == submission.score_b {
        return Err(MatchbookError::validation(
            "tied scores cannot be reported; a match needs a winner",
        ));
    }
    if !submission.side_a.contains(&submission.submitter)
        && !submission.side_b.contains(&submission.submitter)
    {
        return Err(MatchbookError::validation(
            "the submitter must be one of the players",
        ));
    }
    Ok(())
}

/// Check players against the store and resolve the rated team of each side
pub async fn resolve_sides(
    store: &dyn Store,
    submission: &MatchSubmission,
) -> Result<(Option<TeamId>, Option<TeamId>)> {
    let listed: Vec<ParticipantId> = submission
        .side_a
        .iter()
        .chain(submission.side_b.iter())
        .copied()
        .collect();
    let found = store.get_participants(&listed).await?;
    for id in &listed {
        match found.iter().find(|p| p.id == *id) {
            None => {
                return Err(MatchbookError::not_found(format!(
                    "participant {} is not registered",
                    id
                )))
            }
            Some(p) if p.retired => {
                return Err(MatchbookError::validation(format!(
                    "participant {} is retired",
                    id
                )))
            }
            Some(_) => {}
        }
    }

    if !submission.kind.is_team() {
        return Ok((None, None));
    }

    let team_a = side_team(store, submission.kind, &submission.side_a, "A").await?;
    let team_b = side_team(store, submission.kind, &submission.side_b, "B").await?;
    if team_a.id == team_b.id {
        return Err(MatchbookError::validation(format!(
            "team {} cannot play itself",
            team_a.name
        )));
    }
    Ok((Some(team_a.id), Some(team_b.id)))
}

async fn side_team(
    store: &dyn Store,
    kind: MatchKind,
    side: &[ParticipantId],
    label: &str,
) -> Result<Team> {
    let mut team: Option<Team> = None;
    for member in side {
        let found = store.team_of(kind, *member).await?.ok_or_else(|| {
            MatchbookError::validation(format!("participant {} has no {} team", member, kind))
        })?;
        match &team {
            Some(t) if t.id != found.id => {
                return Err(MatchbookError::validation(format!(
                    "side {} mixes players from different {} teams",
                    label, kind
                )))
            }
            Some(_) => {}
            None => team = Some(found),
        }
    }

    let team = team.ok_or_else(|| MatchbookError::validation(format!("side {} is empty", label)))?;
    if kind == MatchKind::Duo && team.roster.len() != side.len() {
        return Err(MatchbookError::validation(format!(
            "side {} must list both players of team {}",
            label, team.name
        )));
    }
    Ok(team)
}

/// Everyone entitled to act for one side: listed players plus the team roster
pub fn side_authority(
    proposal: &MatchProposal,
    side: Side,
    team: Option<&Team>,
) -> BTreeSet<ParticipantId> {
    let mut members: BTreeSet<ParticipantId> = proposal.side(side).iter().copied().collect();
    if proposal.kind.is_team() {
        if let Some(team) = team {
            members.extend(team.roster.iter().copied());
        }
    }
    members
}

/// The opposing side may confirm or deny; the submitting side may only deny
pub fn authorize(
    proposal: &MatchProposal,
    actor: ParticipantId,
    decision: Decision,
    teams: (Option<&Team>, Option<&Team>),
) -> Result<()> {
    let submitting = proposal.submitting_side();
    let team_for = |side: Side| match side {
        Side::A => teams.0,
        Side::B => teams.1,
    };

    if side_authority(proposal, submitting.opposite(), team_for(submitting.opposite()))
        .contains(&actor)
    {
        return Ok(());
    }
    if side_authority(proposal, submitting, team_for(submitting)).contains(&actor) {
        return match decision {
            Decision::Deny => Ok(()),
            Decision::Confirm => Err(MatchbookError::Authorization(
                "only the opposing side can confirm this result".into(),
            )),
        };
    }
    Err(MatchbookError::Authorization(format!(
        "participant {} is not part of this match",
        actor
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewParticipant, NewTeam, ProposalId, ProposalStatus};
    use crate::persistence::MemoryStore;
    use chrono::{Duration, Utc};

    fn duel(a: i64, b: i64, score_a: i32, score_b: i32) -> MatchSubmission {
        MatchSubmission {
            kind: MatchKind::Duel,
            submitter: ParticipantId(a),
            side_a: vec![ParticipantId(a)],
            side_b: vec![ParticipantId(b)],
            score_a,
            score_b,
        }
    }

    fn as_proposal(s: &MatchSubmission, team_a: Option<TeamId>, team_b: Option<TeamId>) -> MatchProposal {
        let now = Utc::now();
        MatchProposal {
            id: ProposalId::new(),
            kind: s.kind,
            submitter: s.submitter,
            side_a: s.side_a.clone(),
            side_b: s.side_b.clone(),
            team_a,
            team_b,
            score_a: s.score_a,
            score_b: s.score_b,
            status: ProposalStatus::Proposed,
            created_at: now,
            expires_at: now + Duration::seconds(3600),
            resolved_at: None,
            resolved_by: None,
            message: None,
        }
    }

    #[test]
    fn test_shape_rejections() {
        let reject = |s: MatchSubmission| matches!(check_shape(&s), Err(MatchbookError::Validation(_)));

        assert!(check_shape(&duel(1, 2, 20, 10)).is_ok());
        assert!(reject(duel(1, 1, 20, 10)), "self-match");
        assert!(reject(duel(1, 2, 10, 10)), "tie");
        assert!(reject(duel(1, 2, -1, 10)), "negative score");

        let mut outsider = duel(1, 2, 5, 3);
        outsider.submitter = ParticipantId(3);
        assert!(reject(outsider));

        let mut wide = duel(1, 2, 5, 3);
        wide.side_b.push(ParticipantId(3));
        assert!(reject(wide));

        let mut lts = duel(1, 2, 5, 3);
        lts.kind = MatchKind::Lts;
        lts.side_a.push(ParticipantId(1));
        assert!(reject(lts), "duplicate within a side");
    }

    #[test]
    fn test_lts_sides_are_open_ended() {
        let mut lts = duel(1, 4, 5, 3);
        lts.kind = MatchKind::Lts;
        lts.side_a.extend([ParticipantId(2), ParticipantId(3)]);
        lts.side_b.extend([ParticipantId(5), ParticipantId(6), ParticipantId(7)]);
        assert!(check_shape(&lts).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_retired_players_rejected() {
        let store = MemoryStore::default();
        for id in [1, 2] {
            store
                .register_participant(NewParticipant {
                    id: ParticipantId(id),
                    display_name: format!("p{}", id),
                })
                .await
                .unwrap();
        }

        let err = resolve_sides(&store, &duel(1, 3, 2, 1)).await.unwrap_err();
        assert!(matches!(err, MatchbookError::NotFound(_)));

        store.set_retired(ParticipantId(2), true).await.unwrap();
        let err = resolve_sides(&store, &duel(1, 2, 2, 1)).await.unwrap_err();
        assert!(matches!(err, MatchbookError::Validation(_)));
    }

    #[tokio::test]
    async fn test_team_sides_resolve_to_teams() {
        let store = MemoryStore::default();
        for id in 1..=5 {
            store
                .register_participant(NewParticipant {
                    id: ParticipantId(id),
                    display_name: format!("p{}", id),
                })
                .await
                .unwrap();
        }
        let red = store
            .create_team(NewTeam {
                kind: MatchKind::Lts,
                name: "red".into(),
                owner: ParticipantId(1),
                roster: vec![ParticipantId(1), ParticipantId(2), ParticipantId(5)],
            })
            .await
            .unwrap();
        let blue = store
            .create_team(NewTeam {
                kind: MatchKind::Lts,
                name: "blue".into(),
                owner: ParticipantId(3),
                roster: vec![ParticipantId(3), ParticipantId(4)],
            })
            .await
            .unwrap();

        let mut s = duel(1, 3, 3, 1);
        s.kind = MatchKind::Lts;
        s.side_a.push(ParticipantId(2));
        let (a, b) = resolve_sides(&store, &s).await.unwrap();
        assert_eq!((a, b), (Some(red.id), Some(blue.id)));

        // Player 5 was not listed but is on red's roster, so may deny but not confirm
        let proposal = as_proposal(&s, a, b);
        let teams = (Some(&red), Some(&blue));
        assert!(authorize(&proposal, ParticipantId(5), Decision::Deny, teams).is_ok());
        assert!(matches!(
            authorize(&proposal, ParticipantId(5), Decision::Confirm, teams),
            Err(MatchbookError::Authorization(_))
        ));
        assert!(authorize(&proposal, ParticipantId(4), Decision::Confirm, teams).is_ok());

        // Mixing teams on one side
        let mut mixed = duel(1, 4, 3, 1);
        mixed.kind = MatchKind::Lts;
        mixed.side_a.push(ParticipantId(3));
        assert!(matches!(
            resolve_sides(&store, &mixed).await,
            Err(MatchbookError::Validation(_))
        ));
    }

    #[test]
    fn test_duel_authority() {
        let proposal = as_proposal(&duel(1, 2, 20, 10), None, None);
        let none = (None, None);
        assert!(authorize(&proposal, ParticipantId(2), Decision::Confirm, none).is_ok());
        assert!(authorize(&proposal, ParticipantId(2), Decision::Deny, none).is_ok());
        assert!(authorize(&proposal, ParticipantId(1), Decision::Deny, none).is_ok());
        assert!(authorize(&proposal, ParticipantId(1), Decision::Confirm, none).is_err());
        assert!(matches!(
            authorize(&proposal, ParticipantId(9), Decision::Deny, none),
            Err(MatchbookError::Authorization(_))
        ));
    }
}
