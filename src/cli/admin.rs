//! Offline admin commands that talk to the store directly

use serde::Serialize;
use tabled::Tabled;

use super::output::{self, OutputMode};
use crate::domain::{
    LedgerEntry, MatchKind, NewParticipant, NewTeam, ParticipantId, Team, TeamId,
};
use crate::error::MatchbookError;
use crate::persistence::Store;
use crate::services::standings::{Standing, StandingsService};

#[derive(Debug, Serialize, Tabled)]
pub struct StandingRow {
    pub rank: usize,
    pub name: String,
    pub rating: i64,
    pub matches: i64,
    #[tabled(rename = "won/kills")]
    pub won: i64,
    #[tabled(rename = "lost/deaths")]
    pub lost: i64,
    pub tier: String,
}

impl From<Standing> for StandingRow {
    fn from(s: Standing) -> Self {
        Self {
            rank: s.rank,
            name: s.name,
            rating: s.rating,
            matches: s.matches,
            won: s.won,
            lost: s.lost,
            tier: s.tier.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct LedgerRow {
    pub id: i64,
    pub kind: String,
    pub winner: String,
    pub loser: String,
    pub score: String,
    pub ratings: String,
    pub at: String,
}

impl From<LedgerEntry> for LedgerRow {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id,
            kind: e.kind.to_string(),
            winner: e.winner.to_string(),
            loser: e.loser.to_string(),
            score: format!("{}-{}", e.winner_score, e.loser_score),
            ratings: format!("{:.0} / {:.0}", e.winner_rating, e.loser_rating),
            at: e.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct RosterRow {
    pub participant: i64,
    pub name: String,
    pub owner: bool,
}

pub async fn show_leaderboard(
    standings: &StandingsService,
    kind: MatchKind,
    limit: usize,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let rows: Vec<StandingRow> = standings
        .leaderboard(kind, limit)
        .await?
        .into_iter()
        .map(StandingRow::from)
        .collect();
    if mode == OutputMode::Table {
        println!("{} leaderboard", kind);
    }
    output::print_items(&rows, mode)
}

pub async fn show_tier(standings: &StandingsService, participant: i64) -> anyhow::Result<()> {
    let tier = standings.tier(ParticipantId(participant)).await?;
    output::print_kv("tier", tier.as_str());
    Ok(())
}

pub async fn show_house(store: &dyn Store, mode: OutputMode) -> anyhow::Result<()> {
    let house = store.house_account().await?;
    output::print_item(&house, mode)
}

pub async fn show_ledger(store: &dyn Store, limit: usize, mode: OutputMode) -> anyhow::Result<()> {
    let rows: Vec<LedgerRow> = store
        .recent_ledger(limit)
        .await?
        .into_iter()
        .map(LedgerRow::from)
        .collect();
    output::print_items(&rows, mode)
}

pub async fn register(store: &dyn Store, id: i64, name: String) -> anyhow::Result<()> {
    let participant = store
        .register_participant(NewParticipant {
            id: ParticipantId(id),
            display_name: name,
        })
        .await?;
    output::print_success(&format!(
        "Registered {} ({}) at rating {}",
        participant.display_name,
        participant.id,
        participant.display_rating()
    ));
    Ok(())
}

pub async fn retire(store: &dyn Store, id: i64, undo: bool) -> anyhow::Result<()> {
    let participant = store.set_retired(ParticipantId(id), !undo).await?;
    let verb = if participant.retired { "Retired" } else { "Reinstated" };
    output::print_success(&format!("{} {}", verb, participant.display_name));
    Ok(())
}

pub async fn create_team(
    store: &dyn Store,
    kind: MatchKind,
    name: String,
    owner: i64,
    members: Vec<i64>,
) -> anyhow::Result<()> {
    let team = store
        .create_team(NewTeam {
            kind,
            name,
            owner: ParticipantId(owner),
            roster: members.into_iter().map(ParticipantId).collect(),
        })
        .await?;
    output::print_success(&format!("Created {} team {} (id {})", kind, team.name, team.id));
    Ok(())
}

pub async fn show_team(store: &dyn Store, id: i64) -> anyhow::Result<()> {
    let team: Team = store
        .get_team(TeamId(id))
        .await?
        .ok_or_else(|| MatchbookError::not_found(format!("team {} does not exist", id)))?;

    output::print_kv("team", &team.name);
    output::print_kv("kind", team.kind.as_str());
    output::print_kv("rating", &team.display_rating().to_string());
    output::print_kv("record", &format!("{}W {}L", team.wins, team.losses));

    let members = store.get_participants(&team.roster).await?;
    let rows: Vec<RosterRow> = team
        .roster
        .iter()
        .map(|id| RosterRow {
            participant: id.0,
            name: members
                .iter()
                .find(|p| p.id == *id)
                .map(|p| p.display_name.clone())
                .unwrap_or_default(),
            owner: *id == team.owner,
        })
        .collect();
    output::print_items(&rows, OutputMode::Table)
}
