use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{PgConnection, Postgres, Row, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{ensure_manual_transition, lock_order, validate_new_team, LedgerTx, Store};
use crate::domain::{
    Competitor, HouseAccount, LedgerEntry, MatchKind, MatchProposal, MessageRef, NewLedgerEntry,
    NewParticipant, NewTeam, Participant, ParticipantId, ProposalId, ProposalStatus, Team, TeamId,
};
use crate::economy::{debit_coins, validate_payout_rate};
use crate::error::{MatchbookError, Result};

const PARTICIPANT_COLUMNS: &str =
    "id, display_name, rating, kills, deaths, matches, coins, retired, created_at";

const TEAM_COLUMNS: &str = "id, kind, name, owner_id, rating, matches, wins, losses";

const PROPOSAL_COLUMNS: &str = "id, kind, submitter_id, side_a, side_b, team_a, team_b, \
     score_a, score_b, status, created_at, expires_at, resolved_at, resolved_by, \
     message_channel, message_id";

const LEDGER_COLUMNS: &str = "id, proposal_id, kind, winner_id, winner_score, winner_rating, \
     loser_id, loser_score, loser_rating, submitter_id, confirmed_by, created_at";

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    initial_rating: f64,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            initial_rating: 1500.0,
        }
    }

    /// Rating assigned to newly registered participants and teams
    pub fn with_initial_rating(mut self, rating: f64) -> Self {
        self.initial_rating = rating;
        self
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn rosters(&self, team_ids: &[i64]) -> Result<HashMap<i64, Vec<ParticipantId>>> {
        let mut conn = self.pool.acquire().await?;
        fetch_rosters(&mut conn, team_ids).await
    }

    async fn teams_with_rosters(&self, rows: Vec<PgRow>) -> Result<Vec<Team>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        let mut rosters = self.rosters(&ids).await?;
        rows.iter()
            .map(|r| {
                let roster = rosters.remove(&r.get::<i64, _>("id")).unwrap_or_default();
                team_from_row(r, roster)
            })
            .collect()
    }
}

// ==================== Row mapping ====================

fn storage_err(msg: String) -> MatchbookError {
    MatchbookError::Storage(msg)
}

fn participant_from_row(r: &PgRow) -> Participant {
    Participant {
        id: ParticipantId(r.get("id")),
        display_name: r.get("display_name"),
        rating: r.get("rating"),
        kills: r.get("kills"),
        deaths: r.get("deaths"),
        matches: r.get("matches"),
        coins: r.get("coins"),
        retired: r.get("retired"),
        created_at: r.get("created_at"),
    }
}

fn team_from_row(r: &PgRow, roster: Vec<ParticipantId>) -> Result<Team> {
    let kind: String = r.get("kind");
    Ok(Team {
        id: TeamId(r.get("id")),
        kind: MatchKind::try_from(kind.as_str()).map_err(storage_err)?,
        name: r.get("name"),
        owner: ParticipantId(r.get("owner_id")),
        roster,
        rating: r.get("rating"),
        matches: r.get("matches"),
        wins: r.get("wins"),
        losses: r.get("losses"),
    })
}

fn ids(raw: Vec<i64>) -> Vec<ParticipantId> {
    raw.into_iter().map(ParticipantId).collect()
}

fn raw_ids(ids: &[ParticipantId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

fn proposal_from_row(r: &PgRow) -> Result<MatchProposal> {
    let kind: String = r.get("kind");
    let status: String = r.get("status");
    let channel: Option<String> = r.get("message_channel");
    let message_id: Option<String> = r.get("message_id");

    Ok(MatchProposal {
        id: ProposalId(r.get::<Uuid, _>("id")),
        kind: MatchKind::try_from(kind.as_str()).map_err(storage_err)?,
        submitter: ParticipantId(r.get("submitter_id")),
        side_a: ids(r.get("side_a")),
        side_b: ids(r.get("side_b")),
        team_a: r.get::<Option<i64>, _>("team_a").map(TeamId),
        team_b: r.get::<Option<i64>, _>("team_b").map(TeamId),
        score_a: r.get("score_a"),
        score_b: r.get("score_b"),
        status: ProposalStatus::try_from(status.as_str()).map_err(storage_err)?,
        created_at: r.get("created_at"),
        expires_at: r.get("expires_at"),
        resolved_at: r.get("resolved_at"),
        resolved_by: r.get::<Option<i64>, _>("resolved_by").map(ParticipantId),
        message: match (channel, message_id) {
            (Some(channel_id), Some(message_id)) => Some(MessageRef {
                channel_id,
                message_id,
            }),
            _ => None,
        },
    })
}

fn ledger_from_row(r: &PgRow) -> Result<LedgerEntry> {
    let kind: String = r.get("kind");
    let kind = MatchKind::try_from(kind.as_str()).map_err(storage_err)?;
    Ok(LedgerEntry {
        id: r.get("id"),
        proposal_id: ProposalId(r.get::<Uuid, _>("proposal_id")),
        kind,
        winner: Competitor::for_kind(kind, r.get("winner_id")),
        winner_score: r.get("winner_score"),
        winner_rating: r.get("winner_rating"),
        loser: Competitor::for_kind(kind, r.get("loser_id")),
        loser_score: r.get("loser_score"),
        loser_rating: r.get("loser_rating"),
        submitter: ParticipantId(r.get("submitter_id")),
        confirmed_by: r.get::<Option<i64>, _>("confirmed_by").map(ParticipantId),
        created_at: r.get("created_at"),
    })
}

fn house_from_row(r: &PgRow) -> HouseAccount {
    HouseAccount {
        balance: r.get("balance"),
        payout_rate: r.get::<Decimal, _>("payout_rate"),
        updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn fetch_rosters(
    conn: &mut PgConnection,
    team_ids: &[i64],
) -> Result<HashMap<i64, Vec<ParticipantId>>> {
    let rows = sqlx::query(
        r#"
        SELECT team_id, participant_id FROM team_members
        WHERE team_id = ANY($1)
        ORDER BY team_id, participant_id
        "#,
    )
    .bind(team_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut rosters: HashMap<i64, Vec<ParticipantId>> = HashMap::new();
    for r in rows {
        rosters
            .entry(r.get("team_id"))
            .or_default()
            .push(ParticipantId(r.get("participant_id")));
    }
    Ok(rosters)
}

#[async_trait]
impl Store for PostgresStore {
    // ==================== Participants ====================

    #[instrument(skip(self, new), fields(participant = %new.id))]
    async fn register_participant(&self, new: NewParticipant) -> Result<Participant> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO participants (id, display_name, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(new.id.0)
        .bind(&new.display_name)
        .bind(self.initial_rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(participant_from_row(&row))
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(participant_from_row))
    }

    async fn get_participants(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }

    async fn set_retired(&self, id: ParticipantId, retired: bool) -> Result<Participant> {
        let row = sqlx::query(&format!(
            "UPDATE participants SET retired = $2 WHERE id = $1 RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(id.0)
        .bind(retired)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MatchbookError::not_found(format!("participant {}", id)))?;

        Ok(participant_from_row(&row))
    }

    async fn active_participants(&self, limit: Option<usize>) -> Result<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PARTICIPANT_COLUMNS} FROM participants
            WHERE NOT retired AND matches > 0
            ORDER BY rating DESC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }

    // ==================== Teams ====================

    #[instrument(skip(self, new), fields(kind = %new.kind, name = %new.name))]
    async fn create_team(&self, new: NewTeam) -> Result<Team> {
        validate_new_team(&new)?;
        let roster = lock_order(&new.roster);
        let mut tx = self.pool.begin().await?;

        let known: i64 = sqlx::query("SELECT COUNT(*) AS n FROM participants WHERE id = ANY($1)")
            .bind(raw_ids(&roster))
            .fetch_one(&mut *tx)
            .await?
            .get("n");
        if known as usize != roster.len() {
            return Err(MatchbookError::not_found(
                "team roster includes an unregistered participant",
            ));
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO teams (kind, name, owner_id, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(new.kind.as_str())
        .bind(&new.name)
        .bind(new.owner.0)
        .bind(self.initial_rating)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MatchbookError::validation(format!("team name '{}' is already taken", new.name))
            } else {
                e.into()
            }
        })?;
        let team_id: i64 = row.get("id");

        for member in &roster {
            sqlx::query(
                "INSERT INTO team_members (team_id, kind, participant_id) VALUES ($1, $2, $3)",
            )
            .bind(team_id)
            .bind(new.kind.as_str())
            .bind(member.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MatchbookError::validation(format!(
                        "participant {} is already on a {} team",
                        member, new.kind
                    ))
                } else {
                    e.into()
                }
            })?;
        }

        tx.commit().await?;
        info!("Created {} team {} ({})", new.kind, new.name, team_id);
        team_from_row(&row, roster)
    }

    async fn get_team(&self, id: TeamId) -> Result<Option<Team>> {
        let rows = sqlx::query(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"))
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(self.teams_with_rosters(rows).await?.into_iter().next())
    }

    async fn team_of(&self, kind: MatchKind, participant: ParticipantId) -> Result<Option<Team>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TEAM_COLUMNS} FROM teams
            WHERE id = (
                SELECT team_id FROM team_members WHERE kind = $1 AND participant_id = $2
            )
            "#
        ))
        .bind(kind.as_str())
        .bind(participant.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.teams_with_rosters(rows).await?.into_iter().next())
    }

    async fn ranked_teams(&self, kind: MatchKind, limit: Option<usize>) -> Result<Vec<Team>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TEAM_COLUMNS} FROM teams t
            WHERE kind = $1
              AND (SELECT COUNT(*) FROM team_members m WHERE m.team_id = t.id) >= 2
            ORDER BY rating DESC, id ASC
            LIMIT $2
            "#
        ))
        .bind(kind.as_str())
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        self.teams_with_rosters(rows).await
    }

    // ==================== Proposals ====================

    #[instrument(skip(self, proposal), fields(proposal = %proposal.id))]
    async fn create_proposal(&self, proposal: &MatchProposal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO proposals (
                id, kind, submitter_id, side_a, side_b, team_a, team_b,
                score_a, score_b, status, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(proposal.id.0)
        .bind(proposal.kind.as_str())
        .bind(proposal.submitter.0)
        .bind(raw_ids(&proposal.side_a))
        .bind(raw_ids(&proposal.side_b))
        .bind(proposal.team_a.map(|t| t.0))
        .bind(proposal.team_b.map(|t| t.0))
        .bind(proposal.score_a)
        .bind(proposal.score_b)
        .bind(proposal.status.as_str())
        .bind(proposal.created_at)
        .bind(proposal.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MatchbookError::conflict(format!("proposal {} already exists", proposal.id))
            } else {
                e.into()
            }
        })?;

        debug!("Persisted proposal {}", proposal.id);
        Ok(())
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<MatchProposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(proposal_from_row).transpose()
    }

    async fn proposals_with_status(&self, status: ProposalStatus) -> Result<Vec<MatchProposal>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(proposal_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn transition_proposal(
        &self,
        id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
        actor: Option<ParticipantId>,
    ) -> Result<bool> {
        ensure_manual_transition(from, to)?;
        let result = sqlx::query(
            r#"
            UPDATE proposals
            SET status = $3, resolved_at = NOW(), resolved_by = $4
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.0)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(actor.map(|a| a.0))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.get_proposal(id).await?.is_none() {
                return Err(MatchbookError::not_found(format!("proposal {}", id)));
            }
            debug!("Proposal {} no longer {}; {} transition skipped", id, from, to);
            return Ok(false);
        }
        Ok(true)
    }

    async fn set_message_ref(&self, id: ProposalId, message: &MessageRef) -> Result<()> {
        let result = sqlx::query(
            "UPDATE proposals SET message_channel = $2, message_id = $3 WHERE id = $1",
        )
        .bind(id.0)
        .bind(&message.channel_id)
        .bind(&message.message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MatchbookError::not_found(format!("proposal {}", id)));
        }
        Ok(())
    }

    // ==================== Ledger ====================

    async fn begin_ledger(&self) -> Result<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        debug!("Started ledger transaction");
        Ok(Box::new(PgLedgerTx {
            tx: Some(tx),
            committed: false,
        }))
    }

    async fn ledger_entry_for(&self, proposal: ProposalId) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE proposal_id = $1"
        ))
        .bind(proposal.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn recent_ledger(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries ORDER BY id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ledger_from_row).collect()
    }

    // ==================== House account ====================

    async fn house_account(&self) -> Result<HouseAccount> {
        let row = sqlx::query("SELECT balance, payout_rate, updated_at FROM house_account WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MatchbookError::Storage("house account row is missing".into()))?;

        Ok(house_from_row(&row))
    }

    #[instrument(skip(self))]
    async fn set_payout_rate(&self, rate: Decimal) -> Result<HouseAccount> {
        validate_payout_rate(rate)?;
        let row = sqlx::query(
            r#"
            UPDATE house_account SET payout_rate = $1, updated_at = NOW()
            WHERE id = 1
            RETURNING balance, payout_rate, updated_at
            "#,
        )
        .bind(rate)
        .fetch_one(&self.pool)
        .await?;

        info!("House payout rate set to {}%", rate);
        Ok(house_from_row(&row))
    }

    #[instrument(skip(self))]
    async fn spend_coins(&self, participant: ParticipantId, amount: i64) -> Result<HouseAccount> {
        let mut tx = self.pool.begin().await?;

        let coins: i64 = sqlx::query("SELECT coins FROM participants WHERE id = $1 FOR UPDATE")
            .bind(participant.0)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| MatchbookError::not_found(format!("participant {}", participant)))?
            .get("coins");
        let remaining = debit_coins(coins, amount)?;

        sqlx::query("UPDATE participants SET coins = $2 WHERE id = $1")
            .bind(participant.0)
            .bind(remaining)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            UPDATE house_account SET balance = balance + $1, updated_at = NOW()
            WHERE id = 1
            RETURNING balance, payout_rate, updated_at
            "#,
        )
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(house_from_row(&row))
    }
}

/// Ledger transaction; rolls back if dropped without commit
pub struct PgLedgerTx {
    tx: Option<Transaction<'static, Postgres>>,
    committed: bool,
}

impl PgLedgerTx {
    fn executor(&mut self) -> Result<&mut PgConnection> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| MatchbookError::Internal("ledger transaction already consumed".into()))?;
        Ok(&mut **tx)
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_proposal(&mut self, id: ProposalId) -> Result<Option<MatchProposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.0)
        .fetch_optional(self.executor()?)
        .await?;

        row.as_ref().map(proposal_from_row).transpose()
    }

    async fn lock_teams(&mut self, ids: &[TeamId]) -> Result<Vec<Team>> {
        let ordered: Vec<i64> = lock_order(ids).iter().map(|t| t.0).collect();
        let conn = self.executor()?;
        let rows = sqlx::query(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ordered)
        .fetch_all(&mut *conn)
        .await?;

        let mut rosters = fetch_rosters(conn, &ordered).await?;
        rows.iter()
            .map(|r| {
                let roster = rosters.remove(&r.get::<i64, _>("id")).unwrap_or_default();
                team_from_row(r, roster)
            })
            .collect()
    }

    async fn lock_participants(&mut self, ids: &[ParticipantId]) -> Result<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(raw_ids(&lock_order(ids)))
        .fetch_all(self.executor()?)
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }

    async fn lock_house(&mut self) -> Result<HouseAccount> {
        let row = sqlx::query(
            "SELECT balance, payout_rate, updated_at FROM house_account WHERE id = 1 FOR UPDATE",
        )
        .fetch_optional(self.executor()?)
        .await?
        .ok_or_else(|| MatchbookError::Storage("house account row is missing".into()))?;

        Ok(house_from_row(&row))
    }

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                proposal_id, kind, winner_id, winner_score, winner_rating,
                loser_id, loser_score, loser_rating, submitter_id, confirmed_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(entry.proposal_id.0)
        .bind(entry.kind.as_str())
        .bind(entry.winner.raw_id())
        .bind(entry.winner_score)
        .bind(entry.winner_rating)
        .bind(entry.loser.raw_id())
        .bind(entry.loser_score)
        .bind(entry.loser_rating)
        .bind(entry.submitter.0)
        .bind(entry.confirmed_by.map(|c| c.0))
        .bind(entry.created_at)
        .fetch_one(self.executor()?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MatchbookError::conflict(format!(
                    "ledger entry for proposal {} already exists",
                    entry.proposal_id
                ))
            } else {
                e.into()
            }
        })?;

        Ok(entry.into_entry(row.get("id")))
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE participants SET
                rating = $2, kills = $3, deaths = $4, matches = $5, coins = $6
            WHERE id = $1
            "#,
        )
        .bind(participant.id.0)
        .bind(participant.rating)
        .bind(participant.kills)
        .bind(participant.deaths)
        .bind(participant.matches)
        .bind(participant.coins)
        .execute(self.executor()?)
        .await?;
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE teams SET rating = $2, matches = $3, wins = $4, losses = $5
            WHERE id = $1
            "#,
        )
        .bind(team.id.0)
        .bind(team.rating)
        .bind(team.matches)
        .bind(team.wins)
        .bind(team.losses)
        .execute(self.executor()?)
        .await?;
        Ok(())
    }

    async fn update_house(&mut self, house: &HouseAccount) -> Result<()> {
        sqlx::query("UPDATE house_account SET balance = $1, updated_at = NOW() WHERE id = 1")
            .bind(house.balance)
            .execute(self.executor()?)
            .await?;
        Ok(())
    }

    async fn mark_applied(&mut self, id: ProposalId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE proposals SET status = 'applied' WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(id.0)
        .execute(self.executor()?)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            self.committed = true;
            debug!("Committed ledger transaction");
        }
        Ok(())
    }
}

impl Drop for PgLedgerTx {
    fn drop(&mut self) {
        if self.tx.is_some() && !self.committed {
            // sqlx rolls the transaction back when it is dropped
            warn!("Ledger transaction dropped without commit - rolling back");
        }
    }
}
