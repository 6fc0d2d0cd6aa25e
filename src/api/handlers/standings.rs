use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{api_error, bad_request, ApiResult};
use crate::api::{state::AppState, types::*};
use crate::domain::{LedgerEntry, MatchKind, ParticipantId};
use crate::services::standings::Standing;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// GET /api/leaderboard/:kind?limit=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Standing>> {
    let kind = MatchKind::try_from(kind.as_str()).map_err(bad_request)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let board = state
        .standings
        .leaderboard(kind, limit)
        .await
        .map_err(api_error)?;
    Ok(Json(board))
}

/// GET /api/participants/:id/tier
pub async fn get_tier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<TierResponse> {
    let participant = ParticipantId(id);
    let tier = state.standings.tier(participant).await.map_err(api_error)?;
    Ok(Json(TierResponse {
        participant,
        tier,
        badge: tier.badge().to_string(),
    }))
}

/// GET /api/ledger?limit=
pub async fn get_recent_ledger(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<LedgerEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = state.store.recent_ledger(limit).await.map_err(api_error)?;
    Ok(Json(entries))
}
