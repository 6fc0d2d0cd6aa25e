use axum::{
    extract::{Path, State},
    Json,
};

use super::{api_error, ApiResult};
use crate::api::{state::AppState, types::*};
use crate::domain::{HouseAccount, ParticipantId};

/// GET /api/house
pub async fn get_house(State(state): State<AppState>) -> ApiResult<HouseAccount> {
    let house = state.store.house_account().await.map_err(api_error)?;
    Ok(Json(house))
}

/// PUT /api/house/payout-rate
pub async fn set_payout_rate(
    State(state): State<AppState>,
    Json(req): Json<PayoutRateRequest>,
) -> ApiResult<HouseAccount> {
    let house = state
        .store
        .set_payout_rate(req.payout_rate)
        .await
        .map_err(api_error)?;
    Ok(Json(house))
}

/// POST /api/participants/:id/spend
pub async fn spend_coins(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SpendRequest>,
) -> ApiResult<HouseAccount> {
    let house = state
        .store
        .spend_coins(ParticipantId(id), req.amount)
        .await
        .map_err(api_error)?;
    Ok(Json(house))
}
