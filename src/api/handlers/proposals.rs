use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::{api_error, bad_request, ApiError, ApiResult};
use crate::api::{state::AppState, types::*};
use crate::coordinator::ActorEvent;
use crate::domain::{MatchProposal, MatchSubmission, ProposalId, ProposalStatus};
use crate::error::MatchbookError;
use crate::messenger::parse_control;

fn parse_id(raw: &str) -> std::result::Result<ProposalId, ApiError> {
    raw.parse()
        .map_err(|_| bad_request(format!("'{}' is not a proposal id", raw)))
}

/// POST /api/proposals
pub async fn submit_proposal(
    State(state): State<AppState>,
    Json(submission): Json<MatchSubmission>,
) -> std::result::Result<(StatusCode, Json<MatchProposal>), ApiError> {
    let proposal = state.coordinator.submit(submission).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// GET /api/proposals/:id
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ProposalView> {
    let id = parse_id(&id)?;
    let proposal = state
        .store
        .get_proposal(id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| api_error(MatchbookError::not_found(format!("proposal {}", id))))?;

    let ledger_entry = match proposal.status {
        ProposalStatus::Applied => state.store.ledger_entry_for(id).await.map_err(api_error)?,
        _ => None,
    };
    Ok(Json(ProposalView {
        proposal,
        ledger_entry,
    }))
}

/// POST /api/proposals/:id/resolve
pub async fn resolve_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<OutcomeResponse> {
    let proposal_id = parse_id(&id)?;
    let outcome = state
        .coordinator
        .resolve(proposal_id, req.actor, req.decision)
        .await
        .map_err(api_error)?;
    Ok(Json(OutcomeResponse {
        proposal_id,
        outcome,
    }))
}

/// POST /api/proposals/:id/expire
pub async fn expire_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OutcomeResponse> {
    let proposal_id = parse_id(&id)?;
    let outcome = state.coordinator.expire(proposal_id).await.map_err(api_error)?;
    Ok(Json(OutcomeResponse {
        proposal_id,
        outcome,
    }))
}

/// POST /api/proposals/:id/reapply
pub async fn reapply_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OutcomeResponse> {
    let proposal_id = parse_id(&id)?;
    let outcome = state.coordinator.reapply(proposal_id).await.map_err(api_error)?;
    Ok(Json(OutcomeResponse {
        proposal_id,
        outcome,
    }))
}

/// POST /api/interactions -- queued for the event pump; failures go back as DMs
pub async fn relay_interaction(
    State(state): State<AppState>,
    Json(req): Json<InteractionRequest>,
) -> std::result::Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let decision = parse_control(state.affordance, &req.control).ok_or_else(|| {
        bad_request(format!(
            "'{}' is not a {} control",
            req.control,
            state.affordance.as_str()
        ))
    })?;

    state
        .events
        .send(ActorEvent {
            actor: req.actor,
            proposal_id: req.proposal_id,
            decision,
        })
        .await
        .map_err(|_| {
            api_error(MatchbookError::Internal(
                "coordinator event loop is not running".into(),
            ))
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            queued_at: Utc::now(),
        }),
    ))
}
