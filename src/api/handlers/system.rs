use axum::{extract::State, http::StatusCode, Json};

use crate::api::{state::AppState, types::*};

/// GET /api/health -- liveness plus a store round-trip
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_status = match state.store.house_account().await {
        Ok(_) => "connected".to_string(),
        Err(e) => {
            tracing::warn!("Health check store probe failed: {}", e);
            "disconnected".to_string()
        }
    };

    let ok = store_status == "connected";
    let resp = HealthResponse {
        status: if ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        store: store_status,
        pending_proposals: state.coordinator.pending_count(),
        uptime_secs: state.uptime_seconds(),
    };

    if ok {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}
