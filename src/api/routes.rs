use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Proposal endpoints
        .route("/api/proposals", post(handlers::submit_proposal))
        .route("/api/proposals/:id", get(handlers::get_proposal))
        .route("/api/proposals/:id/resolve", post(handlers::resolve_proposal))
        .route("/api/proposals/:id/expire", post(handlers::expire_proposal))
        .route("/api/proposals/:id/reapply", post(handlers::reapply_proposal))
        .route("/api/interactions", post(handlers::relay_interaction))
        // Standings endpoints
        .route("/api/leaderboard/:kind", get(handlers::get_leaderboard))
        .route("/api/participants/:id/tier", get(handlers::get_tier))
        .route("/api/ledger", get(handlers::get_recent_ledger))
        // Economy endpoints
        .route("/api/house", get(handlers::get_house))
        .route("/api/house/payout-rate", put(handlers::set_payout_rate))
        .route("/api/participants/:id/spend", post(handlers::spend_coins))
        // System endpoints
        .route("/api/health", get(handlers::health_handler))
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}
