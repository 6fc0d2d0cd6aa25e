use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::AffordanceStyle;
use crate::coordinator::{ActorEvent, ConfirmationCoordinator};
use crate::persistence::Store;
use crate::services::standings::StandingsService;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub coordinator: ConfirmationCoordinator,

    pub standings: StandingsService,

    /// Inbound actor events for the coordinator's event pump
    pub events: mpsc::Sender<ActorEvent>,

    /// How relayed interactions are decoded
    pub affordance: AffordanceStyle,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        coordinator: ConfirmationCoordinator,
        standings: StandingsService,
        events: mpsc::Sender<ActorEvent>,
        affordance: AffordanceStyle,
    ) -> Self {
        Self {
            store: coordinator.store().clone(),
            coordinator,
            standings,
            events,
            affordance,
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
