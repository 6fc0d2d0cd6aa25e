//! Messages flowing into and out of the confirmation coordinator

use serde::{Deserialize, Serialize};

use crate::domain::{Decision, ParticipantId, ProposalId};
use crate::ledger::AppliedMatch;

/// An inbound confirm/deny from the messaging platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorEvent {
    pub actor: ParticipantId,
    pub proposal_id: ProposalId,
    pub decision: Decision,
}

/// How a proposal left the Proposed state
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Confirmed and committed to the ledger
    Applied(AppliedMatch),
    Denied { by: ParticipantId },
    /// Deadline elapsed or the prompt disappeared
    Expired,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Applied(_) => "applied",
            Outcome::Denied { .. } => "denied",
            Outcome::Expired => "expired",
        }
    }
}
