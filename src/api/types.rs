use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coordinator::Outcome;
use crate::domain::{Decision, LedgerEntry, MatchProposal, ParticipantId, ProposalId};
use crate::tier::TierLabel;

// ============================================================================
// Proposal Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub actor: ParticipantId,
    pub decision: Decision,
}

/// Button click or reaction relayed by the chat bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub actor: ParticipantId,
    pub proposal_id: ProposalId,
    pub control: String,
}

/// A proposal plus its ledger entry once applied
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: MatchProposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_entry: Option<LedgerEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeResponse {
    pub proposal_id: ProposalId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

// ============================================================================
// Standings Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierResponse {
    pub participant: ParticipantId,
    pub tier: TierLabel,
    pub badge: String,
}

// ============================================================================
// Economy Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRateRequest {
    pub payout_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
}

// ============================================================================
// System Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub pending_proposals: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
    pub queued_at: DateTime<Utc>,
}
