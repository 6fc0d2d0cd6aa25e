pub mod ledger;
pub mod participant;
pub mod proposal;

pub use ledger::{HouseAccount, LedgerEntry, NewLedgerEntry};
pub use participant::{
    display_rating, Competitor, NewParticipant, NewTeam, Participant, ParticipantId, Team, TeamId,
};
pub use proposal::{
    Decision, MatchKind, MatchProposal, MatchSubmission, MessageRef, ProposalId, ProposalStatus,
    Side,
};
