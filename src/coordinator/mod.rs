//! Proposal confirmation: validation, resolve authority, deadline timers,
//! the inbound event pump and startup recovery.

pub mod command;
pub mod coordinator;
pub mod recovery;
pub mod registry;
pub mod validation;

pub use command::{ActorEvent, Outcome};
pub use coordinator::ConfirmationCoordinator;
pub use recovery::{RecoveryLoader, RecoverySummary};
pub use registry::PendingRegistry;
