pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod economy;
pub mod error;
pub mod ledger;
pub mod messenger;
pub mod persistence;
pub mod rating;
pub mod services;
pub mod tier;

pub use config::AppConfig;
pub use coordinator::{ConfirmationCoordinator, Outcome, RecoveryLoader, RecoverySummary};
pub use error::{MatchbookError, Result};
pub use ledger::{AppliedMatch, LedgerApplier};
pub use persistence::{MemoryStore, PostgresStore, Store};
