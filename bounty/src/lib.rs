//! The bounty contribution flow.
//!
//! Takes a validated [`ContributionRequest`](bos_transactions::ContributionRequest)
//! from "user pressed contribute" to "bounty total credited":
//!
//! 1. ensure a wallet is connected
//! 2. build the transfer and have the wallet sign and send it
//! 3. journal the signature
//! 4. watch for confirmation
//! 5. reconcile the confirmed transfer into the bounty store, exactly once
//!
//! Anything that times out stays in the journal and can be picked up again
//! with [`ContributionFlow::resume`].

pub mod cancel;
pub mod config;
pub mod error;
pub mod flow;
pub mod journal;
pub mod outcome;
pub mod reconciler;
pub mod watcher;

pub use cancel::CancelHandle;
pub use config::BountyConfig;
pub use error::{ConfigError, FailureClass, FlowError, JournalError, ReconcileError, WatchError};
pub use flow::{ContributionFlow, ContributionResult, FlowSettings};
pub use journal::{FileJournal, Journal, JournalEntry, JournalStage, MemoryJournal};
pub use outcome::Outcome;
pub use reconciler::Reconciler;
pub use watcher::ConfirmationWatcher;
