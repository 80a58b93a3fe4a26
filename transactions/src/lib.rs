//! Everything between a user's raw input and a signable transfer.
//!
//! - **validation**: amount and address checks that run before any network call
//! - **request**: the validated `ContributionRequest`
//! - **transaction**: the transfer `Transaction` and its status machine
//! - **message**: the on-chain encoding of a system-program transfer

pub mod error;
pub mod message;
pub mod request;
pub mod transaction;
pub mod validation;

pub use error::{TransitionError, ValidationError};
pub use message::{encode_transaction, TransferMessage};
pub use request::{ContributionRequest, MAX_MESSAGE_LEN};
pub use transaction::{Transaction, TxStatus};
pub use validation::{validate_address, validate_amount};
