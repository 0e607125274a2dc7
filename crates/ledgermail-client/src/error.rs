//! Error types for the client layer.

use ledgermail_core::{AccountId, CoreError};
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the ledger capability layer.
///
/// Enumeration and lookup paths never use errors for "nothing found";
/// those return empty collections or `None`. Errors mark precondition
/// violations and I/O failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot resolve address: {0}")]
    Resolution(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("network does not support on-demand funding: {0}")]
    UnsupportedNetwork(String),

    #[error("unknown network '{0}' and no endpoint given")]
    UnknownNetwork(String),

    #[error("submission rejected: {diagnostic}")]
    Submission { diagnostic: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
