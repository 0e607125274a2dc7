//! Messenger error types.

use thiserror::Error;

use ledgermail_client::ClientError;
use ledgermail_core::CoreError;

/// Errors raised by the mailbox codec and delivery helpers.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// A delivery needs at least one destination.
    #[error("delivery has no destinations")]
    EmptyDestinations,

    /// More destinations than touch operations fit in one transaction.
    #[error("delivery has {0} destinations, more than fit in one transaction")]
    TooManyDestinations(usize),

    /// Ledger or resolution failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Envelope encoding or decoding failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, MessengerError>;
