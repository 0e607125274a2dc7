//! Protocol error types.

use thiserror::Error;

use ledgermail_client::ClientError;
use ledgermail_core::{AccountId, CoreError};
use ledgermail_messenger::MessengerError;

/// Errors raised by the sharing protocol.
///
/// Precondition failures are fatal to the call and never retried; push
/// paths stay safe to retry after a transient submission failure because
/// both deduplicate against ledger state.
#[derive(Debug, Error)]
pub enum MultisigError {
    /// Signature sharing is not enabled on the account.
    #[error("signature sharing is not enabled on account {0}")]
    NotEnabled(AccountId),

    /// The acting key is not among the transaction's legitimate signers.
    #[error("account {0} is not a legitimate signer of this transaction")]
    NotALegitSigner(AccountId),

    /// The identity could not be established on the mailbox's network.
    #[error("account {0} does not exist on the mailbox network")]
    CrossNetworkAccount(AccountId),

    /// Mailbox delivery failure.
    #[error(transparent)]
    Messenger(#[from] MessengerError),

    /// Ledger or resolution failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Envelope encoding or decoding failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, MultisigError>;
