//! # Ledgermail Multisig
//!
//! Signature and transaction sharing between the co-signers of a
//! multi-party account, coordinated entirely through the ledger: the
//! account's data attributes hold the sharing configuration, and a
//! dedicated mailbox account receives digest-tagged deliveries carrying
//! partial signatures and pending envelopes.
//!
//! Every operation reads the configuration fresh from the ledger, so
//! concurrent processes managing the same account never act on stale
//! settings. Push paths deduplicate against ledger state and stay safe
//! to retry.

use std::sync::Arc;

use ledgermail_client::{Federation, Ledger, NetworkContext, Resolver};

pub mod config;
pub mod error;
pub mod signatures;
pub mod transactions;
pub mod user;

pub use config::{EnableOptions, SharingConfig, ATTR_ENDPOINT, ATTR_MAILBOX, ATTR_NETWORK};
pub use error::{MultisigError, Result};
pub use transactions::PendingTransaction;
pub use user::{Outcome, UserRef};

/// Whether mutating operations auto-submit when the user can sign.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolOptions {
    /// Sign and submit built transactions when the [`UserRef`] carries
    /// a keypair. On by default.
    pub auto_submit: bool,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self { auto_submit: true }
    }
}

/// The sharing protocol, bound to a ledger, a federation directory and
/// a home network.
///
/// Mailboxes configured on a foreign network are reached through a
/// second [`NetworkContext`] built per call; the home context is never
/// mutated.
pub struct Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    ledger: Arc<L>,
    resolver: Resolver<F>,
    home: NetworkContext,
    options: ProtocolOptions,
}

impl<L, F> Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    /// Bind the protocol to `ledger` and `federation` on `home`.
    pub fn new(ledger: Arc<L>, federation: Arc<F>, home: NetworkContext) -> Self {
        Self {
            ledger,
            resolver: Resolver::new(federation),
            home,
            options: ProtocolOptions::default(),
        }
    }

    /// Override the protocol options.
    pub fn with_options(mut self, options: ProtocolOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn ledger(&self) -> &L {
        &self.ledger
    }

    pub(crate) fn resolver(&self) -> &Resolver<F> {
        &self.resolver
    }

    /// The home network context.
    pub fn home(&self) -> &NetworkContext {
        &self.home
    }

    pub(crate) fn options(&self) -> &ProtocolOptions {
        &self.options
    }
}
