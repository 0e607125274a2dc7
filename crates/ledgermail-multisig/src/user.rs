//! User references and operation outcomes.

use ledgermail_client::{Account, ClientError, Federation, Ledger, NetworkContext, SubmitResponse};
use ledgermail_core::{AccountId, Keypair, Transaction};

use crate::error::{MultisigError, Result};
use crate::Multisig;

/// The identity a protocol operation acts for.
///
/// A closed set instead of runtime type inspection: an address still to
/// resolve, a keypair able to sign, or an account object the caller
/// already holds. Resolution happens once at the entry of each
/// operation.
pub enum UserRef {
    /// Canonical identifier or federated alias.
    Identifier(String),
    /// A keypair; enables auto-submission.
    Signer(Keypair),
    /// A previously loaded account, used as-is.
    Resolved(Account),
}

impl UserRef {
    /// The keypair able to sign on this user's behalf, if any.
    pub fn keypair(&self) -> Option<&Keypair> {
        match self {
            UserRef::Signer(keypair) => Some(keypair),
            _ => None,
        }
    }
}

/// What a mutating protocol operation produced.
///
/// With a signing [`UserRef`] and auto-submission enabled, the operation
/// signs and submits; otherwise the caller receives the built transaction
/// and handles signing and submission.
#[derive(Debug)]
pub enum Outcome {
    /// The unsigned transaction; the caller signs and submits.
    Built(Transaction),
    /// The ledger's acknowledgement of the submitted transaction.
    Submitted(SubmitResponse),
}

impl Outcome {
    /// The built transaction, if this outcome was not submitted.
    pub fn into_built(self) -> Option<Transaction> {
        match self {
            Outcome::Built(tx) => Some(tx),
            Outcome::Submitted(_) => None,
        }
    }

    /// The submission acknowledgement, if any.
    pub fn submitted(&self) -> Option<&SubmitResponse> {
        match self {
            Outcome::Submitted(response) => Some(response),
            Outcome::Built(_) => None,
        }
    }
}

impl<L, F> Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    /// Resolve `user` to an account on the home network.
    pub(crate) async fn resolve_user(&self, user: &UserRef) -> Result<Account> {
        match user {
            UserRef::Identifier(address) => Ok(self
                .resolver()
                .resolve_account(address, self.ledger(), self.home())
                .await?),
            UserRef::Signer(keypair) => Ok(self
                .ledger()
                .load_account(&keypair.account_id(), self.home())
                .await?),
            UserRef::Resolved(account) => Ok(account.clone()),
        }
    }

    /// Resolve `user` to an account identifier without loading it.
    pub(crate) async fn user_id(&self, user: &UserRef) -> Result<AccountId> {
        match user {
            UserRef::Identifier(address) => {
                Ok(self.resolver().resolve(address).await?.account_id)
            }
            UserRef::Signer(keypair) => Ok(keypair.account_id()),
            UserRef::Resolved(account) => Ok(account.id.clone()),
        }
    }

    /// Load `user`'s account on `ctx`, establishing it there first when
    /// the mailbox lives on a foreign network.
    pub(crate) async fn sender_on(&self, ctx: &NetworkContext, user: &UserRef) -> Result<Account> {
        let id = self.user_id(user).await?;
        if ctx != self.home() && !self.ledger().account_exists(&id, ctx).await? {
            self.ledger()
                .ensure_funded(&id, ctx)
                .await
                .map_err(|e| match e {
                    ClientError::UnsupportedNetwork(_) => {
                        MultisigError::CrossNetworkAccount(id.clone())
                    }
                    other => MultisigError::Client(other),
                })?;
        }
        Ok(self.ledger().load_account(&id, ctx).await?)
    }

    /// Close out a mutating operation: sign and submit when `user` can
    /// sign and auto-submission is on, return the built transaction
    /// otherwise.
    pub(crate) async fn finish(
        &self,
        mut tx: Transaction,
        user: &UserRef,
        ctx: &NetworkContext,
    ) -> Result<Outcome> {
        match user.keypair() {
            Some(keypair) if self.options().auto_submit => {
                tx.sign(keypair);
                let response = self.ledger().submit(&tx, ctx).await?;
                Ok(Outcome::Submitted(response))
            }
            _ => Ok(Outcome::Built(tx)),
        }
    }
}
