//! Pending-transaction exchange.
//!
//! A pending transaction travels as its signature-stripped envelope,
//! tagged `Hash(digest)`. The digest tag doubles as the deduplication
//! key: a delivery carrying it already means the transaction is on the
//! mailbox.

use ledgermail_client::{tx_signers, Federation, Ledger, TransactionRecord};
use ledgermail_core::{AccountId, Tag, Transaction};
use ledgermail_messenger::{decode, encode, find, Destinations, ListOptions};

use crate::config::read_config;
use crate::error::{MultisigError, Result};
use crate::user::{Outcome, UserRef};
use crate::Multisig;

/// A transaction awaiting co-signers, as listed from a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// The co-signer that shared it.
    pub sender: AccountId,
    /// Ledger sequence of the sharing delivery.
    pub ledger: u64,
    /// The shared envelope, standard base64.
    pub envelope_base64: String,
}

impl<L, F> Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    /// Share `tx` with its co-signers through the source account's
    /// mailbox.
    ///
    /// `user` must hold a key in the transaction's legitimate signer
    /// union. The envelope is published with signatures stripped; the
    /// local object is untouched. A delivery tagged with the same
    /// digest already on the mailbox makes this a no-op (`None`).
    pub async fn push_transaction(
        &self,
        tx: &Transaction,
        user: &UserRef,
    ) -> Result<Option<Outcome>> {
        let (_, config) = self.source_config(tx).await?;
        let ctx = self.mailbox_context(&config)?;
        let legit = tx_signers(self.ledger(), self.home(), tx).await?;

        let acting = self.resolve_user(user).await?;
        let acting_keys = match user.keypair() {
            Some(keypair) => vec![keypair.public_key()],
            None => acting.signer_keys(),
        };
        if !acting_keys.iter().any(|key| legit.contains(key)) {
            return Err(MultisigError::NotALegitSigner(acting.id));
        }

        let digest = tx.digest();
        let memo = digest.to_base64();
        let already = |record: &TransactionRecord| {
            record.memo_type == "hash" && record.memo == memo
        };
        if find(self.ledger(), &ctx, &config.mailbox, &already)
            .await?
            .is_some()
        {
            tracing::debug!(digest = %digest.to_hex(), "transaction already pushed");
            return Ok(None);
        }

        let sender = self.sender_on(&ctx, user).await?;
        let payload = tx.stripped().to_envelope();
        let (delivery, _) = encode(
            self.ledger(),
            &ctx,
            &sender,
            &Destinations::from(config.mailbox.clone()),
            Tag::Hash(digest),
            &payload,
        )
        .await?;
        let outcome = self.finish(delivery, user, &ctx).await?;
        Ok(Some(outcome))
    }

    /// Transactions shared on `user`'s mailbox by their co-signers,
    /// most recent first.
    ///
    /// Only deliveries sent by one of the account's current signers
    /// count. `since_ledger` stops the walk once a delivery at or below
    /// that ledger sequence is reached.
    pub async fn list_transactions(
        &self,
        user: &UserRef,
        since_ledger: Option<u64>,
    ) -> Result<Vec<PendingTransaction>> {
        let account = self.resolve_user(user).await?;
        let config = read_config(&account, self.home().network())
            .ok_or_else(|| MultisigError::NotEnabled(account.id.clone()))?;
        let ctx = self.mailbox_context(&config)?;

        let senders: Vec<AccountId> = account
            .signers
            .iter()
            .map(|signer| signer.key.account_id())
            .collect();
        let shared = |record: &TransactionRecord| {
            record.memo_type == "hash" && senders.contains(&record.source_account)
        };
        let stale = |record: &TransactionRecord| {
            matches!(since_ledger, Some(since) if record.ledger_sequence <= since)
        };
        let breaker: Option<&dyn ledgermail_client::ScanPredicate<TransactionRecord>> =
            if since_ledger.is_some() {
                Some(&stale)
            } else {
                None
            };
        let records = ledgermail_messenger::list_raw(
            self.ledger(),
            &ctx,
            &config.mailbox,
            ListOptions {
                limit: None,
                filter: Some(&shared),
                breaker,
            },
        )
        .await?;

        let mut pending = Vec::with_capacity(records.len());
        for record in &records {
            let Some(message) = decode(record)? else {
                continue;
            };
            let shared_tx = Transaction::from_envelope(&message.payload)?;
            pending.push(PendingTransaction {
                sender: record.source_account.clone(),
                ledger: record.ledger_sequence,
                envelope_base64: shared_tx.envelope_base64(),
            });
        }
        Ok(pending)
    }
}
