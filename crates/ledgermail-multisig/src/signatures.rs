//! Partial-signature exchange.
//!
//! Signatures travel as raw 64-byte frames concatenated into a mailbox
//! payload, tagged `Return(digest)` so every delivery is keyed to the
//! transaction it signs. Deduplication is byte-exact against what the
//! mailbox already holds; merging verifies every frame against the
//! digest before attaching it.

use ledgermail_client::{tx_signers, Account, Federation, Ledger, NetworkContext, TransactionRecord};
use ledgermail_core::{
    AccountId, DecoratedSignature, SignatureBytes, SignerKey, Tag, Transaction, TxDigest,
};
use ledgermail_messenger::{decode, encode, Destinations, ListOptions};

use crate::config::{read_config, SharingConfig};
use crate::error::{MultisigError, Result};
use crate::user::{Outcome, UserRef};
use crate::Multisig;

/// Byte length of one signature frame in a mailbox payload.
const SIGNATURE_FRAME: usize = 64;

impl<L, F> Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    /// The freshly read sharing configuration of `tx`'s source account.
    pub(crate) async fn source_config(
        &self,
        tx: &Transaction,
    ) -> Result<(Account, SharingConfig)> {
        let account = self.ledger().load_account(&tx.source, self.home()).await?;
        let config = read_config(&account, self.home().network())
            .ok_or_else(|| MultisigError::NotEnabled(account.id.clone()))?;
        Ok((account, config))
    }

    /// Signature frames delivered to `mailbox` for `digest`, restricted
    /// to deliveries sent by one of the `legit` signers.
    pub(crate) async fn mailbox_signatures(
        &self,
        ctx: &NetworkContext,
        mailbox: &AccountId,
        digest: &TxDigest,
        legit: &[SignerKey],
    ) -> Result<Vec<SignatureBytes>> {
        let memo = digest.to_base64();
        let tagged = |record: &TransactionRecord| {
            record.memo_type == "return" && record.memo == memo
        };
        let records = ledgermail_messenger::list_raw(
            self.ledger(),
            ctx,
            mailbox,
            ListOptions {
                limit: None,
                filter: Some(&tagged),
                breaker: None,
            },
        )
        .await?;

        let senders: Vec<AccountId> = legit.iter().map(SignerKey::account_id).collect();
        let mut frames = Vec::new();
        for record in &records {
            let Some(message) = decode(record)? else {
                continue;
            };
            if !senders.contains(&message.sender) {
                tracing::debug!(sender = %message.sender, "signature delivery from non-signer, skipped");
                continue;
            }
            for chunk in message.payload.chunks(SIGNATURE_FRAME) {
                match SignatureBytes::from_slice(chunk) {
                    Ok(frame) => frames.push(frame),
                    Err(_) => {
                        tracing::warn!(
                            sender = %message.sender,
                            len = chunk.len(),
                            "trailing partial signature frame, skipped"
                        );
                    }
                }
            }
        }
        Ok(frames)
    }

    /// Publish `tx`'s locally attached signatures that the mailbox does
    /// not hold yet.
    ///
    /// Returns `None` when there is nothing new to publish. When the
    /// mailbox lives on a foreign network, `user`'s identity is
    /// established there first.
    pub async fn push_signatures(
        &self,
        tx: &Transaction,
        user: &UserRef,
    ) -> Result<Option<Outcome>> {
        if tx.signatures.is_empty() {
            return Ok(None);
        }

        let (_, config) = self.source_config(tx).await?;
        let ctx = self.mailbox_context(&config)?;
        let digest = tx.digest();
        let legit = tx_signers(self.ledger(), self.home(), tx).await?;

        let on_mailbox = self
            .mailbox_signatures(&ctx, &config.mailbox, &digest, &legit)
            .await?;
        let fresh: Vec<SignatureBytes> = tx
            .signatures
            .iter()
            .map(|decorated| decorated.signature)
            .filter(|signature| !on_mailbox.contains(signature))
            .collect();
        if fresh.is_empty() {
            tracing::debug!(digest = %digest.to_hex(), "every local signature already shared");
            return Ok(None);
        }

        let sender = self.sender_on(&ctx, user).await?;
        let mut payload = Vec::with_capacity(fresh.len() * SIGNATURE_FRAME);
        for signature in &fresh {
            payload.extend_from_slice(signature.as_bytes());
        }

        let (delivery, _) = encode(
            self.ledger(),
            &ctx,
            &sender,
            &Destinations::from(config.mailbox.clone()),
            Tag::Return(digest),
            &payload,
        )
        .await?;
        let outcome = self.finish(delivery, user, &ctx).await?;
        Ok(Some(outcome))
    }

    /// Merge mailbox-shared signatures into `tx`.
    ///
    /// Only frames that verify against the digest for some legitimate
    /// signer are attached; frames already present are skipped.
    /// Idempotent against unchanged ledger state. Returns whether
    /// anything was added.
    pub async fn pull_signatures(&self, tx: &mut Transaction) -> Result<bool> {
        let (_, config) = self.source_config(tx).await?;
        let ctx = self.mailbox_context(&config)?;
        let digest = tx.digest();
        let legit = tx_signers(self.ledger(), self.home(), tx).await?;

        let frames = self
            .mailbox_signatures(&ctx, &config.mailbox, &digest, &legit)
            .await?;

        let mut added = false;
        for frame in frames {
            if tx.has_signature(&frame) {
                continue;
            }
            let signer = legit
                .iter()
                .find(|key| key.verify(digest.as_bytes(), &frame).is_ok());
            let Some(signer) = signer else {
                tracing::warn!(
                    digest = %digest.to_hex(),
                    "shared signature verifies for no legitimate signer, skipped"
                );
                continue;
            };
            tx.signatures.push(DecoratedSignature::new(signer, frame));
            added = true;
        }
        Ok(added)
    }
}
