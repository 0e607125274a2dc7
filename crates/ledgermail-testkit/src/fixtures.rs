//! Scenario fixtures over the in-memory ledger.

use std::sync::Arc;

use ledgermail_client::{
    Account, ClientError, Ledger, MemoryFederation, MemoryLedger, NetworkContext,
};
use ledgermail_core::{AccountId, Keypair, Operation, SignerKey, Tag, Transaction, TransactionBuilder};
use ledgermail_messenger::{send, Destinations};

/// An in-memory ledger plus the test-network context, pre-wired for
/// protocol scenarios.
pub struct Fixture {
    pub ledger: Arc<MemoryLedger>,
    pub federation: Arc<MemoryFederation>,
    pub ctx: NetworkContext,
}

impl Fixture {
    /// A fresh fixture on the test network.
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            federation: Arc::new(MemoryFederation::new()),
            ctx: NetworkContext::test(),
        }
    }

    /// Generate a keypair and fund its account.
    pub fn funded_keypair(&self) -> Keypair {
        let keypair = Keypair::generate();
        self.ledger.create_account(&self.ctx, &keypair.account_id());
        keypair
    }

    /// Deterministic variant of [`Fixture::funded_keypair`].
    pub fn funded_keypair_from_seed(&self, seed: u8) -> Keypair {
        let keypair = Keypair::from_seed(&[seed; 32]);
        self.ledger.create_account(&self.ctx, &keypair.account_id());
        keypair
    }

    /// Add `key` as a weight-1 co-signer of `account`.
    pub fn add_cosigner(&self, account: &AccountId, key: SignerKey) {
        self.ledger.add_signer(&self.ctx, account, key, 1);
    }

    /// Register a federated alias for `id`.
    pub fn register_alias(&self, alias: &str, id: AccountId) {
        self.federation.register(alias, id.clone());
    }

    /// Load an account, panicking on absence (fixtures own their setup).
    pub async fn account(&self, id: &AccountId) -> Account {
        self.ledger
            .load_account(id, &self.ctx)
            .await
            .unwrap_or_else(|e: ClientError| panic!("fixture account {id} missing: {e}"))
    }

    /// An unsigned single-payment transaction consuming `source`'s next
    /// sequence number.
    pub async fn payment_tx(&self, source: &AccountId, destination: &AccountId) -> Transaction {
        let account = self.account(source).await;
        TransactionBuilder::new(source.clone(), account.sequence + 1)
            .memo(Tag::text("payment"))
            .operation(Operation::Payment {
                destination: destination.clone(),
                amount: 100,
            })
            .build()
    }

    /// Deliver `payload` from `from` to `mailbox` through the messenger.
    pub async fn deliver(&self, from: &Keypair, mailbox: &AccountId, tag: Tag, payload: &[u8]) {
        send(
            self.ledger.as_ref(),
            &self.ctx,
            from,
            &Destinations::from(mailbox.clone()),
            tag,
            payload,
        )
        .await
        .expect("fixture delivery must succeed");
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
