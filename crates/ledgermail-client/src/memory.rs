//! In-memory implementations of the capability traits.
//!
//! Primarily for testing. The ledger keeps one independent account and
//! history table per network, applies submitted transactions with the
//! semantics the protocol relies on (sequence bump, account creation,
//! data attributes, per-affected-account history), and enforces that a
//! submission carries at least one valid source signature.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use ledgermail_core::{AccountId, Operation, SignerKey, Transaction};

use crate::error::{ClientError, Result};
use crate::ledger::{
    Account, AccountSigner, Federation, FederatedAccount, Ledger, Page, SubmitResponse,
    TransactionRecord,
};
use crate::network::{Network, NetworkContext};

/// In-memory multi-network ledger.
pub struct MemoryLedger {
    inner: RwLock<HashMap<String, NetworkState>>,
}

#[derive(Default)]
struct NetworkState {
    accounts: HashMap<AccountId, Account>,
    /// Per-account history, most recent first.
    history: HashMap<AccountId, Vec<TransactionRecord>>,
    by_hash: HashMap<String, TransactionRecord>,
    height: u64,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create and fund an account out-of-band (test setup).
    pub fn create_account(&self, ctx: &NetworkContext, id: &AccountId) {
        let mut inner = self.inner.write().unwrap();
        let state = inner.entry(ctx.network().id().to_string()).or_default();
        state
            .accounts
            .entry(id.clone())
            .or_insert_with(|| new_account(id));
    }

    /// Append a signer to an existing account (test setup).
    pub fn add_signer(&self, ctx: &NetworkContext, id: &AccountId, key: SignerKey, weight: u8) {
        let mut inner = self.inner.write().unwrap();
        let state = inner.entry(ctx.network().id().to_string()).or_default();
        if let Some(account) = state.accounts.get_mut(id) {
            if !account.signers.iter().any(|s| s.key == key) {
                account.signers.push(AccountSigner { key, weight });
            }
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn new_account(id: &AccountId) -> Account {
    // Canonical identifiers carry their master key; it starts as the
    // account's only signer.
    let signers = match SignerKey::from_hex(id.as_str()) {
        Ok(key) => vec![AccountSigner { key, weight: 1 }],
        Err(_) => Vec::new(),
    };
    Account {
        id: id.clone(),
        sequence: 0,
        config_attrs: Default::default(),
        signers,
    }
}

fn now_secs() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
        .to_string()
}

fn submission(diagnostic: &str) -> ClientError {
    ClientError::Submission {
        diagnostic: diagnostic.to_string(),
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn load_account(&self, id: &AccountId, ctx: &NetworkContext) -> Result<Account> {
        let inner = self.inner.read().unwrap();
        inner
            .get(ctx.network().id())
            .and_then(|state| state.accounts.get(id))
            .cloned()
            .ok_or_else(|| ClientError::AccountNotFound(id.clone()))
    }

    async fn account_exists(&self, id: &AccountId, ctx: &NetworkContext) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .get(ctx.network().id())
            .is_some_and(|state| state.accounts.contains_key(id)))
    }

    async fn transactions_page(
        &self,
        id: &AccountId,
        cursor: Option<String>,
        limit: usize,
        ctx: &NetworkContext,
    ) -> Result<Page<TransactionRecord>> {
        let inner = self.inner.read().unwrap();
        let history = inner
            .get(ctx.network().id())
            .and_then(|state| state.history.get(id));
        let Some(history) = history else {
            return Ok(Page {
                records: Vec::new(),
                next_cursor: None,
            });
        };

        let start: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| ClientError::Transport(format!("bad cursor: {c}")))?,
            None => 0,
        };
        let end = (start + limit).min(history.len());
        let records = history[start.min(history.len())..end].to_vec();
        let next_cursor = (end < history.len()).then(|| end.to_string());
        Ok(Page {
            records,
            next_cursor,
        })
    }

    async fn transaction_by_hash(
        &self,
        hash: &str,
        ctx: &NetworkContext,
    ) -> Result<Option<TransactionRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .get(ctx.network().id())
            .and_then(|state| state.by_hash.get(hash))
            .cloned())
    }

    async fn submit(&self, tx: &Transaction, ctx: &NetworkContext) -> Result<SubmitResponse> {
        let mut inner = self.inner.write().unwrap();
        let state = inner.entry(ctx.network().id().to_string()).or_default();

        let digest = tx.digest();
        let source = state
            .accounts
            .get(&tx.source)
            .ok_or_else(|| submission("source account not found"))?;

        // At least one attached signature must verify against a source
        // signer.
        let authorized = tx.signatures.iter().any(|sig| {
            source
                .signers
                .iter()
                .any(|s| s.key.verify(digest.as_bytes(), &sig.signature).is_ok())
        });
        if !authorized {
            return Err(submission("bad auth: no valid source signature"));
        }
        if tx.sequence <= source.sequence {
            return Err(submission("bad sequence"));
        }

        // Apply.
        let mut affected = vec![tx.source.clone()];
        for op in &tx.operations {
            match op {
                Operation::CreateAccount { destination, .. } => {
                    if state.accounts.contains_key(destination) {
                        return Err(submission("account already exists"));
                    }
                    state
                        .accounts
                        .insert(destination.clone(), new_account(destination));
                    affected.push(destination.clone());
                }
                Operation::Payment { destination, .. } => {
                    if !state.accounts.contains_key(destination) {
                        return Err(submission("payment destination does not exist"));
                    }
                    affected.push(destination.clone());
                }
                Operation::ManageData { name, value } => {
                    let account = state
                        .accounts
                        .get_mut(&tx.source)
                        .expect("source account checked above");
                    match value {
                        Some(bytes) if !bytes.is_empty() => {
                            account
                                .config_attrs
                                .insert(name.clone(), bytes.to_vec());
                        }
                        // An absent or empty value clears the entry.
                        _ => {
                            account.config_attrs.remove(name);
                        }
                    }
                }
            }
        }
        state
            .accounts
            .get_mut(&tx.source)
            .expect("source account checked above")
            .sequence = tx.sequence;

        state.height += 1;
        let record = TransactionRecord {
            hash: digest.to_hex(),
            source_account: tx.source.clone(),
            memo_type: tx.memo.memo_type().to_string(),
            memo: tx.memo.memo_value(),
            envelope: tx.envelope_base64(),
            ledger_sequence: state.height,
            created_at: now_secs(),
            operation_count: tx.operations.len() as u32,
        };

        let mut seen = Vec::new();
        affected.retain(|id| {
            let fresh = !seen.contains(id);
            seen.push(id.clone());
            fresh
        });
        for account in affected {
            state
                .history
                .entry(account)
                .or_default()
                .insert(0, record.clone());
        }
        state.by_hash.insert(record.hash.clone(), record.clone());

        Ok(SubmitResponse {
            hash: record.hash,
            ledger: state.height,
        })
    }

    async fn ensure_funded(&self, id: &AccountId, ctx: &NetworkContext) -> Result<()> {
        if ctx.network() != &Network::Test {
            return Err(ClientError::UnsupportedNetwork(
                ctx.network().id().to_string(),
            ));
        }
        let mut inner = self.inner.write().unwrap();
        let state = inner.entry(ctx.network().id().to_string()).or_default();
        state
            .accounts
            .entry(id.clone())
            .or_insert_with(|| new_account(id));
        Ok(())
    }
}

/// In-memory federation directory.
pub struct MemoryFederation {
    entries: RwLock<HashMap<String, AccountId>>,
}

impl MemoryFederation {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register an alias.
    pub fn register(&self, alias: &str, id: AccountId) {
        self.entries
            .write()
            .unwrap()
            .insert(alias.to_string(), id);
    }
}

impl Default for MemoryFederation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Federation for MemoryFederation {
    async fn resolve(&self, address: &str) -> Result<FederatedAccount> {
        let entries = self.entries.read().unwrap();
        match entries.get(address) {
            Some(id) => Ok(FederatedAccount {
                account_id: id.clone(),
                memo: None,
                alias: Some(address.to_string()),
            }),
            None => Err(ClientError::Resolution(address.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_core::{Keypair, Tag, TransactionBuilder};

    fn funded(ledger: &MemoryLedger, ctx: &NetworkContext) -> Keypair {
        let keypair = Keypair::generate();
        ledger.create_account(ctx, &keypair.account_id());
        keypair
    }

    fn signed_tx(keypair: &Keypair, sequence: u64, ops: Vec<Operation>) -> Transaction {
        let mut builder = TransactionBuilder::new(keypair.account_id(), sequence)
            .memo(Tag::text("test"));
        for op in ops {
            builder = builder.operation(op);
        }
        let mut tx = builder.build();
        tx.sign(keypair);
        tx
    }

    #[tokio::test]
    async fn test_submit_requires_valid_signature() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let keypair = funded(&ledger, &ctx);

        let mut tx = TransactionBuilder::new(keypair.account_id(), 1).build();
        let err = ledger.submit(&tx, &ctx).await.unwrap_err();
        assert!(matches!(err, ClientError::Submission { .. }));

        tx.sign(&keypair);
        assert!(ledger.submit(&tx, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_manage_data_sets_and_clears_attrs() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let keypair = funded(&ledger, &ctx);
        let id = keypair.account_id();

        let set = signed_tx(
            &keypair,
            1,
            vec![Operation::ManageData {
                name: "config:multisig".into(),
                value: Some(bytes::Bytes::from_static(b"mailbox")),
            }],
        );
        ledger.submit(&set, &ctx).await.unwrap();
        let account = ledger.load_account(&id, &ctx).await.unwrap();
        assert_eq!(account.attr("config:multisig"), Some(b"mailbox".as_ref()));

        let clear = signed_tx(
            &keypair,
            2,
            vec![Operation::ManageData {
                name: "config:multisig".into(),
                value: None,
            }],
        );
        ledger.submit(&clear, &ctx).await.unwrap();
        let account = ledger.load_account(&id, &ctx).await.unwrap();
        assert_eq!(account.attr("config:multisig"), None);
    }

    #[tokio::test]
    async fn test_history_indexes_destinations_most_recent_first() {
        let ledger = MemoryLedger::new();
        let ctx = NetworkContext::test();
        let sender = funded(&ledger, &ctx);
        let mailbox = funded(&ledger, &ctx).account_id();

        for seq in 1..=3u64 {
            let tx = signed_tx(
                &sender,
                seq,
                vec![Operation::Payment {
                    destination: mailbox.clone(),
                    amount: 1,
                }],
            );
            ledger.submit(&tx, &ctx).await.unwrap();
        }

        let page = ledger
            .transactions_page(&mailbox, None, 10, &ctx)
            .await
            .unwrap();
        assert_eq!(page.records.len(), 3);
        assert!(page.records[0].ledger_sequence > page.records[2].ledger_sequence);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_networks_are_independent() {
        let ledger = MemoryLedger::new();
        let test = NetworkContext::test();
        let public = NetworkContext::public();
        let keypair = funded(&ledger, &test);

        assert!(ledger
            .account_exists(&keypair.account_id(), &test)
            .await
            .unwrap());
        assert!(!ledger
            .account_exists(&keypair.account_id(), &public)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_ensure_funded_only_on_test_network() {
        let ledger = MemoryLedger::new();
        let id = Keypair::generate().account_id();

        ledger
            .ensure_funded(&id, &NetworkContext::test())
            .await
            .unwrap();
        assert!(ledger
            .account_exists(&id, &NetworkContext::test())
            .await
            .unwrap());

        let err = ledger
            .ensure_funded(&id, &NetworkContext::public())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedNetwork(_)));
    }
}
