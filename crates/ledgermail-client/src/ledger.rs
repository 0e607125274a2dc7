//! Ledger and federation capability traits.
//!
//! These are the seams to the excluded wire layer: a REST client against
//! the ledger's read/write API implements [`Ledger`], a federation
//! directory implements [`Federation`]. The protocol crates consume the
//! traits only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ledgermail_core::{AccountId, SignerKey, Transaction};

use crate::error::Result;
use crate::network::NetworkContext;

/// A transaction as returned by the ledger's history API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction digest, lowercase hex.
    pub hash: String,
    /// The account that sourced the transaction.
    pub source_account: AccountId,
    /// Memo discriminator: `none`, `text`, `hash` or `return`.
    pub memo_type: String,
    /// Memo value: text verbatim, binary memos as standard base64.
    pub memo: String,
    /// Envelope bytes, standard base64.
    pub envelope: String,
    /// The ledger sequence this transaction was recorded in.
    pub ledger_sequence: u64,
    /// Close time of the recording ledger.
    pub created_at: String,
    /// Number of operations carried.
    pub operation_count: u32,
}

/// An account's entry in another account's signer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSigner {
    pub key: SignerKey,
    pub weight: u8,
}

/// A loaded account: identifier, sequence, attributes and signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Last consumed sequence number.
    pub sequence: u64,
    /// Key/value attributes attached to the account.
    pub config_attrs: BTreeMap<String, Vec<u8>>,
    /// The signer keys legitimate for this account.
    pub signers: Vec<AccountSigner>,
}

impl Account {
    /// The attribute value under `key`, if set.
    pub fn attr(&self, key: &str) -> Option<&[u8]> {
        self.config_attrs.get(key).map(Vec::as_slice)
    }

    /// The signer keys only, in listed order.
    pub fn signer_keys(&self) -> Vec<SignerKey> {
        self.signers.iter().map(|s| s.key).collect()
    }
}

/// One page of a paged query.
#[derive(Debug, Clone)]
pub struct Page<R> {
    /// Records in this page, in query order.
    pub records: Vec<R>,
    /// Cursor for the next page, if the stream may continue.
    pub next_cursor: Option<String>,
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Digest of the accepted transaction, lowercase hex.
    pub hash: String,
    /// The ledger sequence it was recorded in.
    pub ledger: u64,
}

/// The outcome of a federation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedAccount {
    pub account_id: AccountId,
    pub memo: Option<String>,
    pub alias: Option<String>,
}

/// Read/write access to a ledger network.
///
/// Every call names its network explicitly; implementations route to the
/// context's endpoint.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Load an account. Fails with `AccountNotFound` for unfunded accounts.
    async fn load_account(&self, id: &AccountId, ctx: &NetworkContext) -> Result<Account>;

    /// Whether the account exists (has been funded).
    async fn account_exists(&self, id: &AccountId, ctx: &NetworkContext) -> Result<bool>;

    /// One page of transactions affecting `id`, most recent first.
    async fn transactions_page(
        &self,
        id: &AccountId,
        cursor: Option<String>,
        limit: usize,
        ctx: &NetworkContext,
    ) -> Result<Page<TransactionRecord>>;

    /// Look up a single transaction record by digest hex.
    async fn transaction_by_hash(
        &self,
        hash: &str,
        ctx: &NetworkContext,
    ) -> Result<Option<TransactionRecord>>;

    /// Submit a signed transaction. Fails with `Submission` carrying the
    /// remote diagnostic.
    async fn submit(&self, tx: &Transaction, ctx: &NetworkContext) -> Result<SubmitResponse>;

    /// Create a zero-history account on permissive test networks.
    /// Fails with `UnsupportedNetwork` elsewhere. Funding an already
    /// existing account is a no-op.
    async fn ensure_funded(&self, id: &AccountId, ctx: &NetworkContext) -> Result<()>;
}

/// Federated address directory.
#[async_trait]
pub trait Federation: Send + Sync {
    /// Resolve a federated alias. Fails with `Resolution`.
    async fn resolve(&self, address: &str) -> Result<FederatedAccount>;
}
