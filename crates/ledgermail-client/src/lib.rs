//! # Ledgermail Client
//!
//! The capability layer between the mailbox protocol and a remote ledger:
//!
//! - [`Ledger`] / [`Federation`] - async traits the excluded wire client
//!   implements
//! - [`NetworkContext`] - explicit network/endpoint selection, passed by
//!   reference through every call (no process-wide state)
//! - [`Resolver`] - federated address resolution with a coalescing TTL cache
//! - [`scan`] - the paginated enumerator driving record fetches under
//!   limit/filter/breaker policies
//! - [`memory`] - an in-memory multi-network ledger for tests

pub mod error;
pub mod ledger;
pub mod memory;
pub mod network;
pub mod resolver;
pub mod scan;

pub use error::{ClientError, Result};
pub use memory::{MemoryFederation, MemoryLedger};

pub use ledger::{
    Account, AccountSigner, Federation, FederatedAccount, Ledger, Page, SubmitResponse,
    TransactionRecord,
};
pub use network::{Network, NetworkContext, PUBLIC_ENDPOINT, TEST_ENDPOINT};
pub use resolver::{signers_union, tx_signers, tx_sources, Resolver, DEFAULT_CACHE_TTL};
pub use scan::{scan, LedgerTransactions, PageSource, ScanOptions, ScanPredicate, MAX_PAGE_SIZE};
