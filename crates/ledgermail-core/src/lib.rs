//! # Ledgermail Core
//!
//! Pure primitives for ledgermail: account identifiers, tags, the
//! transaction model, and canonical encoding.
//!
//! This crate contains no I/O and no networking. It is pure computation
//! over the data structures the mailbox protocol exchanges on-ledger.
//!
//! ## Key Types
//!
//! - [`AccountId`] - Opaque identifier of a ledger account
//! - [`Tag`] - The memo attached to a delivery (text, hash, or return-hash)
//! - [`Transaction`] - The delivery unit: memo + operations + signatures
//! - [`TxDigest`] - Content digest of the unsigned transaction (Blake3)
//!
//! ## Canonicalization
//!
//! Envelopes and digests use deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod ids;
pub mod tag;
pub mod tx;

pub use canonical::{decode_envelope, envelope_bytes, unsigned_tx_bytes};
pub use crypto::{DecoratedSignature, Keypair, SignatureBytes, SignerKey, TxDigest};
pub use error::CoreError;
pub use ids::AccountId;
pub use tag::{Tag, MEMO_TEXT_MAX};
pub use tx::{Operation, Transaction, TransactionBuilder, CHUNK_SIZE, MAX_OPERATIONS, PAYLOAD_KEY};
