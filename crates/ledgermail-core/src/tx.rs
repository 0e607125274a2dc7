//! The transaction model: the delivery unit the codec builds.
//!
//! A transaction carries a memo (the tag), an ordered list of operations
//! and zero or more decorated signatures. Payload travels as fixed-size
//! `manage_data` chunks under the reserved [`PAYLOAD_KEY`] name.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use crate::canonical::{decode_envelope, envelope_bytes, unsigned_tx_bytes};
use crate::crypto::{DecoratedSignature, Keypair, SignatureBytes, TxDigest};
use crate::error::CoreError;
use crate::ids::AccountId;
use crate::tag::Tag;

/// Maximum number of operations a single transaction may carry.
pub const MAX_OPERATIONS: usize = 100;

/// Size of one payload chunk in bytes.
pub const CHUNK_SIZE: usize = 64;

/// Reserved `manage_data` name marking payload-carrier operations.
pub const PAYLOAD_KEY: &str = "Send";

/// A single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create and fund a previously unfunded account.
    CreateAccount {
        destination: AccountId,
        starting_balance: u64,
    },
    /// Transfer a (possibly negligible) amount to an existing account.
    Payment {
        destination: AccountId,
        amount: u64,
    },
    /// Attach a named data entry to the operation source. An absent
    /// value clears the entry.
    ManageData {
        name: String,
        value: Option<Bytes>,
    },
}

impl Operation {
    /// Whether this operation carries a payload chunk.
    pub fn is_payload_chunk(&self) -> bool {
        matches!(self, Operation::ManageData { name, value: Some(_) } if name == PAYLOAD_KEY)
    }

    /// The payload chunk bytes, if any.
    pub fn payload_chunk(&self) -> Option<&Bytes> {
        match self {
            Operation::ManageData { name, value: Some(v) } if name == PAYLOAD_KEY => Some(v),
            _ => None,
        }
    }
}

/// A delivery unit: memo + operations + signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The account paying for and sequencing this transaction.
    pub source: AccountId,
    /// Source account sequence number this transaction consumes.
    pub sequence: u64,
    /// The tag.
    pub memo: Tag,
    /// Ordered operations, at most [`MAX_OPERATIONS`].
    pub operations: Vec<Operation>,
    /// Decorated signatures attached so far.
    pub signatures: Vec<DecoratedSignature>,
}

impl Transaction {
    /// Compute the transaction digest (signature-independent).
    pub fn digest(&self) -> TxDigest {
        TxDigest::hash(&unsigned_tx_bytes(self))
    }

    /// Sign the digest with `keypair`, appending a decorated signature.
    pub fn sign(&mut self, keypair: &Keypair) {
        let digest = self.digest();
        let signature = keypair.sign(digest.as_bytes());
        self.signatures
            .push(DecoratedSignature::new(&keypair.public_key(), signature));
    }

    /// Whether `signature` is already attached, compared byte-exactly.
    pub fn has_signature(&self, signature: &SignatureBytes) -> bool {
        self.signatures.iter().any(|s| &s.signature == signature)
    }

    /// A copy with every signature removed.
    pub fn stripped(&self) -> Transaction {
        Transaction {
            signatures: Vec::new(),
            ..self.clone()
        }
    }

    /// Canonical envelope bytes (transaction plus signatures).
    pub fn to_envelope(&self) -> Vec<u8> {
        envelope_bytes(self)
    }

    /// Envelope rendered as standard base64.
    pub fn envelope_base64(&self) -> String {
        BASE64.encode(self.to_envelope())
    }

    /// Decode a transaction from envelope bytes.
    pub fn from_envelope(bytes: &[u8]) -> Result<Self, CoreError> {
        decode_envelope(bytes)
    }

    /// Decode a transaction from a base64 envelope.
    pub fn from_envelope_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| CoreError::DecodingError(e.to_string()))?;
        decode_envelope(&bytes)
    }
}

/// Builder for transactions.
pub struct TransactionBuilder {
    source: AccountId,
    sequence: u64,
    memo: Tag,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    /// Start building a transaction for `source` consuming `sequence`.
    pub fn new(source: AccountId, sequence: u64) -> Self {
        Self {
            source,
            sequence,
            memo: Tag::None,
            operations: Vec::new(),
        }
    }

    /// Set the memo.
    pub fn memo(mut self, memo: Tag) -> Self {
        self.memo = memo;
        self
    }

    /// Append an operation.
    pub fn operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Number of operations appended so far.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Build the unsigned transaction.
    pub fn build(self) -> Transaction {
        Transaction {
            source: self.source,
            sequence: self.sequence,
            memo: self.memo,
            operations: self.operations,
            signatures: Vec::new(),
        }
    }
}
