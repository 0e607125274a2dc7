//! The mailbox codec: payloads in and out of ledger transactions.
//!
//! A delivery is one transaction: its memo carries the tag, one "touch"
//! operation per destination makes the transaction show up in each
//! destination's history, and the payload rides as consecutive 64-byte
//! `manage_data` chunks under the reserved `Send` name. The operation
//! ceiling bounds the payload; whatever does not fit is dropped and
//! reported, never an error.

use bytes::{Bytes, BytesMut};

use ledgermail_client::{Account, Ledger, NetworkContext, TransactionRecord};
use ledgermail_core::{
    AccountId, Operation, Tag, Transaction, TransactionBuilder, CHUNK_SIZE, MAX_OPERATIONS,
};

use crate::error::{MessengerError, Result};

/// Amount of the touch payment to an already funded destination.
pub const TOUCH_AMOUNT: u64 = 1;

/// Starting balance when a delivery must create its destination.
pub const MIN_STARTING_BALANCE: u64 = 10_000_000;

/// Payload capacity of a delivery with `destination_count` destinations.
///
/// The memo occupies no operation slot; every slot not spent on a touch
/// operation holds one chunk.
pub const fn max_message_bytes(destination_count: usize) -> usize {
    (MAX_OPERATIONS - destination_count) * CHUNK_SIZE
}

/// A non-empty ordered destination list.
#[derive(Debug, Clone)]
pub struct Destinations(Vec<AccountId>);

impl Destinations {
    /// Wrap a list of destinations. Empty lists are rejected, and so are
    /// lists whose touch operations alone would overflow the operation
    /// ceiling.
    pub fn new(ids: Vec<AccountId>) -> Result<Self> {
        if ids.is_empty() {
            return Err(MessengerError::EmptyDestinations);
        }
        if ids.len() > MAX_OPERATIONS {
            return Err(MessengerError::TooManyDestinations(ids.len()));
        }
        Ok(Self(ids))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<AccountId> for Destinations {
    fn from(id: AccountId) -> Self {
        Self(vec![id])
    }
}

/// Report of payload bytes that did not fit in the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Bytes carried by the delivery.
    pub sent: usize,
    /// Bytes dropped off the end.
    pub dropped: usize,
}

/// A decoded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxMessage {
    /// The account that sourced the delivery.
    pub sender: AccountId,
    /// Rendered tag: text verbatim, binary tags lowercase hex.
    pub tag: String,
    /// Close time of the recording ledger.
    pub timestamp: String,
    /// Reassembled payload.
    pub payload: Bytes,
}

/// Build the unsigned delivery transaction for `payload`.
///
/// One touch operation per destination: a negligible payment when the
/// account exists, a create-and-fund otherwise. Payload chunks fill the
/// remaining operation slots; leftover bytes come back as a
/// [`Truncation`] alongside the transaction.
pub async fn encode(
    ledger: &dyn Ledger,
    ctx: &NetworkContext,
    sender: &Account,
    destinations: &Destinations,
    tag: Tag,
    payload: &[u8],
) -> Result<(Transaction, Option<Truncation>)> {
    let mut builder = TransactionBuilder::new(sender.id.clone(), sender.sequence + 1).memo(tag);

    for destination in destinations.iter() {
        let op = if ledger.account_exists(destination, ctx).await? {
            Operation::Payment {
                destination: destination.clone(),
                amount: TOUCH_AMOUNT,
            }
        } else {
            Operation::CreateAccount {
                destination: destination.clone(),
                starting_balance: MIN_STARTING_BALANCE,
            }
        };
        builder = builder.operation(op);
    }

    let mut sent = 0;
    for chunk in payload.chunks(CHUNK_SIZE) {
        if builder.operation_count() == MAX_OPERATIONS {
            break;
        }
        builder = builder.operation(Operation::ManageData {
            name: ledgermail_core::PAYLOAD_KEY.into(),
            value: Some(Bytes::copy_from_slice(chunk)),
        });
        sent += chunk.len();
    }

    let truncation = if sent < payload.len() {
        let truncation = Truncation {
            sent,
            dropped: payload.len() - sent,
        };
        tracing::warn!(
            sent = truncation.sent,
            dropped = truncation.dropped,
            destinations = destinations.len(),
            "payload exceeds delivery capacity, tail dropped"
        );
        Some(truncation)
    } else {
        None
    };

    Ok((builder.build(), truncation))
}

/// Decode one history record back into a message.
///
/// A record with fewer than two operations is a bare touch and carries
/// no payload (`None`). A malformed envelope is an error, not `None`.
pub fn decode(record: &TransactionRecord) -> Result<Option<MailboxMessage>> {
    if record.operation_count < 2 {
        return Ok(None);
    }
    let tx = Transaction::from_envelope_base64(&record.envelope)?;

    let mut payload = BytesMut::new();
    for op in &tx.operations {
        if let Some(chunk) = op.payload_chunk() {
            payload.extend_from_slice(chunk);
        }
    }

    let tag = Tag::from_wire(&record.memo_type, &record.memo)?;
    Ok(Some(MailboxMessage {
        sender: record.source_account.clone(),
        tag: tag.render(),
        timestamp: record.created_at.clone(),
        payload: payload.freeze(),
    }))
}
