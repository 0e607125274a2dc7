//! # Ledgermail Messenger
//!
//! Mailbox codec on top of the ledger capability layer: payloads are
//! split into 64-byte data-chunk operations, addressed by touch
//! operations, tagged through the memo, and reassembled from history
//! records on the way back.
//!
//! - [`encode`] / [`decode`] - the codec itself, pure aside from the
//!   existence probe per destination
//! - [`send`] - encode, sign, submit
//! - [`list`] / [`list_raw`] / [`find`] / [`read`] - retrieval

pub mod codec;
pub mod error;
pub mod mailbox;

pub use codec::{
    decode, encode, max_message_bytes, Destinations, MailboxMessage, Truncation,
    MIN_STARTING_BALANCE, TOUCH_AMOUNT,
};
pub use error::{MessengerError, Result};
pub use mailbox::{find, list, list_raw, read, send, ListOptions};
