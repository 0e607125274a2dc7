//! Canonical CBOR encoding for transactions and envelopes.
//!
//! Envelopes are encoded as CBOR (RFC 8949) with deterministic rules:
//! - Map keys: String keys, fixed canonical order
//! - Integers: Smallest valid encoding
//! - Lengths: Definite only
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break every digest and
//! every signature already published on a ledger.

use ciborium::value::Value;

use crate::crypto::{DecoratedSignature, SignatureBytes};
use crate::error::CoreError;
use crate::ids::AccountId;
use crate::tag::Tag;
use crate::tx::{Operation, Transaction};

/// Domain separation prefix for transaction digests.
pub const DIGEST_DOMAIN: &[u8] = b"ledgermail/tx-digest/v1";

/// The current envelope schema version.
pub const ENVELOPE_VERSION: u8 = 0;

/// CBOR map key names.
mod keys {
    pub const VERSION: &str = "v";
    pub const SOURCE: &str = "source";
    pub const SEQ: &str = "seq";
    pub const MEMO_TYPE: &str = "memo_type";
    pub const MEMO: &str = "memo";
    pub const OPS: &str = "ops";
    pub const SIGS: &str = "sigs";

    pub const OP_TYPE: &str = "type";
    pub const OP_DEST: &str = "dest";
    pub const OP_BALANCE: &str = "balance";
    pub const OP_AMOUNT: &str = "amount";
    pub const OP_NAME: &str = "name";
    pub const OP_VALUE: &str = "value";

    pub const SIG_HINT: &str = "hint";
    pub const SIG_BYTES: &str = "sig";
}

fn entry(key: &str, value: Value) -> (Value, Value) {
    (Value::Text(key.to_string()), value)
}

fn memo_entries(tag: &Tag, entries: &mut Vec<(Value, Value)>) {
    if tag.is_none() {
        return;
    }
    entries.push(entry(keys::MEMO_TYPE, Value::Text(tag.memo_type().into())));
    let value = match tag {
        Tag::Text(s) => Value::Text(s.clone()),
        Tag::Hash(d) | Tag::Return(d) => Value::Bytes(d.as_bytes().to_vec()),
        Tag::None => unreachable!(),
    };
    entries.push(entry(keys::MEMO, value));
}

fn op_value(op: &Operation) -> Value {
    let entries = match op {
        Operation::CreateAccount {
            destination,
            starting_balance,
        } => vec![
            entry(keys::OP_TYPE, Value::Text("create_account".into())),
            entry(keys::OP_DEST, Value::Text(destination.as_str().into())),
            entry(keys::OP_BALANCE, Value::Integer((*starting_balance).into())),
        ],
        Operation::Payment { destination, amount } => vec![
            entry(keys::OP_TYPE, Value::Text("payment".into())),
            entry(keys::OP_DEST, Value::Text(destination.as_str().into())),
            entry(keys::OP_AMOUNT, Value::Integer((*amount).into())),
        ],
        Operation::ManageData { name, value } => {
            let mut entries = vec![
                entry(keys::OP_TYPE, Value::Text("manage_data".into())),
                entry(keys::OP_NAME, Value::Text(name.clone())),
            ];
            if let Some(bytes) = value {
                entries.push(entry(keys::OP_VALUE, Value::Bytes(bytes.to_vec())));
            }
            entries
        }
    };
    Value::Map(entries)
}

fn tx_entries(tx: &Transaction) -> Vec<(Value, Value)> {
    let mut entries = vec![
        entry(keys::VERSION, Value::Integer(ENVELOPE_VERSION.into())),
        entry(keys::SOURCE, Value::Text(tx.source.as_str().into())),
        entry(keys::SEQ, Value::Integer(tx.sequence.into())),
    ];
    memo_entries(&tx.memo, &mut entries);
    entries.push(entry(
        keys::OPS,
        Value::Array(tx.operations.iter().map(op_value).collect()),
    ));
    entries
}

fn encode_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    // Value serialization into a Vec cannot fail.
    ciborium::into_writer(value, &mut buf).expect("CBOR encoding to Vec failed");
    buf
}

/// Encode the unsigned transaction to canonical CBOR bytes.
///
/// Signatures never feed this encoding, so the digest of a transaction
/// is stable across signing and signature-stripping.
pub fn unsigned_tx_bytes(tx: &Transaction) -> Vec<u8> {
    let mut bytes = DIGEST_DOMAIN.to_vec();
    bytes.extend_from_slice(&encode_value(&Value::Map(tx_entries(tx))));
    bytes
}

/// Encode the full envelope (transaction plus signatures) to canonical bytes.
pub fn envelope_bytes(tx: &Transaction) -> Vec<u8> {
    let mut entries = tx_entries(tx);
    entries.push(entry(
        keys::SIGS,
        Value::Array(
            tx.signatures
                .iter()
                .map(|sig| {
                    Value::Map(vec![
                        entry(keys::SIG_HINT, Value::Bytes(sig.hint.to_vec())),
                        entry(keys::SIG_BYTES, Value::Bytes(sig.signature.0.to_vec())),
                    ])
                })
                .collect(),
        ),
    ));
    encode_value(&Value::Map(entries))
}

/// Decode an envelope back into a transaction.
pub fn decode_envelope(bytes: &[u8]) -> Result<Transaction, CoreError> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = as_map(&value)?;

    let version = get_u64(map, keys::VERSION)?;
    if version != ENVELOPE_VERSION as u64 {
        return Err(CoreError::UnsupportedVersion(version as u8));
    }

    let source = AccountId::new(get_text(map, keys::SOURCE)?);
    let sequence = get_u64(map, keys::SEQ)?;

    let memo = match lookup(map, keys::MEMO_TYPE) {
        None => Tag::None,
        Some(v) => {
            let memo_type = text_of(v, keys::MEMO_TYPE)?;
            let memo_value =
                lookup(map, keys::MEMO).ok_or_else(|| malformed("memo value missing"))?;
            decode_memo(&memo_type, memo_value)?
        }
    };

    let ops_value = lookup(map, keys::OPS).ok_or_else(|| malformed("ops missing"))?;
    let ops = match ops_value {
        Value::Array(items) => items
            .iter()
            .map(decode_op)
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(malformed("ops is not an array")),
    };

    let signatures = match lookup(map, keys::SIGS) {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(decode_sig)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(malformed("sigs is not an array")),
    };

    Ok(Transaction {
        source,
        sequence,
        memo,
        operations: ops,
        signatures,
    })
}

fn decode_memo(memo_type: &str, value: &Value) -> Result<Tag, CoreError> {
    match (memo_type, value) {
        ("text", Value::Text(s)) => Ok(Tag::Text(s.clone())),
        ("hash", Value::Bytes(b)) => Ok(Tag::Hash(digest_of(b)?)),
        ("return", Value::Bytes(b)) => Ok(Tag::Return(digest_of(b)?)),
        ("none", _) => Ok(Tag::None),
        (other, _) => Err(CoreError::UnknownMemoType(other.to_string())),
    }
}

fn digest_of(bytes: &[u8]) -> Result<crate::crypto::TxDigest, CoreError> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| malformed("memo digest must be 32 bytes"))?;
    Ok(crate::crypto::TxDigest::from_bytes(arr))
}

fn decode_op(value: &Value) -> Result<Operation, CoreError> {
    let map = as_map(value)?;
    let op_type = get_text(map, keys::OP_TYPE)?;
    match op_type.as_str() {
        "create_account" => Ok(Operation::CreateAccount {
            destination: AccountId::new(get_text(map, keys::OP_DEST)?),
            starting_balance: get_u64(map, keys::OP_BALANCE)?,
        }),
        "payment" => Ok(Operation::Payment {
            destination: AccountId::new(get_text(map, keys::OP_DEST)?),
            amount: get_u64(map, keys::OP_AMOUNT)?,
        }),
        "manage_data" => {
            let value = match lookup(map, keys::OP_VALUE) {
                None => None,
                Some(Value::Bytes(b)) => Some(bytes::Bytes::from(b.clone())),
                Some(_) => return Err(malformed("manage_data value is not bytes")),
            };
            Ok(Operation::ManageData {
                name: get_text(map, keys::OP_NAME)?,
                value,
            })
        }
        other => Err(malformed(&format!("unknown operation type: {other}"))),
    }
}

fn decode_sig(value: &Value) -> Result<DecoratedSignature, CoreError> {
    let map = as_map(value)?;
    let hint_bytes = get_bytes(map, keys::SIG_HINT)?;
    let hint: [u8; 4] = hint_bytes
        .as_slice()
        .try_into()
        .map_err(|_| malformed("signature hint must be 4 bytes"))?;
    let sig_bytes = get_bytes(map, keys::SIG_BYTES)?;
    Ok(DecoratedSignature {
        hint,
        signature: SignatureBytes::from_slice(&sig_bytes)?,
    })
}

fn malformed(msg: &str) -> CoreError {
    CoreError::MalformedEnvelope(msg.to_string())
}

fn as_map(value: &Value) -> Result<&Vec<(Value, Value)>, CoreError> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(malformed("expected a CBOR map")),
    }
}

fn lookup<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

fn text_of(value: &Value, key: &str) -> Result<String, CoreError> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(malformed(&format!("{key} is not text"))),
    }
}

fn get_text(map: &[(Value, Value)], key: &str) -> Result<String, CoreError> {
    let value = lookup(map, key).ok_or_else(|| malformed(&format!("{key} missing")))?;
    text_of(value, key)
}

fn get_u64(map: &[(Value, Value)], key: &str) -> Result<u64, CoreError> {
    match lookup(map, key) {
        Some(Value::Integer(i)) => {
            u64::try_from(*i).map_err(|_| malformed(&format!("{key} out of range")))
        }
        Some(_) => Err(malformed(&format!("{key} is not an integer"))),
        None => Err(malformed(&format!("{key} missing"))),
    }
}

fn get_bytes(map: &[(Value, Value)], key: &str) -> Result<Vec<u8>, CoreError> {
    match lookup(map, key) {
        Some(Value::Bytes(b)) => Ok(b.clone()),
        Some(_) => Err(malformed(&format!("{key} is not bytes"))),
        None => Err(malformed(&format!("{key} missing"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, TxDigest};
    use crate::tx::TransactionBuilder;

    fn sample_tx(memo: Tag) -> Transaction {
        TransactionBuilder::new(AccountId::new("ab".repeat(32)), 7)
            .memo(memo)
            .operation(Operation::Payment {
                destination: AccountId::new("cd".repeat(32)),
                amount: 1,
            })
            .operation(Operation::ManageData {
                name: "Send".into(),
                value: Some(bytes::Bytes::from_static(b"chunk")),
            })
            .build()
    }

    #[test]
    fn test_envelope_roundtrip_unsigned() {
        for memo in [
            Tag::None,
            Tag::text("object"),
            Tag::Hash(TxDigest::hash(b"x")),
            Tag::Return(TxDigest::hash(b"y")),
        ] {
            let tx = sample_tx(memo);
            let decoded = decode_envelope(&envelope_bytes(&tx)).unwrap();
            assert_eq!(decoded, tx);
        }
    }

    #[test]
    fn test_envelope_roundtrip_signed() {
        let mut tx = sample_tx(Tag::text("signed"));
        let keypair = Keypair::from_seed(&[9u8; 32]);
        tx.sign(&keypair);
        let decoded = decode_envelope(&envelope_bytes(&tx)).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.signatures.len(), 1);
    }

    #[test]
    fn test_digest_ignores_signatures() {
        let mut tx = sample_tx(Tag::text("digest"));
        let before = tx.digest();
        tx.sign(&Keypair::generate());
        assert_eq!(tx.digest(), before);
    }

    #[test]
    fn test_unsigned_bytes_are_domain_separated() {
        let tx = sample_tx(Tag::None);
        assert!(unsigned_tx_bytes(&tx).starts_with(DIGEST_DOMAIN));
    }

    #[test]
    fn test_garbage_envelope_rejected() {
        assert!(decode_envelope(b"not cbor at all").is_err());
        // A valid CBOR value of the wrong shape is rejected too.
        let scalar = encode_value(&Value::Integer(5.into()));
        assert!(decode_envelope(&scalar).is_err());
    }
}
