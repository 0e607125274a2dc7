//! Canonicalization vectors.
//!
//! Fixed transaction shapes exercised by determinism tests: two builds
//! of the same vector must agree byte-for-byte on envelope and digest,
//! and every envelope must survive a decode round-trip. The set covers
//! each memo variant and the operation shapes the codec emits.

use bytes::Bytes;
use ledgermail_core::{
    AccountId, Keypair, Operation, Tag, Transaction, TransactionBuilder, TxDigest, PAYLOAD_KEY,
};

/// One fixed transaction shape.
pub struct GoldenVector {
    pub name: &'static str,
    /// Seed byte for the source keypair.
    pub source_seed: u8,
    pub sequence: u64,
    /// `None`, or a text memo; digest memos are covered separately.
    pub memo: Option<&'static str>,
    /// Payload chunk contents.
    pub chunks: &'static [&'static [u8]],
    /// Whether the vector carries a touch payment first.
    pub touch: bool,
}

/// Every vector in the set.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "bare-touch",
            source_seed: 1,
            sequence: 1,
            memo: None,
            chunks: &[],
            touch: true,
        },
        GoldenVector {
            name: "text-memo-single-chunk",
            source_seed: 2,
            sequence: 7,
            memo: Some("object name"),
            chunks: &[b"hello mailbox"],
            touch: true,
        },
        GoldenVector {
            name: "max-length-memo",
            source_seed: 3,
            sequence: 42,
            memo: Some("abcdefghijklmnopqrstuvwxyz12"),
            chunks: &[&[0u8; 64], &[0xff; 64], b"tail"],
            touch: true,
        },
        GoldenVector {
            name: "no-touch-data-only",
            source_seed: 4,
            sequence: u64::MAX / 2,
            memo: None,
            chunks: &[b"x"],
            touch: false,
        },
    ]
}

/// Build the transaction a vector describes.
pub fn transaction_from_vector(vector: &GoldenVector) -> Transaction {
    let source = Keypair::from_seed(&[vector.source_seed; 32]).account_id();
    let destination = AccountId::new("cd".repeat(32));

    let memo = match vector.memo {
        Some(text) => Tag::text(text),
        None => Tag::None,
    };
    let mut builder = TransactionBuilder::new(source, vector.sequence).memo(memo);
    if vector.touch {
        builder = builder.operation(Operation::Payment {
            destination,
            amount: 1,
        });
    }
    for chunk in vector.chunks {
        builder = builder.operation(Operation::ManageData {
            name: PAYLOAD_KEY.into(),
            value: Some(Bytes::copy_from_slice(chunk)),
        });
    }
    builder.build()
}

/// A digest-tagged variant of the vector, for the sharing tags.
pub fn digest_tagged_from_vector(vector: &GoldenVector, digest: TxDigest) -> Transaction {
    let mut tx = transaction_from_vector(vector);
    tx.memo = Tag::Return(digest);
    tx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let a = transaction_from_vector(&vector);
            let b = transaction_from_vector(&vector);
            assert_eq!(a.to_envelope(), b.to_envelope(), "{}", vector.name);
            assert_eq!(a.digest(), b.digest(), "{}", vector.name);
        }
    }

    #[test]
    fn test_vectors_roundtrip() {
        for vector in all_vectors() {
            let tx = transaction_from_vector(&vector);
            let back = Transaction::from_envelope(&tx.to_envelope()).unwrap();
            assert_eq!(back, tx, "{}", vector.name);
        }
    }

    #[test]
    fn test_vectors_have_distinct_digests() {
        let digests: Vec<_> = all_vectors()
            .iter()
            .map(|v| transaction_from_vector(v).digest())
            .collect();
        for (i, a) in digests.iter().enumerate() {
            for b in &digests[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_digest_tagged_variant_changes_digest() {
        let vectors = all_vectors();
        let base = transaction_from_vector(&vectors[1]);
        let tagged = digest_tagged_from_vector(&vectors[1], base.digest());
        assert_ne!(tagged.digest(), base.digest());
    }
}
