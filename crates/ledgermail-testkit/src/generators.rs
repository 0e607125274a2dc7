//! Proptest strategies for codec inputs.

use proptest::prelude::*;

use ledgermail_core::{Tag, TxDigest};

/// Payloads of `0..=max` arbitrary bytes.
pub fn payload(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max)
}

/// Text tags within the memo limit.
pub fn text_tag() -> impl Strategy<Value = Tag> {
    // Char count caps byte length at 4x; Tag::text truncates anyway.
    prop::string::string_regex(".{0,28}")
        .expect("valid regex")
        .prop_map(|s| Tag::text(&s))
}

/// Any tag variant.
pub fn tag() -> impl Strategy<Value = Tag> {
    prop_oneof![
        Just(Tag::None),
        text_tag(),
        any::<[u8; 32]>().prop_map(|bytes| Tag::Hash(TxDigest::from_bytes(bytes))),
        any::<[u8; 32]>().prop_map(|bytes| Tag::Return(TxDigest::from_bytes(bytes))),
    ]
}

/// Text inputs that exceed the memo limit and must truncate.
pub fn oversized_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(".{29,64}").expect("valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_core::MEMO_TEXT_MAX;

    proptest! {
        #[test]
        fn test_text_tags_respect_memo_limit(tag in text_tag()) {
            if let Tag::Text(s) = tag {
                prop_assert!(s.len() <= MEMO_TEXT_MAX);
            }
        }

        #[test]
        fn test_oversized_text_truncates(s in oversized_text()) {
            if let Tag::Text(out) = Tag::text(&s) {
                prop_assert!(out.len() <= MEMO_TEXT_MAX);
                prop_assert!(s.starts_with(&out));
            }
        }
    }
}
