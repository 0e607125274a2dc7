//! Delivery tags: the memo attached to a mailbox transaction.
//!
//! A tag is either a short text (at most 28 bytes of UTF-8), an opaque
//! 32-byte hash or return-hash value, or nothing. The sharing protocol
//! uses `Hash` to mark pending-transaction deliveries and `Return` to
//! mark signature deliveries for a given transaction digest.

use crate::crypto::TxDigest;
use crate::error::CoreError;

/// Maximum byte length of a text tag.
pub const MEMO_TEXT_MAX: usize = 28;

/// The memo attached to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// No memo.
    None,
    /// Short UTF-8 text, at most [`MEMO_TEXT_MAX`] bytes.
    Text(String),
    /// Opaque 32-byte hash value.
    Hash(TxDigest),
    /// Opaque 32-byte return-hash value.
    Return(TxDigest),
}

impl Tag {
    /// Build a text tag, hard-truncating to [`MEMO_TEXT_MAX`] bytes.
    ///
    /// Truncation backs off to the previous char boundary so the result
    /// stays valid UTF-8.
    pub fn text(s: &str) -> Self {
        if s.len() <= MEMO_TEXT_MAX {
            return Tag::Text(s.to_string());
        }
        let mut cut = MEMO_TEXT_MAX;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        Tag::Text(s[..cut].to_string())
    }

    /// The wire discriminator: `none`, `text`, `hash` or `return`.
    pub fn memo_type(&self) -> &'static str {
        match self {
            Tag::None => "none",
            Tag::Text(_) => "text",
            Tag::Hash(_) => "hash",
            Tag::Return(_) => "return",
        }
    }

    /// The wire value: text verbatim, binary tags as standard base64.
    pub fn memo_value(&self) -> String {
        match self {
            Tag::None => String::new(),
            Tag::Text(s) => s.clone(),
            Tag::Hash(d) | Tag::Return(d) => d.to_base64(),
        }
    }

    /// The decoded rendering: text verbatim, binary tags as lowercase hex.
    pub fn render(&self) -> String {
        match self {
            Tag::None => String::new(),
            Tag::Text(s) => s.clone(),
            Tag::Hash(d) | Tag::Return(d) => d.to_hex(),
        }
    }

    /// Rebuild a tag from its wire form.
    pub fn from_wire(memo_type: &str, memo: &str) -> Result<Self, CoreError> {
        match memo_type {
            "none" => Ok(Tag::None),
            "text" => Ok(Tag::Text(memo.to_string())),
            "hash" => Ok(Tag::Hash(TxDigest::from_base64(memo)?)),
            "return" => Ok(Tag::Return(TxDigest::from_base64(memo)?)),
            other => Err(CoreError::UnknownMemoType(other.to_string())),
        }
    }

    /// Whether this tag carries no memo.
    pub fn is_none(&self) -> bool {
        matches!(self, Tag::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_within_limit_kept() {
        let tag = Tag::text("hello");
        assert_eq!(tag, Tag::Text("hello".to_string()));
    }

    #[test]
    fn test_text_truncated_to_28_bytes() {
        let long = "a".repeat(40);
        if let Tag::Text(s) = Tag::text(&long) {
            assert_eq!(s.len(), MEMO_TEXT_MAX);
        } else {
            panic!("expected text tag");
        }
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 'é' is 2 bytes; 15 of them is 30 bytes, cutting at 28 lands
        // mid-char and must back off to 28 or less.
        let s = "é".repeat(15);
        if let Tag::Text(out) = Tag::text(&s) {
            assert!(out.len() <= MEMO_TEXT_MAX);
            assert!(out.is_char_boundary(out.len()));
            assert_eq!(out, "é".repeat(14));
        } else {
            panic!("expected text tag");
        }
    }

    #[test]
    fn test_wire_roundtrip() {
        let digest = TxDigest::hash(b"tx");
        for tag in [
            Tag::None,
            Tag::text("object"),
            Tag::Hash(digest),
            Tag::Return(digest),
        ] {
            let back = Tag::from_wire(tag.memo_type(), &tag.memo_value()).unwrap();
            assert_eq!(back, tag);
        }
    }

    #[test]
    fn test_binary_renders_as_hex() {
        let digest = TxDigest::hash(b"tx");
        assert_eq!(Tag::Hash(digest).render(), digest.to_hex());
        assert_eq!(Tag::Return(digest).render(), digest.to_hex());
    }

    #[test]
    fn test_unknown_memo_type_rejected() {
        assert!(Tag::from_wire("id", "12").is_err());
    }
}
