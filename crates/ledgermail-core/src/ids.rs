//! Account identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a ledger account.
///
/// Canonical identifiers are the lowercase hex form of the account's
/// master key. Federated aliases (`name*domain.tld`) are not account
/// identifiers; they resolve to one through the resolver.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `s` has the canonical identifier form (64 hex chars).
    pub fn is_canonical(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Non-canonical identifiers may be short or multi-byte UTF-8;
        // cut on a char boundary.
        match self.0.char_indices().nth(12) {
            Some((cut, _)) => write!(f, "AccountId({}…)", &self.0[..cut]),
            None => write!(f, "AccountId({})", self.0),
        }
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let hex64 = "ab".repeat(32);
        assert!(AccountId::is_canonical(&hex64));
        assert!(!AccountId::is_canonical("alice*example.org"));
        assert!(!AccountId::is_canonical(&"zz".repeat(32)));
        assert!(!AccountId::is_canonical(&"ab".repeat(31)));
    }

    #[test]
    fn test_display_roundtrip() {
        let id = AccountId::new("abcd");
        assert_eq!(id.to_string(), "abcd");
        assert_eq!(id.as_str(), "abcd");
    }

    #[test]
    fn test_debug_survives_short_and_multibyte_ids() {
        assert_eq!(format!("{:?}", AccountId::new("abcd")), "AccountId(abcd)");
        // A byte-offset cut would land inside a 2-byte char here.
        let accented = AccountId::new("é".repeat(20));
        assert_eq!(
            format!("{:?}", accented),
            format!("AccountId({}…)", "é".repeat(12))
        );
        let canonical = AccountId::new("ab".repeat(32));
        assert_eq!(
            format!("{:?}", canonical),
            "AccountId(abababababab…)"
        );
    }
}
