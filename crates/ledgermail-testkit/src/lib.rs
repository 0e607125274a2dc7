//! # Ledgermail Testkit
//!
//! Shared test scaffolding for the ledgermail workspace.
//!
//! - **Fixtures**: an in-memory ledger plus the test-network context,
//!   pre-wired for protocol scenarios (funded keypairs, co-signers,
//!   mailbox deliveries).
//! - **Generators**: proptest strategies for payloads and tags.
//! - **Vectors**: fixed transaction shapes for canonicalization
//!   determinism checks.
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use ledgermail_testkit::Fixture;
//!
//! let fixture = Fixture::new();
//! let sender = fixture.funded_keypair();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::Fixture;
pub use vectors::{all_vectors, transaction_from_vector, GoldenVector};
