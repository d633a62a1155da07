//! # Chainpost Testkit
//!
//! Testing utilities for chainpost.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Chain IDs, entry hashes and address pairs a ledger
//!   node agrees with
//! - **Generators**: Proptest strategies for entries, chains and addresses
//! - **Fixtures**: An in-memory ledger and wallet with ready-made keys
//!
//! ## Golden Vectors
//!
//! ```rust
//! use chainpost_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "{name}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chainpost_testkit::generators::{entry_from_params, EntryParams};
//!
//! proptest! {
//!     #[test]
//!     fn entry_hash_is_deterministic(params: EntryParams) {
//!         let a = entry_from_params(&params).hash().unwrap();
//!         let b = entry_from_params(&params).hash().unwrap();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use chainpost_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.make_chain("my-chain", b"first entry");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{entry_from_params, EntryParams};
pub use vectors::{address_vectors, entry_vectors, verify_all_vectors, AddressVector, EntryVector};
