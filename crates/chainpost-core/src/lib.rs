//! # Chainpost Core
//!
//! Pure codecs for publishing to a chain/entry ledger: addresses, entries,
//! value transfers, and commit/reveal messages.
//!
//! This crate performs no I/O. Everything that can fail here fails before a
//! message ever leaves the process.
//!
//! ## Key Types
//!
//! - [`Address`] - Checksummed, typed Base58 address
//! - [`Entry`] / [`Chain`] - Records and the chains they append to
//! - [`ChainId`] / [`EntryHash`] - Content-derived identifiers
//! - [`TransactionBuilder`] / [`Transaction`] - Two-phase value transfer
//! - [`SigningProvider`] - Where signatures come from
//!
//! ## Wire format
//!
//! Entry, transaction and commit layouts are bit-exact with what the ledger
//! verifies. See [`entry`], [`transaction`] and [`commit`].

pub mod address;
pub mod codec;
pub mod commit;
pub mod crypto;
pub mod digest;
pub mod entry;
pub mod error;
pub mod signing;
pub mod transaction;
pub mod types;

pub use address::{assert_visibility, Address, AddressType, KeyRole, Visibility};
pub use commit::{compose_chain, compose_entry, ComposedCommit, ParsedCommit};
pub use crypto::{secret_to_public_key, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use digest::{double_sha256, sha256, sha512, Sha256Hash};
pub use entry::{chain_cost, chain_id, entry_bytes, entry_cost, entry_hash, Chain, Entry};
pub use error::{CoreError, Result};
pub use signing::{LocalSigner, SigningProvider};
pub use transaction::{Rcd, Transaction, TransactionBuilder, TxInput, TxOutput};
pub use types::{ChainId, EntryHash, TxId};
