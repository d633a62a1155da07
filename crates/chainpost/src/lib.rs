//! # Chainpost
//!
//! Publish chains, entries and value transfers to a chain/entry ledger using
//! its two-phase commit/reveal protocol.
//!
//! ## Overview
//!
//! Writing to the ledger takes two messages:
//!
//! - **Commit**: A signed, paid promise binding an entry hash to a credit key
//! - **Reveal**: The entry itself, accepted only if its hash was committed
//!
//! The [`Orchestrator`] composes both (locally or through a wallet), submits
//! them in order, checks that the node acknowledged the same entry for each,
//! then polls until the entry reaches the requested confirmation level.
//! Registered [`Listener`]s see every step.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainpost::{LocalComposer, Orchestrator, SubmitConfig};
//! use chainpost::core::{Chain, Entry, LocalSigner};
//! use chainpost::rpc::MemoryLedger;
//!
//! async fn example() {
//!     let signer = LocalSigner::from_secret("Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG")
//!         .unwrap();
//!     let composer = LocalComposer::new(Arc::new(signer));
//!     let orchestrator = Orchestrator::new(Arc::new(MemoryLedger::new()), SubmitConfig::default());
//!
//!     let chain = Chain::new(Entry::first().external_id("my-chain").content("hello")).unwrap();
//!     let created = orchestrator.submit_chain(&chain, &composer).await.unwrap();
//!
//!     let entry = Entry::new(created.chain_id()).content("second");
//!     orchestrator.submit_entry(&entry, &composer).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `chainpost::core` - Codecs, addresses, signing (no I/O)
//! - `chainpost::rpc` - Ledger and wallet traits, in-memory implementations

pub mod compose;
pub mod config;
pub mod error;
pub mod listener;
pub mod orchestrator;
pub mod state;

pub use chainpost_core as core;
pub use chainpost_rpc as rpc;

pub use compose::{Composed, Composer, LocalComposer, WalletComposer};
pub use config::{AckConfig, AckLevel, SubmitConfig};
pub use error::{Result, SubmitError};
pub use listener::{CommitEvent, Listener, Listeners, NoopListener};
pub use orchestrator::{CommitAndRevealResponse, Orchestrator, TransactionResponse};
pub use state::{SubmissionKind, SubmissionState, Tracker};

pub use chainpost_core::{
    Address, Chain, ChainId, CoreError, Entry, EntryHash, LocalSigner, SigningProvider,
    Transaction, TransactionBuilder, TxId,
};
