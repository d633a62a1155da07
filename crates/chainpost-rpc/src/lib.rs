//! # Chainpost RPC
//!
//! The seam between chainpost and the outside world: a ledger node that
//! accepts commits, reveals and transactions, and a wallet that composes and
//! signs without handing out keys.
//!
//! Transport is not implemented here. Implement [`LedgerRpc`] and
//! [`WalletRpc`] over whatever client you use; [`memory`] provides
//! in-process versions for tests and offline work.
//!
//! Every call returns an [`RpcResponse`]. A non-200 status or an error
//! object is a failure no matter what else the response holds; use
//! [`RpcResponse::into_result`].

pub mod error;
pub mod ledger;
pub mod memory;
pub mod types;
pub mod wallet;

pub use error::{Result, RpcError};
pub use ledger::LedgerRpc;
pub use memory::{Failure, LedgerMethod, MemoryLedger, MemoryWallet, WalletMethod};
pub use types::{
    AckResponse, AckStatus, AckTarget, ChainHead, CommitChainResponse, CommitEntryResponse,
    ComposedMessages, EntryData, FactoidSubmitResponse, RevealResponse, RpcErrorObject,
    RpcResponse,
};
pub use wallet::{RemoteSigner, WalletRpc};
