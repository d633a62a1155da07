//! The ledger node, as seen from a client.

use async_trait::async_trait;

use chainpost_core::ChainId;

use crate::error::Result;
use crate::types::{
    AckResponse, AckTarget, ChainHead, CommitChainResponse, CommitEntryResponse, EntryData,
    FactoidSubmitResponse, RevealResponse, RpcResponse,
};

/// JSON-RPC method names.
pub mod method {
    pub const COMMIT_CHAIN: &str = "commit-chain";
    pub const COMMIT_ENTRY: &str = "commit-entry";
    pub const REVEAL_CHAIN: &str = "reveal-chain";
    pub const REVEAL_ENTRY: &str = "reveal-entry";
    pub const ACK: &str = "ack";
    pub const ALL_ENTRIES: &str = "entries";
    pub const CHAIN_HEAD: &str = "chain-head";
    pub const FACTOID_SUBMIT: &str = "factoid-submit";
}

/// Calls a ledger node answers.
///
/// `Err` means no response was obtained at all. A response that arrived but
/// reports failure comes back as `Ok` and is judged with
/// [`RpcResponse::into_result`].
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Submit a chain commit (hex).
    async fn commit_chain(&self, message: &str) -> Result<RpcResponse<CommitChainResponse>>;

    /// Submit an entry commit (hex).
    async fn commit_entry(&self, message: &str) -> Result<RpcResponse<CommitEntryResponse>>;

    /// Reveal a chain's first entry (hex entry bytes).
    async fn reveal_chain(&self, entry: &str) -> Result<RpcResponse<RevealResponse>>;

    /// Reveal an entry (hex entry bytes).
    async fn reveal_entry(&self, entry: &str) -> Result<RpcResponse<RevealResponse>>;

    async fn acknowledgment(&self, target: &AckTarget) -> Result<RpcResponse<AckResponse>>;

    /// Every entry on a chain, oldest first.
    async fn all_entries(&self, chain_id: &ChainId) -> Result<RpcResponse<Vec<EntryData>>>;

    /// Head of a chain; an error response if the chain does not exist.
    async fn chain_head(&self, chain_id: &ChainId) -> Result<RpcResponse<ChainHead>>;

    /// Submit a signed transaction (hex).
    async fn factoid_submit(&self, transaction: &str) -> Result<RpcResponse<FactoidSubmitResponse>>;
}
