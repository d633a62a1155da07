//! Response model for ledger and wallet calls.
//!
//! Field names follow the node's JSON (`entryhash`, `chainid`, `txid`, ...).

use serde::{Deserialize, Serialize};

use chainpost_core::{Address, ChainId, CoreError, Entry, EntryHash, TxId};

use crate::error::{Result, RpcError};

/// HTTP status of a successful call.
pub const HTTP_OK: u16 = 200;

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Everything a call can come back with.
///
/// A non-200 status or a present error is a hard failure, whatever the
/// result holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponse<T> {
    pub http_status: u16,
    pub error: Option<RpcErrorObject>,
    pub result: Option<T>,
}

impl<T> RpcResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            http_status: HTTP_OK,
            error: None,
            result: Some(result),
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            http_status: HTTP_OK,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
            result: None,
        }
    }

    pub fn http(status: u16) -> Self {
        Self {
            http_status: status,
            error: None,
            result: None,
        }
    }

    /// Apply the failure rule and take the result.
    pub fn into_result(self, method: &str) -> Result<T> {
        if self.http_status != HTTP_OK {
            return Err(RpcError::Http {
                method: method.to_string(),
                status: self.http_status,
            });
        }
        if let Some(err) = self.error {
            return Err(RpcError::Remote {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        self.result.ok_or_else(|| RpcError::MissingResult {
            method: method.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitChainResponse {
    pub message: String,
    #[serde(rename = "txid")]
    pub tx_id: TxId,
    #[serde(rename = "entryhash")]
    pub entry_hash: EntryHash,
    #[serde(rename = "chainidhash", default, skip_serializing_if = "Option::is_none")]
    pub chain_id_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntryResponse {
    pub message: String,
    #[serde(rename = "txid")]
    pub tx_id: TxId,
    #[serde(rename = "entryhash")]
    pub entry_hash: EntryHash,
}

/// Answer to `reveal-chain` and `reveal-entry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealResponse {
    pub message: String,
    #[serde(rename = "entryhash")]
    pub entry_hash: EntryHash,
    #[serde(rename = "chainid")]
    pub chain_id: ChainId,
}

/// How far along the ledger is with a commit, entry or transaction.
///
/// Ordered: a later variant implies every earlier one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AckStatus {
    #[default]
    Unknown,
    NotConfirmed,
    #[serde(rename = "TransactionACK")]
    TransactionAck,
    DBlockConfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AckData {
    #[serde(default)]
    pub status: AckStatus,
}

/// What to ask the acknowledgment call about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckTarget {
    /// A committed and revealed entry, on its chain.
    Entry {
        entry_hash: EntryHash,
        chain_id: ChainId,
    },
    /// A value transfer.
    Transaction(TxId),
}

impl AckTarget {
    /// The hash the node is queried with.
    pub fn hash_hex(&self) -> String {
        match self {
            AckTarget::Entry { entry_hash, .. } => entry_hash.to_hex(),
            AckTarget::Transaction(tx_id) => tx_id.to_hex(),
        }
    }
}

/// Acknowledgment state. Entry acks report the commit and the entry
/// separately; transaction acks carry a single top-level status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(rename = "committxid", default, skip_serializing_if = "Option::is_none")]
    pub commit_tx_id: Option<TxId>,
    #[serde(rename = "entryhash", default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<EntryHash>,
    #[serde(rename = "commitdata", default, skip_serializing_if = "Option::is_none")]
    pub commit_data: Option<AckData>,
    #[serde(rename = "entrydata", default, skip_serializing_if = "Option::is_none")]
    pub entry_data: Option<AckData>,
    #[serde(rename = "txid", default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<TxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AckStatus>,
}

impl AckResponse {
    /// An entry ack with the same status for commit and entry.
    pub fn entry(entry_hash: EntryHash, status: AckStatus) -> Self {
        Self {
            entry_hash: Some(entry_hash),
            commit_data: Some(AckData { status }),
            entry_data: Some(AckData { status }),
            ..Self::default()
        }
    }

    pub fn transaction(tx_id: TxId, status: AckStatus) -> Self {
        Self {
            tx_id: Some(tx_id),
            status: Some(status),
            ..Self::default()
        }
    }

    /// The status that counts: the entry's if reported, else the
    /// transaction's, else the commit's.
    pub fn status(&self) -> AckStatus {
        self.entry_data
            .as_ref()
            .map(|d| d.status)
            .or(self.status)
            .or_else(|| self.commit_data.as_ref().map(|d| d.status))
            .unwrap_or_default()
    }
}

/// Head of an existing chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    #[serde(rename = "chainhead")]
    pub chain_head: String,
    #[serde(rename = "chaininprocesslist", default)]
    pub in_process_list: bool,
}

/// An entry as the node returns it: hex fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(rename = "chainid")]
    pub chain_id: String,
    pub content: String,
    #[serde(rename = "extids", default)]
    pub external_ids: Option<Vec<Option<String>>>,
}

impl EntryData {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            chain_id: entry.resolved_chain_id().to_hex(),
            content: hex::encode(&entry.content),
            external_ids: Some(
                entry
                    .external_ids
                    .iter()
                    .map(|id| Some(hex::encode(id)))
                    .collect(),
            ),
        }
    }

    /// Decode into an [`Entry`]. A null external ID slot is rejected.
    pub fn to_entry(&self) -> std::result::Result<Entry, CoreError> {
        Entry::from_hex_parts(&self.chain_id, self.external_ids.as_deref(), &self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidSubmitResponse {
    pub message: String,
    #[serde(rename = "txid")]
    pub tx_id: TxId,
}

/// Parameters of a wallet-composed call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComposedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// A ready-made JSON-RPC request from the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedCall {
    pub method: String,
    pub params: ComposedParams,
}

/// Commit and reveal requests composed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMessages {
    pub commit: ComposedCall,
    pub reveal: ComposedCall,
}

impl ComposedMessages {
    pub fn from_hex(commit_method: &str, commit: String, reveal_method: &str, reveal: String) -> Self {
        Self {
            commit: ComposedCall {
                method: commit_method.to_string(),
                params: ComposedParams {
                    message: Some(commit),
                    entry: None,
                },
            },
            reveal: ComposedCall {
                method: reveal_method.to_string(),
                params: ComposedParams {
                    message: None,
                    entry: Some(reveal),
                },
            },
        }
    }

    /// The commit message hex.
    pub fn commit_hex(&self) -> Result<&str> {
        self.commit
            .params
            .message
            .as_deref()
            .ok_or_else(|| RpcError::MissingResult {
                method: format!("{} message", self.commit.method),
            })
    }

    /// The reveal entry hex.
    pub fn reveal_hex(&self) -> Result<&str> {
        self.reveal
            .params
            .entry
            .as_deref()
            .ok_or_else(|| RpcError::MissingResult {
                method: format!("{} entry", self.reveal.method),
            })
    }
}

/// Answer to `sign-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDataResponse {
    #[serde(rename = "pubkey")]
    pub public_key: String,
    pub signature: String,
}

/// Answer to the wallet's address lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    pub public: Address,
}
