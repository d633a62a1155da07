//! Error types for submissions.

use chainpost_core::{ChainId, CoreError, EntryHash};
use chainpost_rpc::{AckStatus, RpcError};
use thiserror::Error;

/// Why a submission failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Local validation or encoding failed. Raised before anything is sent.
    #[error("core error: {0}")]
    Core(#[source] CoreError),

    /// The node or wallet rejected a call, or could not be reached.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    /// Acknowledgment polling ran out of attempts.
    #[error("no acknowledgment after {attempts} attempts, last status {last_status:?}")]
    Timeout {
        attempts: u32,
        last_status: AckStatus,
    },

    /// Commit and reveal were acknowledged for different entries.
    #[error("commit acknowledged entry {commit} but reveal acknowledged {reveal}")]
    ProtocolMismatch { commit: EntryHash, reveal: EntryHash },

    /// The chain was already on the ledger when we checked.
    #[error("chain already exists: {0}")]
    ChainExists(ChainId),
}

impl From<CoreError> for SubmitError {
    /// A signer that failed on a wallet call reports the call's own error.
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Signer(source) => match source.downcast::<RpcError>() {
                Ok(rpc) => SubmitError::Rpc(*rpc),
                Err(source) => SubmitError::Core(CoreError::Signer(source)),
            },
            other => SubmitError::Core(other),
        }
    }
}

impl SubmitError {
    /// Rejected by local validation, with nothing sent anywhere.
    pub fn is_local(&self) -> bool {
        matches!(self, SubmitError::Core(e) if !matches!(e, CoreError::Signer(_)))
    }
}

/// Result type for submissions.
pub type Result<T> = std::result::Result<T, SubmitError>;
