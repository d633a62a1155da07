//! Error types for the RPC seam.

use thiserror::Error;

use chainpost_core::CoreError;

/// JSON-RPC error codes the ledger uses.
pub mod code {
    /// Malformed or rejected request.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Lookup of something the node does not have.
    pub const OBJECT_NOT_FOUND: i64 = -32008;
    /// The chain does not exist.
    pub const MISSING_CHAIN_HEAD: i64 = -32009;
    /// The entry hash was already committed.
    pub const REPEATED_COMMIT: i64 = -32011;
}

/// A failed call to the ledger node or the wallet.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The endpoint answered with a non-200 HTTP status.
    #[error("{method}: http status {status}")]
    Http { method: String, status: u16 },

    /// The endpoint returned a JSON-RPC error object.
    #[error("{method}: rpc error {code}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    /// Status 200, no error, and still no result.
    #[error("{method}: response carried no result")]
    MissingResult { method: String },

    /// The call never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response field could not be turned into a core value.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RpcError {
    /// The JSON-RPC error code, for remote errors.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The node reported that a chain does not exist.
    pub fn is_missing_chain(&self) -> bool {
        self.code() == Some(code::MISSING_CHAIN_HEAD)
    }
}

impl From<RpcError> for CoreError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Core(inner) => inner,
            other => CoreError::Signer(Box::new(other)),
        }
    }
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
