//! Error types for chainpost core.
//!
//! Everything here is raised synchronously, before any network call is made.

use thiserror::Error;

/// Errors raised while encoding, decoding, or signing ledger records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad Base58, unknown prefix, wrong length, or checksum mismatch.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Contract violation by the caller (null external ID slot, missing
    /// input signature, signing with a public address, ...).
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Entry payload exceeds the ledger capacity.
    #[error("payload too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// A value does not fit the fixed-width encoding it was asked for.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// A signing backend could not produce a signature or key. Keeps the
    /// backend's own error so callers can recover it.
    #[error("signer error: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CoreError {
    pub(crate) fn assertion(msg: impl Into<String>) -> Self {
        CoreError::Assertion(msg.into())
    }

    pub(crate) fn invalid_address(msg: impl Into<String>) -> Self {
        CoreError::InvalidAddress(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
