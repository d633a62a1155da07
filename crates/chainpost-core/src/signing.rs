//! Pluggable signing.
//!
//! Commit messages and transaction inputs are signed through
//! [`SigningProvider`]. [`LocalSigner`] keeps the seed in memory; a remote
//! wallet-backed provider lives in `chainpost-rpc`.

use async_trait::async_trait;
use std::fmt;

use crate::address::{assert_visibility, Address, Visibility};
use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::Result;

/// Something that can sign messages for one key.
///
/// Implementations must be safe to share across concurrent submissions.
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Ed25519-sign `message`.
    async fn sign(&self, message: &[u8]) -> Result<Ed25519Signature>;

    /// The signer's public key.
    async fn public_key(&self) -> Result<Ed25519PublicKey>;

    /// The public address the signer pays from.
    async fn public_address(&self) -> Result<Address>;
}

/// Signs with a secret address held in process memory.
#[derive(Clone)]
pub struct LocalSigner {
    keypair: Keypair,
    public_address: Address,
}

impl LocalSigner {
    /// Build a signer from a secret address (`Fs`, `Es`, `idsec`, `sk1`..).
    ///
    /// Public addresses carry no key material and are rejected.
    pub fn new(secret: &Address) -> Result<Self> {
        assert_visibility(secret, Visibility::Secret)?;
        let keypair = Keypair::from_seed(&secret.payload());
        let public_address = secret.to_public()?;
        Ok(Self {
            keypair,
            public_address,
        })
    }

    /// Parse a secret address string and build a signer from it.
    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(&Address::parse(secret)?)
    }

    /// The public address, without going through the async trait.
    pub fn address(&self) -> &Address {
        &self.public_address
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("public_address", &self.public_address)
            .finish()
    }
}

#[async_trait]
impl SigningProvider for LocalSigner {
    async fn sign(&self, message: &[u8]) -> Result<Ed25519Signature> {
        Ok(self.keypair.sign(message))
    }

    async fn public_key(&self) -> Result<Ed25519PublicKey> {
        Ok(self.keypair.public_key())
    }

    async fn public_address(&self) -> Result<Address> {
        Ok(self.public_address.clone())
    }
}
