//! The wallet service and the signer that delegates to it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use chainpost_core::{
    address::rcd_hash, Address, Chain, CoreError, Ed25519PublicKey, Ed25519Signature, Entry,
    SigningProvider, Visibility,
};

use crate::error::Result;
use crate::types::{ComposedMessages, RpcResponse, SignDataResponse, WalletAddress};

/// JSON-RPC method names.
pub mod method {
    pub const COMPOSE_CHAIN: &str = "compose-chain";
    pub const COMPOSE_ENTRY: &str = "compose-entry";
    pub const SIGN_DATA: &str = "sign-data";
    pub const ADDRESS: &str = "address";
}

/// Calls a wallet service answers. Key material never leaves it.
#[async_trait]
pub trait WalletRpc: Send + Sync {
    /// Compose the commit and reveal that create `chain`, paid by `ec_address`.
    async fn compose_chain(
        &self,
        chain: &Chain,
        ec_address: &Address,
    ) -> Result<RpcResponse<ComposedMessages>>;

    /// Compose the commit and reveal that append `entry`, paid by `ec_address`.
    async fn compose_entry(
        &self,
        entry: &Entry,
        ec_address: &Address,
    ) -> Result<RpcResponse<ComposedMessages>>;

    /// Sign `data` with the key behind `signer`.
    async fn sign_data(&self, signer: &Address, data: &[u8])
        -> Result<RpcResponse<SignDataResponse>>;

    /// Confirm the wallet holds `address` and return its public form.
    async fn public_address(&self, address: &Address) -> Result<RpcResponse<WalletAddress>>;
}

/// A [`SigningProvider`] backed by a wallet service.
pub struct RemoteSigner<W> {
    wallet: Arc<W>,
    address: Address,
    public_key: OnceCell<Ed25519PublicKey>,
}

impl<W: WalletRpc> RemoteSigner<W> {
    /// Sign as `address` (a public address the wallet holds the secret for).
    pub fn new(wallet: Arc<W>, address: Address) -> std::result::Result<Self, CoreError> {
        if address.visibility() != Visibility::Public {
            return Err(CoreError::Assertion(
                "a remote signer is addressed by its public address".into(),
            ));
        }
        Ok(Self {
            wallet,
            address,
            public_key: OnceCell::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    async fn sign_remote(&self, data: &[u8]) -> Result<(Ed25519PublicKey, Ed25519Signature)> {
        let signed = self
            .wallet
            .sign_data(&self.address, data)
            .await?
            .into_result(method::SIGN_DATA)?;
        let public_key = Ed25519PublicKey::from_hex(&signed.public_key)?;
        let signature = Ed25519Signature::from_hex(&signed.signature)?;
        self.check_key(&public_key)?;
        Ok((public_key, signature))
    }

    /// The wallet must sign with the key the address names.
    fn check_key(&self, public_key: &Ed25519PublicKey) -> std::result::Result<(), CoreError> {
        let matches = match self.address.public_key() {
            Some(expected) => expected == *public_key,
            None => self.address.rcd_hash() == Some(rcd_hash(public_key)),
        };
        if matches {
            Ok(())
        } else {
            tracing::warn!(address = %self.address, "wallet signed with a different key");
            Err(CoreError::InvalidPublicKey)
        }
    }
}

#[async_trait]
impl<W: WalletRpc> SigningProvider for RemoteSigner<W> {
    async fn sign(&self, message: &[u8]) -> chainpost_core::Result<Ed25519Signature> {
        let (public_key, signature) = self.sign_remote(message).await?;
        // Cache the key learned from the first signature.
        let _ = self.public_key.set(public_key);
        Ok(signature)
    }

    async fn public_key(&self) -> chainpost_core::Result<Ed25519PublicKey> {
        if let Some(key) = self.address.public_key() {
            return Ok(key);
        }
        // RCD-hash addresses hide the key; learn it from a signature.
        let key = self
            .public_key
            .get_or_try_init(|| async { self.sign_remote(&[]).await.map(|(pk, _)| pk) })
            .await?;
        Ok(*key)
    }

    async fn public_address(&self) -> chainpost_core::Result<Address> {
        let found = self
            .wallet
            .public_address(&self.address)
            .await?
            .into_result(method::ADDRESS)?;
        Ok(found.public)
    }
}
