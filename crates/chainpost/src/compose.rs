//! Producing commit and reveal messages.
//!
//! [`LocalComposer`] builds and signs everything in-process.
//! [`WalletComposer`] asks a wallet service, which keeps the key.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use chainpost_core::codec::now_millis;
use chainpost_core::entry::hash_entry_bytes;
use chainpost_core::{
    commit, Address, Chain, ChainId, CoreError, Entry, EntryHash, KeyRole, SigningProvider,
    Visibility,
};
use chainpost_rpc::wallet::method;
use chainpost_rpc::{ComposedMessages, WalletRpc};

use crate::error::Result;
use crate::state::SubmissionKind;

/// Ready-to-submit messages for one chain or entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub kind: SubmissionKind,
    pub chain_id: ChainId,
    pub entry_hash: EntryHash,
    /// Commit message, hex.
    pub commit: String,
    /// Entry bytes, hex.
    pub reveal: String,
}

/// Source of commit and reveal messages.
#[async_trait]
pub trait Composer: Send + Sync {
    /// Messages that create `chain`.
    async fn compose_chain(&self, chain: &Chain) -> Result<Composed>;

    /// Messages that append `entry` to its chain.
    async fn compose_entry(&self, entry: &Entry) -> Result<Composed>;
}

/// Composes and signs locally.
pub struct LocalComposer {
    signer: Arc<dyn SigningProvider>,
    timestamp: Option<i64>,
    payer: OnceCell<Address>,
}

impl LocalComposer {
    /// Pay with the credit key behind `signer`.
    ///
    /// A remote signer only learns its address asynchronously, so the key
    /// role is checked on first use instead of here.
    pub fn new(signer: Arc<dyn SigningProvider>) -> Self {
        Self {
            signer,
            timestamp: None,
            payer: OnceCell::new(),
        }
    }

    /// Stamp every commit with `millis` instead of the current time.
    pub fn with_fixed_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    fn timestamp(&self) -> i64 {
        self.timestamp.unwrap_or_else(now_millis)
    }

    /// The signer's public address, once it is known to pay in credits.
    async fn payer(&self) -> Result<&Address> {
        let address = self
            .payer
            .get_or_try_init(|| async {
                let address = self.signer.public_address().await?;
                if address.kind().role() != KeyRole::Credit {
                    return Err(CoreError::InvalidAddress(format!(
                        "{address} cannot pay for commits"
                    )));
                }
                Ok(address)
            })
            .await?;
        Ok(address)
    }
}

#[async_trait]
impl Composer for LocalComposer {
    async fn compose_chain(&self, chain: &Chain) -> Result<Composed> {
        self.payer().await?;
        let composed = commit::compose_chain(chain, self.signer.as_ref(), self.timestamp()).await?;
        Ok(Composed {
            kind: SubmissionKind::Chain,
            chain_id: composed.chain_id,
            entry_hash: composed.entry_hash,
            commit: composed.commit_hex(),
            reveal: composed.reveal_hex(),
        })
    }

    async fn compose_entry(&self, entry: &Entry) -> Result<Composed> {
        self.payer().await?;
        let composed = commit::compose_entry(entry, self.signer.as_ref(), self.timestamp()).await?;
        Ok(Composed {
            kind: SubmissionKind::Entry,
            chain_id: composed.chain_id,
            entry_hash: composed.entry_hash,
            commit: composed.commit_hex(),
            reveal: composed.reveal_hex(),
        })
    }
}

/// Has a wallet compose and sign, paying from `ec_address`.
pub struct WalletComposer<W> {
    wallet: Arc<W>,
    ec_address: Address,
}

impl<W: WalletRpc> WalletComposer<W> {
    /// `ec_address` must be a public credit address the wallet holds.
    pub fn new(wallet: Arc<W>, ec_address: Address) -> std::result::Result<Self, CoreError> {
        if ec_address.kind().role() != KeyRole::Credit
            || ec_address.visibility() != Visibility::Public
        {
            return Err(CoreError::InvalidAddress(format!(
                "{} is not a public credit address",
                ec_address
            )));
        }
        Ok(Self { wallet, ec_address })
    }

    /// Fill in what the wallet leaves implicit, from the reveal it returned.
    fn finish(
        kind: SubmissionKind,
        expected_chain: Option<ChainId>,
        messages: ComposedMessages,
    ) -> Result<Composed> {
        let commit = messages.commit_hex()?.to_string();
        let reveal = messages.reveal_hex()?.to_string();

        let bytes = hex::decode(&reveal).map_err(|e| CoreError::Decoding(e.to_string()))?;
        let entry = Entry::from_bytes(&bytes)?;
        let chain_id = entry.resolved_chain_id();
        if let Some(expected) = expected_chain {
            if expected != chain_id {
                return Err(CoreError::Assertion(format!(
                    "wallet composed for chain {chain_id}, expected {expected}"
                ))
                .into());
            }
        }

        Ok(Composed {
            kind,
            chain_id,
            entry_hash: hash_entry_bytes(&bytes),
            commit,
            reveal,
        })
    }
}

#[async_trait]
impl<W: WalletRpc> Composer for WalletComposer<W> {
    async fn compose_chain(&self, chain: &Chain) -> Result<Composed> {
        let messages = self
            .wallet
            .compose_chain(chain, &self.ec_address)
            .await?
            .into_result(method::COMPOSE_CHAIN)?;
        Self::finish(SubmissionKind::Chain, Some(chain.id()), messages)
    }

    async fn compose_entry(&self, entry: &Entry) -> Result<Composed> {
        let messages = self
            .wallet
            .compose_entry(entry, &self.ec_address)
            .await?
            .into_result(method::COMPOSE_ENTRY)?;
        Self::finish(SubmissionKind::Entry, entry.chain_id, messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpost_core::LocalSigner;
    use chainpost_rpc::MemoryWallet;

    const ES: &str = "Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG";
    const EC: &str = "EC2DKSYyRcNWf7RS963VFYgMExoHRYLHVeCfQ9PGPmNzwrcmgm2r";
    const FA: &str = "FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q";
    const FS: &str = "Fs3E9gV6DXsYzf7Fqx1fVBQPQXV695eP3k5XbmHEZVRLkMdD9qCK";

    fn chain() -> Chain {
        Chain::new(Entry::first().external_id("compose").content("body")).unwrap()
    }

    #[tokio::test]
    async fn test_local_and_wallet_agree_on_hashes() {
        let local = LocalComposer::new(Arc::new(LocalSigner::from_secret(ES).unwrap()));
        let wallet = Arc::new(MemoryWallet::new().with_key(ES).unwrap());
        let remote = WalletComposer::new(wallet, Address::parse(EC).unwrap()).unwrap();

        let a = local.compose_chain(&chain()).await.unwrap();
        let b = remote.compose_chain(&chain()).await.unwrap();
        assert_eq!(a.chain_id, b.chain_id);
        assert_eq!(a.entry_hash, b.entry_hash);
        assert_eq!(a.reveal, b.reveal);
        assert_eq!(b.kind, SubmissionKind::Chain);
    }

    #[tokio::test]
    async fn test_fixed_timestamp_is_reproducible() {
        let signer = Arc::new(LocalSigner::from_secret(ES).unwrap());
        let composer = LocalComposer::new(signer).with_fixed_timestamp(1_736_870_400_000);
        let a = composer.compose_chain(&chain()).await.unwrap();
        let b = composer.compose_chain(&chain()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(&a.commit[2..14], "0194658b1000");
    }

    #[tokio::test]
    async fn test_entry_without_chain_rejected() {
        let composer = LocalComposer::new(Arc::new(LocalSigner::from_secret(ES).unwrap()));
        let result = composer.compose_entry(&Entry::first().content("x")).await;
        assert!(matches!(
            result,
            Err(crate::SubmitError::Core(CoreError::Assertion(_)))
        ));
    }

    #[tokio::test]
    async fn test_local_composer_needs_credit_key() {
        let composer = LocalComposer::new(Arc::new(LocalSigner::from_secret(FS).unwrap()));
        let chain_result = composer.compose_chain(&chain()).await;
        assert!(matches!(
            chain_result,
            Err(crate::SubmitError::Core(CoreError::InvalidAddress(_)))
        ));

        let entry = Entry::new(chain().id()).content("x");
        let entry_result = composer.compose_entry(&entry).await;
        assert!(matches!(
            entry_result,
            Err(crate::SubmitError::Core(CoreError::InvalidAddress(_)))
        ));
    }

    #[test]
    fn test_wallet_composer_needs_credit_address() {
        let wallet = Arc::new(MemoryWallet::new());
        assert!(WalletComposer::new(wallet, Address::parse(FA).unwrap()).is_err());
    }
}
