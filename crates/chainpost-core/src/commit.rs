//! Commit and reveal messages.
//!
//! Chain commit, 200 bytes:
//!
//! ```text
//! [version = 0x00][timestamp: 6]
//! [sha256d(chain id): 32][sha256d(entry hash || chain id): 32]
//! [entry hash: 32][cost: 1]            <- signed, 104 bytes
//! [public key: 32][signature: 64]
//! ```
//!
//! Entry commit, 136 bytes:
//!
//! ```text
//! [version = 0x00][timestamp: 6][entry hash: 32][cost: 1]   <- signed, 40 bytes
//! [public key: 32][signature: 64]
//! ```
//!
//! A reveal is the entry bytes, hex-encoded.

use crate::codec::{from_milli_timestamp, to_milli_timestamp, Reader};
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::digest::double_sha256;
use crate::entry::{chain_cost, entry_cost, hash_entry_bytes, Chain, Entry};
use crate::error::{CoreError, Result};
use crate::signing::SigningProvider;
use crate::types::{ChainId, EntryHash};

pub const COMMIT_VERSION: u8 = 0x00;

/// Signed prefix of a chain commit.
pub const CHAIN_COMMIT_SIGNED_LEN: usize = 104;
pub const CHAIN_COMMIT_LEN: usize = CHAIN_COMMIT_SIGNED_LEN + 32 + 64;

/// Signed prefix of an entry commit.
pub const ENTRY_COMMIT_SIGNED_LEN: usize = 40;
pub const ENTRY_COMMIT_LEN: usize = ENTRY_COMMIT_SIGNED_LEN + 32 + 64;

/// `sha256d(entry hash || chain id)`, binding a chain commit to its entry.
pub fn chain_weld(entry_hash: &EntryHash, chain_id: &ChainId) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(entry_hash.as_bytes());
    buf[32..].copy_from_slice(chain_id.as_bytes());
    double_sha256(&buf)
}

/// The signed part of a chain commit.
pub fn chain_commit_unsigned(
    chain_id: &ChainId,
    entry_hash: &EntryHash,
    cost: u8,
    timestamp: i64,
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(CHAIN_COMMIT_LEN);
    buf.push(COMMIT_VERSION);
    buf.extend_from_slice(&to_milli_timestamp(timestamp)?);
    buf.extend_from_slice(&double_sha256(chain_id.as_bytes()));
    buf.extend_from_slice(&chain_weld(entry_hash, chain_id));
    buf.extend_from_slice(entry_hash.as_bytes());
    buf.push(cost);
    Ok(buf)
}

/// The signed part of an entry commit.
pub fn entry_commit_unsigned(entry_hash: &EntryHash, cost: u8, timestamp: i64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(ENTRY_COMMIT_LEN);
    buf.push(COMMIT_VERSION);
    buf.extend_from_slice(&to_milli_timestamp(timestamp)?);
    buf.extend_from_slice(entry_hash.as_bytes());
    buf.push(cost);
    Ok(buf)
}

/// Sign `unsigned` and append the key and signature.
async fn seal_commit(mut unsigned: Vec<u8>, signer: &dyn SigningProvider) -> Result<Vec<u8>> {
    let public_key = signer.public_key().await?;
    let signature = signer.sign(&unsigned).await?;
    unsigned.extend_from_slice(public_key.as_bytes());
    unsigned.extend_from_slice(signature.as_bytes());
    Ok(unsigned)
}

/// A ready-to-submit commit and its matching reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedCommit {
    pub chain_id: ChainId,
    pub entry_hash: EntryHash,
    /// Credits paid.
    pub cost: u8,
    pub commit: Vec<u8>,
    /// Entry bytes.
    pub reveal: Vec<u8>,
}

impl ComposedCommit {
    pub fn commit_hex(&self) -> String {
        hex::encode(&self.commit)
    }

    pub fn reveal_hex(&self) -> String {
        hex::encode(&self.reveal)
    }
}

/// Compose the commit and reveal that create `chain`.
pub async fn compose_chain(
    chain: &Chain,
    signer: &dyn SigningProvider,
    timestamp: i64,
) -> Result<ComposedCommit> {
    let entry = chain.resolved_first_entry();
    let chain_id = chain.id();
    let reveal = entry.to_bytes()?;
    let entry_hash = hash_entry_bytes(&reveal);
    let cost = chain_cost(reveal.len())?;

    let unsigned = chain_commit_unsigned(&chain_id, &entry_hash, cost, timestamp)?;
    let commit = seal_commit(unsigned, signer).await?;

    Ok(ComposedCommit {
        chain_id,
        entry_hash,
        cost,
        commit,
        reveal,
    })
}

/// Compose the commit and reveal that append `entry` to an existing chain.
pub async fn compose_entry(
    entry: &Entry,
    signer: &dyn SigningProvider,
    timestamp: i64,
) -> Result<ComposedCommit> {
    let chain_id = entry
        .chain_id
        .ok_or_else(|| CoreError::assertion("an entry commit needs a chain id"))?;
    let reveal = entry.to_bytes()?;
    let entry_hash = hash_entry_bytes(&reveal);
    let cost = entry_cost(reveal.len())?;

    let unsigned = entry_commit_unsigned(&entry_hash, cost, timestamp)?;
    let commit = seal_commit(unsigned, signer).await?;

    Ok(ComposedCommit {
        chain_id,
        entry_hash,
        cost,
        commit,
        reveal,
    })
}

/// Fields of a decoded commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub timestamp: i64,
    pub entry_hash: EntryHash,
    pub cost: u8,
    pub public_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
    /// `sha256d(chain id)` and the weld, for chain commits.
    pub chain: Option<([u8; 32], [u8; 32])>,
}

impl ParsedCommit {
    /// Decode a chain or entry commit (told apart by length) and verify its
    /// signature.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let signed_len = match bytes.len() {
            CHAIN_COMMIT_LEN => CHAIN_COMMIT_SIGNED_LEN,
            ENTRY_COMMIT_LEN => ENTRY_COMMIT_SIGNED_LEN,
            n => {
                return Err(CoreError::Decoding(format!(
                    "commit must be {ENTRY_COMMIT_LEN} or {CHAIN_COMMIT_LEN} bytes, got {n}"
                )))
            }
        };

        let mut r = Reader::new(bytes);
        let version = r.u8()?;
        if version != COMMIT_VERSION {
            return Err(CoreError::Decoding(format!(
                "unsupported commit version {version}"
            )));
        }
        let timestamp = from_milli_timestamp(&r.array::<6>()?);
        let chain = if signed_len == CHAIN_COMMIT_SIGNED_LEN {
            Some((r.array::<32>()?, r.array::<32>()?))
        } else {
            None
        };
        let entry_hash = EntryHash(r.array::<32>()?);
        let cost = r.u8()?;
        let public_key = Ed25519PublicKey(r.array::<32>()?);
        let signature = Ed25519Signature(r.array::<64>()?);

        public_key.verify(&bytes[..signed_len], &signature)?;

        Ok(Self {
            timestamp,
            entry_hash,
            cost,
            public_key,
            signature,
            chain,
        })
    }

    pub fn is_chain(&self) -> bool {
        self.chain.is_some()
    }

    /// Whether this chain commit was made for `chain_id`.
    pub fn commits_to_chain(&self, chain_id: &ChainId) -> bool {
        match &self.chain {
            Some((chain_hash, weld)) => {
                *chain_hash == double_sha256(chain_id.as_bytes())
                    && *weld == chain_weld(&self.entry_hash, chain_id)
            }
            None => false,
        }
    }
}
