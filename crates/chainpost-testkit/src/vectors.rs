//! Golden test vectors.
//!
//! Values a ledger node computes for the same inputs. Any implementation of
//! the entry and address codecs must reproduce them exactly.

use chainpost_core::{chain_id, entry_hash, Address, ChainId};

/// An entry with known chain ID and entry hash.
#[derive(Debug, Clone)]
pub struct EntryVector {
    pub name: &'static str,
    pub external_ids: &'static [&'static str],
    pub content: &'static [u8],
    /// Expected chain ID (hex).
    pub chain_id: &'static str,
    /// Expected entry hash (hex).
    pub entry_hash: &'static str,
}

/// A secret address and the public address and key derived from it.
#[derive(Debug, Clone)]
pub struct AddressVector {
    pub name: &'static str,
    pub secret: &'static str,
    pub public: &'static str,
    /// Expected Ed25519 public key (hex).
    pub public_key: &'static str,
}

/// Value (factoid) key pair used across the test suites.
pub const FACTOID_SECRET: &str = "Fs3E9gV6DXsYzf7Fqx1fVBQPQXV695eP3k5XbmHEZVRLkMdD9qCK";
pub const FACTOID_PUBLIC: &str = "FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q";

/// Credit key pair used across the test suites.
pub const CREDIT_SECRET: &str = "Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG";
pub const CREDIT_PUBLIC: &str = "EC2DKSYyRcNWf7RS963VFYgMExoHRYLHVeCfQ9PGPmNzwrcmgm2r";

/// 2025-01-14T16:00:00Z, encoded as `01 94 65 8b 10 00`.
pub const TIMESTAMP: i64 = 1_736_870_400_000;

const IDS: &[&str] = &["first external id", "second external id"];
const CHAIN: &str = "502b99271ff6a3f8509ba2764e1e1c1482ad800140c17b25e165837ab5320501";

pub fn entry_vectors() -> Vec<EntryVector> {
    vec![
        EntryVector {
            name: "two external ids, empty content",
            external_ids: IDS,
            content: b"",
            chain_id: CHAIN,
            entry_hash: "322b18e1f267202565bf0d1ee03865f076fd22357ff6dc46c7a6dfef454f3871",
        },
        EntryVector {
            name: "two external ids, text content",
            external_ids: IDS,
            content: b"Test Entry Content",
            chain_id: CHAIN,
            entry_hash: "ed6d1ac92095db94be1f179d10a275e9468187ffde4eac91164b707793050f30",
        },
    ]
}

pub fn address_vectors() -> Vec<AddressVector> {
    vec![
        AddressVector {
            name: "factoid",
            secret: FACTOID_SECRET,
            public: FACTOID_PUBLIC,
            public_key: "718b5edd2914acc2e4677f336c1a32736e5e9bde13663e6413894f57ec272e28",
        },
        AddressVector {
            name: "entry credit",
            secret: CREDIT_SECRET,
            public: CREDIT_PUBLIC,
            public_key: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
        },
    ]
}

/// Compute an entry vector's chain ID and entry hash, as hex.
pub fn compute_entry_vector(vector: &EntryVector) -> (String, Option<String>) {
    let id = chain_id(vector.external_ids);
    let hash = entry_hash(vector.external_ids, vector.content, Some(&id))
        .ok()
        .map(|h| h.to_hex());
    (id.to_hex(), hash)
}

/// Derive an address vector's public address and public key.
pub fn compute_address_vector(vector: &AddressVector) -> Option<(String, String)> {
    let secret = Address::parse(vector.secret).ok()?;
    let public = secret.to_public().ok()?;
    let key = secret.public_key()?;
    Some((public.to_string(), key.to_hex()))
}

/// Check every vector. Returns `(name, matches)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    let entries = entry_vectors().into_iter().map(|v| {
        let (id, hash) = compute_entry_vector(&v);
        let ok = id == v.chain_id && hash.as_deref() == Some(v.entry_hash);
        (v.name.to_string(), ok)
    });
    let addresses = address_vectors().into_iter().map(|v| {
        let ok = compute_address_vector(&v)
            .map(|(public, key)| public == v.public && key == v.public_key)
            .unwrap_or(false);
        (v.name.to_string(), ok)
    });
    entries.chain(addresses).collect()
}

/// The chain ID shared by the entry vectors.
pub fn vector_chain_id() -> ChainId {
    chain_id(IDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        let results = verify_all_vectors();
        assert_eq!(results.len(), 4);
        for (name, ok) in results {
            assert!(ok, "vector '{name}' does not match");
        }
    }

    #[test]
    fn test_vector_chain_id() {
        assert_eq!(vector_chain_id().to_hex(), CHAIN);
    }
}
