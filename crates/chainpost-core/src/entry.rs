//! Entries and chains: deterministic serialization, chain IDs, entry hashes
//! and credit cost.
//!
//! Entry layout (all integers big-endian):
//!
//! ```text
//! [version = 0x00]
//! [chain id: 32]
//! [external id block length: 2]
//!   for each external id: [length: 2][bytes]
//! [content]
//! ```
//!
//! **CRITICAL**: this layout is what the ledger hashes. Changing it breaks
//! every entry hash and commit.

use bytes::Bytes;

use crate::codec::{to_fixed_width16, Reader};
use crate::digest::{sha256, sha512};
use crate::error::{CoreError, Result};
use crate::types::{ChainId, EntryHash};

/// Entry format version.
pub const ENTRY_VERSION: u8 = 0x00;

/// Bytes of an entry that are not counted against its payload: version,
/// chain ID and the external ID block length.
pub const ENTRY_HEADER_LEN: usize = 35;

/// Largest payload (external IDs + content) an entry may carry.
pub const MAX_ENTRY_PAYLOAD: usize = 10 * 1024;

/// Extra credits charged for creating a chain.
pub const CHAIN_CREATION_SURCHARGE: u8 = 10;

/// Derive a chain ID from external IDs.
///
/// `sha256(sha256(id_0) || sha256(id_1) || ...)`. Order matters. An empty
/// list yields `sha256("")`.
pub fn chain_id<T: AsRef<[u8]>>(external_ids: &[T]) -> ChainId {
    let mut hashes = Vec::with_capacity(external_ids.len() * 32);
    for id in external_ids {
        hashes.extend_from_slice(&sha256(id.as_ref()));
    }
    ChainId(sha256(&hashes))
}

/// Encode the external ID block: total length, then each ID length-prefixed.
fn external_id_block<T: AsRef<[u8]>>(external_ids: &[T]) -> Result<Vec<u8>> {
    let mut ids = Vec::new();
    for id in external_ids {
        let id = id.as_ref();
        ids.extend_from_slice(&to_fixed_width16(id.len() as u64)?);
        ids.extend_from_slice(id);
    }

    let mut block = Vec::with_capacity(2 + ids.len());
    block.extend_from_slice(&to_fixed_width16(ids.len() as u64)?);
    block.extend_from_slice(&ids);
    Ok(block)
}

/// Serialize an entry. When `chain_id` is `None` (a chain's first entry) it
/// is derived from the external IDs.
pub fn entry_bytes<T: AsRef<[u8]>>(
    external_ids: &[T],
    content: &[u8],
    chain_id: Option<&ChainId>,
) -> Result<Vec<u8>> {
    let chain = chain_id.copied().unwrap_or_else(|| self::chain_id(external_ids));
    let block = external_id_block(external_ids)?;

    let mut buf = Vec::with_capacity(1 + 32 + block.len() + content.len());
    buf.push(ENTRY_VERSION);
    buf.extend_from_slice(chain.as_bytes());
    buf.extend_from_slice(&block);
    buf.extend_from_slice(content);
    Ok(buf)
}

/// Hash already-serialized entry bytes: `sha256(sha512(bytes) || bytes)`.
pub fn hash_entry_bytes(bytes: &[u8]) -> EntryHash {
    let mut buf = Vec::with_capacity(64 + bytes.len());
    buf.extend_from_slice(&sha512(bytes));
    buf.extend_from_slice(bytes);
    EntryHash(sha256(&buf))
}

/// Hash an entry from its parts.
pub fn entry_hash<T: AsRef<[u8]>>(
    external_ids: &[T],
    content: &[u8],
    chain_id: Option<&ChainId>,
) -> Result<EntryHash> {
    let bytes = entry_bytes(external_ids, content, chain_id)?;
    Ok(hash_entry_bytes(&bytes))
}

/// Credits needed to commit an entry of `entry_len` serialized bytes.
///
/// One credit per started KiB of payload, minimum one. Payloads over
/// [`MAX_ENTRY_PAYLOAD`] are rejected.
pub fn entry_cost(entry_len: usize) -> Result<u8> {
    let payload = entry_len.saturating_sub(ENTRY_HEADER_LEN);
    if payload > MAX_ENTRY_PAYLOAD {
        return Err(CoreError::PayloadTooLarge {
            size: payload,
            max: MAX_ENTRY_PAYLOAD,
        });
    }
    let cost = payload.div_ceil(1024).max(1);
    Ok(cost as u8)
}

/// Credits needed to create a chain whose first entry is `entry_len` bytes.
pub fn chain_cost(entry_len: usize) -> Result<u8> {
    Ok(entry_cost(entry_len)? + CHAIN_CREATION_SURCHARGE)
}

/// One record on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Owning chain. `None` for a chain's first entry, whose chain ID is
    /// derived from the external IDs.
    pub chain_id: Option<ChainId>,
    /// Ordered external IDs.
    pub external_ids: Vec<Bytes>,
    /// Opaque payload.
    pub content: Bytes,
}

impl Entry {
    /// Start an entry for an existing chain.
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..Self::default()
        }
    }

    /// Start a chain's first entry (chain ID derived later).
    pub fn first() -> Self {
        Self::default()
    }

    /// Append an external ID.
    pub fn external_id(mut self, id: impl Into<Bytes>) -> Self {
        self.external_ids.push(id.into());
        self
    }

    /// Set the content.
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    /// Build an entry from the hex fields a node returns.
    ///
    /// An absent list means "no external IDs"; a list with a null slot is a
    /// contract violation.
    pub fn from_hex_parts(
        chain_id: &str,
        external_ids: Option<&[Option<String>]>,
        content: &str,
    ) -> Result<Self> {
        let chain_id = ChainId::from_hex(chain_id)?;

        let mut ids = Vec::new();
        for (i, slot) in external_ids.unwrap_or_default().iter().enumerate() {
            let hex_id = slot
                .as_deref()
                .ok_or_else(|| CoreError::assertion(format!("external id {i} is null")))?;
            let id = hex::decode(hex_id).map_err(|e| CoreError::Decoding(e.to_string()))?;
            ids.push(Bytes::from(id));
        }

        let content = hex::decode(content).map_err(|e| CoreError::Decoding(e.to_string()))?;

        Ok(Self {
            chain_id: Some(chain_id),
            external_ids: ids,
            content: content.into(),
        })
    }

    /// The chain ID this entry belongs to, deriving it for first entries.
    pub fn resolved_chain_id(&self) -> ChainId {
        self.chain_id
            .unwrap_or_else(|| chain_id(&self.external_ids))
    }

    /// Canonical serialized bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        entry_bytes(&self.external_ids, &self.content, self.chain_id.as_ref())
    }

    /// The entry hash.
    pub fn hash(&self) -> Result<EntryHash> {
        Ok(hash_entry_bytes(&self.to_bytes()?))
    }

    /// Total payload: external ID block contents plus content.
    pub fn payload_len(&self) -> Result<usize> {
        Ok(self.to_bytes()?.len() - ENTRY_HEADER_LEN)
    }

    /// Decode an entry from its canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);

        let version = r.u8()?;
        if version != ENTRY_VERSION {
            return Err(CoreError::Decoding(format!(
                "unsupported entry version {version}"
            )));
        }

        let chain_id = ChainId(r.array::<32>()?);
        let block_len = r.u16_be()? as usize;
        let mut block = Reader::new(r.take(block_len)?);

        let mut external_ids = Vec::new();
        while block.remaining() > 0 {
            let len = block.u16_be()? as usize;
            external_ids.push(Bytes::copy_from_slice(block.take(len)?));
        }

        Ok(Self {
            chain_id: Some(chain_id),
            external_ids,
            content: Bytes::copy_from_slice(r.rest()),
        })
    }
}

/// A chain, described by its first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    first_entry: Entry,
}

impl Chain {
    /// Wrap a first entry. It must have at least one external ID, and any
    /// chain ID it carries must match the derived one.
    pub fn new(first_entry: Entry) -> Result<Self> {
        if first_entry.external_ids.is_empty() {
            return Err(CoreError::assertion(
                "a chain's first entry needs at least one external id",
            ));
        }
        let derived = chain_id(&first_entry.external_ids);
        if let Some(given) = first_entry.chain_id {
            if given != derived {
                return Err(CoreError::assertion(format!(
                    "first entry chain id {given} does not match derived {derived}"
                )));
            }
        }
        Ok(Self { first_entry })
    }

    pub fn id(&self) -> ChainId {
        chain_id(&self.first_entry.external_ids)
    }

    pub fn first_entry(&self) -> &Entry {
        &self.first_entry
    }

    /// The first entry with its chain ID filled in.
    pub fn resolved_first_entry(&self) -> Entry {
        Entry {
            chain_id: Some(self.id()),
            ..self.first_entry.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 2] = ["first external id", "second external id"];
    const CHAIN: &str = "502b99271ff6a3f8509ba2764e1e1c1482ad800140c17b25e165837ab5320501";

    #[test]
    fn test_chain_id_vector() {
        assert_eq!(chain_id(&IDS).to_hex(), CHAIN);
    }

    #[test]
    fn test_chain_id_order_sensitive() {
        let reversed = [IDS[1], IDS[0]];
        assert_ne!(chain_id(&IDS), chain_id(&reversed));
    }

    #[test]
    fn test_chain_id_of_nothing() {
        let none: [&[u8]; 0] = [];
        assert_eq!(chain_id(&none).0, sha256(b""));
    }

    #[test]
    fn test_entry_hash_vectors() {
        let chain = ChainId::from_hex(CHAIN).unwrap();
        assert_eq!(
            entry_hash(&IDS, b"", Some(&chain)).unwrap().to_hex(),
            "322b18e1f267202565bf0d1ee03865f076fd22357ff6dc46c7a6dfef454f3871"
        );
        assert_eq!(
            entry_hash(&IDS, b"Test Entry Content", Some(&chain))
                .unwrap()
                .to_hex(),
            "ed6d1ac92095db94be1f179d10a275e9468187ffde4eac91164b707793050f30"
        );
        // Omitting the chain ID derives the same one.
        assert_eq!(
            entry_hash(&IDS, b"Test Entry Content", None).unwrap(),
            entry_hash(&IDS, b"Test Entry Content", Some(&chain)).unwrap()
        );
    }

    #[test]
    fn test_entry_layout() {
        let chain = ChainId::from_bytes([0xab; 32]);
        let bytes = entry_bytes(&["a", "bc"], b"xyz", Some(&chain)).unwrap();

        assert_eq!(bytes[0], ENTRY_VERSION);
        assert_eq!(&bytes[1..33], &[0xab; 32]);
        // block: [00 07] [00 01 'a'] [00 02 'b' 'c']
        assert_eq!(&bytes[33..35], &[0x00, 0x07]);
        assert_eq!(&bytes[35..42], &[0x00, 0x01, b'a', 0x00, 0x02, b'b', b'c']);
        assert_eq!(&bytes[42..], b"xyz");
    }

    #[test]
    fn test_header_only_entry() {
        let chain = ChainId::from_bytes([0x01; 32]);
        let none: [&[u8]; 0] = [];
        let bytes = entry_bytes(&none, b"", Some(&chain)).unwrap();
        assert_eq!(bytes.len(), ENTRY_HEADER_LEN);
        assert_eq!(&bytes[33..], &[0x00, 0x00]);

        let hash = hash_entry_bytes(&bytes);
        let mut expected = sha512(&bytes).to_vec();
        expected.extend_from_slice(&bytes);
        assert_eq!(hash.0, sha256(&expected));
    }

    #[test]
    fn test_oversized_external_id_rejected() {
        let chain = ChainId::ZERO;
        let huge = vec![0u8; 0x10000];
        assert!(matches!(
            entry_bytes(&[huge], b"", Some(&chain)),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn test_entry_decode() {
        let entry = Entry::new(ChainId::from_bytes([7; 32]))
            .external_id("one")
            .external_id(vec![0u8, 1, 2])
            .content("body");
        let decoded = Entry::from_bytes(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_entry_decode_rejects_truncated() {
        let entry = Entry::new(ChainId::ZERO).external_id("abc");
        let bytes = entry.to_bytes().unwrap();
        assert!(Entry::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(Entry::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn test_from_hex_parts_null_slot() {
        let ids = vec![Some(hex::encode("a")), None];
        let result = Entry::from_hex_parts(CHAIN, Some(&ids), "");
        assert!(matches!(result, Err(CoreError::Assertion(_))));

        let absent = Entry::from_hex_parts(CHAIN, None, "00ff").unwrap();
        assert!(absent.external_ids.is_empty());
        assert_eq!(absent.content.as_ref(), &[0x00, 0xff]);
    }

    #[test]
    fn test_costs() {
        assert_eq!(entry_cost(ENTRY_HEADER_LEN).unwrap(), 1);
        assert_eq!(entry_cost(ENTRY_HEADER_LEN + 1).unwrap(), 1);
        assert_eq!(entry_cost(ENTRY_HEADER_LEN + 1024).unwrap(), 1);
        assert_eq!(entry_cost(ENTRY_HEADER_LEN + 1025).unwrap(), 2);
        assert_eq!(entry_cost(ENTRY_HEADER_LEN + MAX_ENTRY_PAYLOAD).unwrap(), 10);
        assert!(matches!(
            entry_cost(ENTRY_HEADER_LEN + MAX_ENTRY_PAYLOAD + 1),
            Err(CoreError::PayloadTooLarge { .. })
        ));
        assert_eq!(chain_cost(ENTRY_HEADER_LEN + 100).unwrap(), 11);
    }

    #[test]
    fn test_chain_requires_external_ids() {
        assert!(matches!(
            Chain::new(Entry::first().content("x")),
            Err(CoreError::Assertion(_))
        ));

        let chain = Chain::new(Entry::first().external_id(IDS[0]).external_id(IDS[1])).unwrap();
        assert_eq!(chain.id().to_hex(), CHAIN);
        assert_eq!(chain.resolved_first_entry().chain_id, Some(chain.id()));
    }

    #[test]
    fn test_chain_rejects_mismatched_chain_id() {
        let entry = Entry::new(ChainId::ZERO).external_id("a");
        assert!(Chain::new(entry).is_err());
    }
}
