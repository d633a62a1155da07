//! Human-readable, checksummed ledger addresses.
//!
//! An address is `base58(prefix || payload || checksum)` where `payload` is
//! 32 bytes and `checksum` is the first 4 bytes of
//! `sha256d(prefix || payload)`. The prefix bytes are chosen so that the
//! Base58 form starts with a fixed human-readable prefix (`FA`, `Es`,
//! `idpub`, `sk1`, ...).
//!
//! Payload by type:
//! - value public (`FA`) and identity level keys (`id1`..`id4`): the hash of
//!   the type-1 redeem condition, `sha256d(0x01 || public_key)`
//! - credit public (`EC`) and `idpub`: the raw public key
//! - every secret type: the raw 32-byte Ed25519 seed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{secret_to_public_key, Ed25519PublicKey};
use crate::digest::double_sha256;
use crate::error::{CoreError, Result};

/// Size of an address payload (key, seed, or key hash).
pub const PAYLOAD_LEN: usize = 32;

/// Size of the trailing checksum.
pub const CHECKSUM_LEN: usize = 4;

/// Decoded byte lengths accepted for any address (2, 3 and 5 byte prefixes).
pub const ACCEPTED_LENGTHS: [usize; 3] = [38, 39, 41];

/// Redeem condition type byte for a single Ed25519 key.
pub const RCD_TYPE_1: u8 = 0x01;

/// Hash of the type-1 redeem condition for a public key.
pub fn rcd_hash(public_key: &Ed25519PublicKey) -> [u8; 32] {
    let mut rcd = [0u8; 33];
    rcd[0] = RCD_TYPE_1;
    rcd[1..].copy_from_slice(public_key.as_bytes());
    double_sha256(&rcd)
}

/// Whether an address may be shared or must be kept private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Secret,
}

/// What the key behind an address is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Holds transferable value (factoids).
    Value,
    /// Pays for commits (entry credits).
    Credit,
    /// Signs on behalf of an identity.
    Identity,
}

/// The address type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    FactoidPublic,
    FactoidSecret,
    EntryCreditPublic,
    EntryCreditSecret,
    IdentityPublic,
    IdentitySecret,
    IdentityKey1Public,
    IdentityKey2Public,
    IdentityKey3Public,
    IdentityKey4Public,
    IdentityKey1Secret,
    IdentityKey2Secret,
    IdentityKey3Secret,
    IdentityKey4Secret,
}

impl AddressType {
    pub const ALL: [AddressType; 14] = [
        AddressType::FactoidPublic,
        AddressType::FactoidSecret,
        AddressType::EntryCreditPublic,
        AddressType::EntryCreditSecret,
        AddressType::IdentityPublic,
        AddressType::IdentitySecret,
        AddressType::IdentityKey1Public,
        AddressType::IdentityKey2Public,
        AddressType::IdentityKey3Public,
        AddressType::IdentityKey4Public,
        AddressType::IdentityKey1Secret,
        AddressType::IdentityKey2Secret,
        AddressType::IdentityKey3Secret,
        AddressType::IdentityKey4Secret,
    ];

    /// The leading characters of every address of this type.
    pub fn human_prefix(self) -> &'static str {
        match self {
            AddressType::FactoidPublic => "FA",
            AddressType::FactoidSecret => "Fs",
            AddressType::EntryCreditPublic => "EC",
            AddressType::EntryCreditSecret => "Es",
            AddressType::IdentityPublic => "idpub",
            AddressType::IdentitySecret => "idsec",
            AddressType::IdentityKey1Public => "id1",
            AddressType::IdentityKey2Public => "id2",
            AddressType::IdentityKey3Public => "id3",
            AddressType::IdentityKey4Public => "id4",
            AddressType::IdentityKey1Secret => "sk1",
            AddressType::IdentityKey2Secret => "sk2",
            AddressType::IdentityKey3Secret => "sk3",
            AddressType::IdentityKey4Secret => "sk4",
        }
    }

    /// The raw prefix prepended to the payload before Base58 encoding.
    pub fn prefix_bytes(self) -> &'static [u8] {
        match self {
            AddressType::FactoidPublic => &[0x5f, 0xb1],
            AddressType::FactoidSecret => &[0x64, 0x78],
            AddressType::EntryCreditPublic => &[0x59, 0x2a],
            AddressType::EntryCreditSecret => &[0x5d, 0xb6],
            AddressType::IdentityPublic => &[0x03, 0x45, 0xef, 0x9d, 0xe0],
            AddressType::IdentitySecret => &[0x03, 0x45, 0xf3, 0xd0, 0xd6],
            AddressType::IdentityKey1Public => &[0x3f, 0xbe, 0xba],
            AddressType::IdentityKey2Public => &[0x3f, 0xbe, 0xd8],
            AddressType::IdentityKey3Public => &[0x3f, 0xbe, 0xf6],
            AddressType::IdentityKey4Public => &[0x3f, 0xbf, 0x14],
            AddressType::IdentityKey1Secret => &[0x4d, 0xb6, 0xc9],
            AddressType::IdentityKey2Secret => &[0x4d, 0xb6, 0xe7],
            AddressType::IdentityKey3Secret => &[0x4d, 0xb7, 0x05],
            AddressType::IdentityKey4Secret => &[0x4d, 0xb7, 0x23],
        }
    }

    pub fn visibility(self) -> Visibility {
        match self {
            AddressType::FactoidSecret
            | AddressType::EntryCreditSecret
            | AddressType::IdentitySecret
            | AddressType::IdentityKey1Secret
            | AddressType::IdentityKey2Secret
            | AddressType::IdentityKey3Secret
            | AddressType::IdentityKey4Secret => Visibility::Secret,
            _ => Visibility::Public,
        }
    }

    pub fn role(self) -> KeyRole {
        match self {
            AddressType::FactoidPublic | AddressType::FactoidSecret => KeyRole::Value,
            AddressType::EntryCreditPublic | AddressType::EntryCreditSecret => KeyRole::Credit,
            _ => KeyRole::Identity,
        }
    }

    /// Length of the decoded address: prefix, payload, checksum.
    pub fn decoded_len(self) -> usize {
        self.prefix_bytes().len() + PAYLOAD_LEN + CHECKSUM_LEN
    }

    /// The type on the other side of the public/secret pair.
    pub fn counterpart(self) -> AddressType {
        match self {
            AddressType::FactoidPublic => AddressType::FactoidSecret,
            AddressType::FactoidSecret => AddressType::FactoidPublic,
            AddressType::EntryCreditPublic => AddressType::EntryCreditSecret,
            AddressType::EntryCreditSecret => AddressType::EntryCreditPublic,
            AddressType::IdentityPublic => AddressType::IdentitySecret,
            AddressType::IdentitySecret => AddressType::IdentityPublic,
            AddressType::IdentityKey1Public => AddressType::IdentityKey1Secret,
            AddressType::IdentityKey2Public => AddressType::IdentityKey2Secret,
            AddressType::IdentityKey3Public => AddressType::IdentityKey3Secret,
            AddressType::IdentityKey4Public => AddressType::IdentityKey4Secret,
            AddressType::IdentityKey1Secret => AddressType::IdentityKey1Public,
            AddressType::IdentityKey2Secret => AddressType::IdentityKey2Public,
            AddressType::IdentityKey3Secret => AddressType::IdentityKey3Public,
            AddressType::IdentityKey4Secret => AddressType::IdentityKey4Public,
        }
    }

    /// True if the public payload is an RCD hash rather than the key itself.
    pub fn payload_is_rcd_hash(self) -> bool {
        matches!(
            self,
            AddressType::FactoidPublic
                | AddressType::IdentityKey1Public
                | AddressType::IdentityKey2Public
                | AddressType::IdentityKey3Public
                | AddressType::IdentityKey4Public
        )
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.human_prefix())
    }
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(body);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode a 32-byte payload as an address of the given type.
pub fn encode(payload: &[u8; 32], kind: AddressType) -> String {
    let mut body = Vec::with_capacity(kind.decoded_len());
    body.extend_from_slice(kind.prefix_bytes());
    body.extend_from_slice(payload);
    let sum = checksum(&body);
    body.extend_from_slice(&sum);
    bs58::encode(body).into_string()
}

/// Base58-decode and fully validate an address, returning the decoded bytes
/// (prefix, payload and checksum).
pub fn decode(address: &str) -> Result<Vec<u8>> {
    decode_typed(address).map(|(_, bytes)| bytes)
}

/// The type of a valid address.
pub fn address_type(address: &str) -> Result<AddressType> {
    decode_typed(address).map(|(kind, _)| kind)
}

fn decode_typed(address: &str) -> Result<(AddressType, Vec<u8>)> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| CoreError::invalid_address(format!("invalid base58: {e}")))?;

    if !ACCEPTED_LENGTHS.contains(&bytes.len()) {
        return Err(CoreError::invalid_address(format!(
            "decoded length {} is not one of {:?}",
            bytes.len(),
            ACCEPTED_LENGTHS
        )));
    }

    let kind = AddressType::ALL
        .into_iter()
        .find(|kind| {
            kind.decoded_len() == bytes.len()
                && address.starts_with(kind.human_prefix())
                && bytes.starts_with(kind.prefix_bytes())
        })
        .ok_or_else(|| CoreError::invalid_address("unknown address prefix"))?;

    let (body, sum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(body) != sum {
        return Err(CoreError::invalid_address("checksum mismatch"));
    }

    Ok((kind, bytes))
}

/// A validated address string and its type.
///
/// Addresses are immutable and compared by value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    value: String,
    kind: AddressType,
    payload: [u8; 32],
}

impl Address {
    /// Parse and validate an address string.
    pub fn parse(address: &str) -> Result<Self> {
        Self::try_from(address.to_string())
    }

    /// Parse an address and require a specific type.
    pub fn parse_as(address: &str, expected: AddressType) -> Result<Self> {
        let parsed = Self::parse(address)?;
        if parsed.kind != expected {
            return Err(CoreError::invalid_address(format!(
                "expected a {} address, got {}",
                expected, parsed.kind
            )));
        }
        Ok(parsed)
    }

    /// Build an address from its 32-byte payload.
    pub fn from_payload(payload: &[u8; 32], kind: AddressType) -> Self {
        Self {
            value: encode(payload, kind),
            kind,
            payload: *payload,
        }
    }

    /// The public address that corresponds to a public key.
    pub fn from_public_key(public_key: &Ed25519PublicKey, kind: AddressType) -> Result<Self> {
        if kind.visibility() != Visibility::Public {
            return Err(CoreError::assertion(format!(
                "{kind} is not a public address type"
            )));
        }
        let payload = if kind.payload_is_rcd_hash() {
            rcd_hash(public_key)
        } else {
            *public_key.as_bytes()
        };
        Ok(Self::from_payload(&payload, kind))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> AddressType {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.kind.visibility()
    }

    /// The 32-byte payload (seed, public key, or RCD hash depending on type).
    pub fn payload(&self) -> [u8; 32] {
        self.payload
    }

    /// The public key, for secret addresses and public types that carry
    /// the key directly. `None` for RCD-hash addresses.
    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        match self.visibility() {
            Visibility::Secret => Some(secret_to_public_key(&self.payload())),
            Visibility::Public if self.kind.payload_is_rcd_hash() => None,
            Visibility::Public => Some(Ed25519PublicKey(self.payload())),
        }
    }

    /// The public address paired with this one. Public addresses map to
    /// themselves.
    pub fn to_public(&self) -> Result<Self> {
        match self.visibility() {
            Visibility::Public => Ok(self.clone()),
            Visibility::Secret => {
                let public_key = secret_to_public_key(&self.payload());
                Self::from_public_key(&public_key, self.kind.counterpart())
            }
        }
    }

    /// The redeem-condition hash this address stands for, if it has one.
    pub fn rcd_hash(&self) -> Option<[u8; 32]> {
        match self.visibility() {
            Visibility::Public if self.kind.payload_is_rcd_hash() => Some(self.payload()),
            _ => self.public_key().map(|pk| rcd_hash(&pk)),
        }
    }
}

/// Fail with an assertion error unless the address has the wanted visibility.
pub fn assert_visibility(address: &Address, wanted: Visibility) -> Result<()> {
    if address.visibility() != wanted {
        return Err(CoreError::assertion(format!(
            "address of type {} is {:?}, expected {:?}",
            address.kind(),
            address.visibility(),
            wanted
        )));
    }
    Ok(())
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.visibility() {
            Visibility::Public => write!(f, "Address({})", self.value),
            Visibility::Secret => write!(f, "Address({}...)", self.kind.human_prefix()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        let (kind, bytes) = decode_typed(&value)?;
        let start = kind.prefix_bytes().len();
        let mut payload = [0u8; 32];
        payload.copy_from_slice(&bytes[start..start + PAYLOAD_LEN]);
        Ok(Self {
            value,
            kind,
            payload,
        })
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: &str = "Fs3E9gV6DXsYzf7Fqx1fVBQPQXV695eP3k5XbmHEZVRLkMdD9qCK";
    const FA: &str = "FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q";
    const ES: &str = "Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG";
    const EC: &str = "EC2DKSYyRcNWf7RS963VFYgMExoHRYLHVeCfQ9PGPmNzwrcmgm2r";

    #[test]
    fn test_known_factoid_pair() {
        let secret = Address::parse(FS).unwrap();
        assert_eq!(secret.kind(), AddressType::FactoidSecret);
        assert_eq!(secret.to_public().unwrap().as_str(), FA);
    }

    #[test]
    fn test_known_entry_credit_pair() {
        let secret = Address::parse(ES).unwrap();
        assert_eq!(secret.payload(), [0u8; 32]);
        let public = secret.to_public().unwrap();
        assert_eq!(public.as_str(), EC);
        assert_eq!(public.public_key(), secret.public_key());
    }

    #[test]
    fn test_every_type_roundtrips_with_its_prefix() {
        let payload: [u8; 32] = core::array::from_fn(|i| i as u8);
        for kind in AddressType::ALL {
            let encoded = encode(&payload, kind);
            assert!(
                encoded.starts_with(kind.human_prefix()),
                "{encoded} should start with {}",
                kind.human_prefix()
            );
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded.len(), kind.decoded_len());
            assert_eq!(&decoded[kind.prefix_bytes().len()..][..32], &payload);
            assert_eq!(address_type(&encoded).unwrap(), kind);
        }
    }

    #[test]
    fn test_tampered_checksum_rejected() {
        let mut bytes = bs58::decode(FA).into_vec().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = bs58::encode(bytes).into_string();
        assert!(matches!(
            decode(&tampered),
            Err(CoreError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("not base58 0OIl").is_err());
        // valid base58, wrong length
        assert!(Address::parse("FA2jK2HcLnRdS94d").is_err());
    }

    #[test]
    fn test_visibility() {
        let secret = Address::parse(FS).unwrap();
        let public = Address::parse(FA).unwrap();
        assert!(assert_visibility(&secret, Visibility::Secret).is_ok());
        assert!(assert_visibility(&public, Visibility::Public).is_ok());
        assert!(matches!(
            assert_visibility(&public, Visibility::Secret),
            Err(CoreError::Assertion(_))
        ));
    }

    #[test]
    fn test_parse_as() {
        assert!(Address::parse_as(EC, AddressType::EntryCreditPublic).is_ok());
        assert!(Address::parse_as(EC, AddressType::FactoidPublic).is_err());
    }

    #[test]
    fn test_factoid_public_has_no_key_but_has_rcd_hash() {
        let secret = Address::parse(FS).unwrap();
        let public = Address::parse(FA).unwrap();
        assert!(public.public_key().is_none());
        assert_eq!(public.rcd_hash(), secret.rcd_hash());
    }

    #[test]
    fn test_identity_pairs() {
        let seed = [0x11u8; 32];
        for kind in AddressType::ALL
            .into_iter()
            .filter(|k| k.role() == KeyRole::Identity && k.visibility() == Visibility::Secret)
        {
            let secret = Address::from_payload(&seed, kind);
            let public = secret.to_public().unwrap();
            assert_eq!(public.kind(), kind.counterpart());
            assert_eq!(public.visibility(), Visibility::Public);
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Address::parse(FS).unwrap();
        assert_eq!(format!("{secret:?}"), "Address(Fs...)");
    }

    #[test]
    fn test_string_conversions() {
        let address: Address = FA.parse().unwrap();
        assert_eq!(address.to_string(), FA);
        assert_eq!(String::from(address.clone()), FA);
        assert_eq!(Address::try_from(FA.to_string()).unwrap(), address);
    }
}
