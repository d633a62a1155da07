//! Value-transfer transactions.
//!
//! Wire layout:
//!
//! ```text
//! header:
//!   [version = 0x02][timestamp: 6]
//!   [input count: 1][value output count: 1][credit output count: 1]
//!   inputs, value outputs, credit outputs: [varint amount][address payload: 32]
//! signature block, one per input:
//!   [rcd type = 0x01][public key: 32][signature: 64]
//! ```
//!
//! Signatures cover the header only, so `id = sha256(header)` is the same
//! for every signed copy. `hash` covers the full bytes.

use std::collections::BTreeMap;
use std::fmt;

use crate::address::{rcd_hash, Address, AddressType, KeyRole, RCD_TYPE_1};
use crate::codec::{encode_varint, from_milli_timestamp, now_millis, to_milli_timestamp, Reader};
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::digest::{sha256, Sha256Hash};
use crate::error::{CoreError, Result};
use crate::signing::SigningProvider;
use crate::types::TxId;

/// Transaction format version.
pub const TRANSACTION_VERSION: u8 = 0x02;

/// Largest number of items in any one list (counts are a single byte).
pub const MAX_LIST_LEN: usize = u8::MAX as usize;

/// Type-1 redeem condition: ties a value address to the key allowed to
/// spend from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rcd {
    address: Address,
    hash: [u8; 32],
    public_key: Option<Ed25519PublicKey>,
}

impl Rcd {
    /// Build from a value address. A secret address also supplies the key.
    pub fn from_address(address: &Address) -> Result<Self> {
        if address.kind().role() != KeyRole::Value {
            return Err(CoreError::invalid_address(format!(
                "{} is not a value address",
                address.kind()
            )));
        }
        let public = address.to_public()?;
        Ok(Self {
            hash: public.payload(),
            public_key: address.public_key(),
            address: public,
        })
    }

    pub fn from_public_key(public_key: &Ed25519PublicKey) -> Self {
        let hash = rcd_hash(public_key);
        Self {
            address: Address::from_payload(&hash, AddressType::FactoidPublic),
            hash,
            public_key: Some(*public_key),
        }
    }

    /// Attach the public key. It must hash to this condition.
    pub fn with_public_key(mut self, public_key: Ed25519PublicKey) -> Result<Self> {
        if rcd_hash(&public_key) != self.hash {
            return Err(CoreError::assertion(format!(
                "public key {public_key:?} does not match the redeem condition of {}",
                self.address
            )));
        }
        self.public_key = Some(public_key);
        Ok(self)
    }

    /// The public value address (`FA...`).
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        self.public_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub amount: u64,
    pub rcd: Rcd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub amount: u64,
    pub address: Address,
}

/// Accumulates a transaction. Nothing is signed until [`seal`](Self::seal).
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    timestamp: i64,
    inputs: Vec<(Address, u64)>,
    outputs: Vec<(Address, u64)>,
    ec_outputs: Vec<(Address, u64)>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    /// Start a transaction stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: now_millis(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            ec_outputs: Vec::new(),
        }
    }

    /// Override the timestamp (Unix milliseconds).
    pub fn timestamp(mut self, millis: i64) -> Self {
        self.timestamp = millis;
        self
    }

    /// Debit `amount` from a value address (`FA` or `Fs`).
    pub fn input(mut self, address: Address, amount: u64) -> Self {
        self.inputs.push((address, amount));
        self
    }

    /// Credit `amount` to a public value address.
    pub fn output(mut self, address: Address, amount: u64) -> Self {
        self.outputs.push((address, amount));
        self
    }

    /// Spend `amount` buying credits for a public credit address.
    pub fn ec_output(mut self, address: Address, amount: u64) -> Self {
        self.ec_outputs.push((address, amount));
        self
    }

    /// Validate and produce a transaction with no signatures.
    pub fn seal_unsigned(self) -> Result<Transaction> {
        for (name, len) in [
            ("inputs", self.inputs.len()),
            ("outputs", self.outputs.len()),
            ("credit outputs", self.ec_outputs.len()),
        ] {
            if len > MAX_LIST_LEN {
                return Err(CoreError::Encoding(format!(
                    "{len} {name} exceeds the {MAX_LIST_LEN} item limit"
                )));
            }
        }

        let inputs = self
            .inputs
            .iter()
            .map(|(address, amount)| {
                Ok(TxInput {
                    amount: *amount,
                    rcd: Rcd::from_address(address)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let outputs = typed_outputs(self.outputs, AddressType::FactoidPublic)?;
        let ec_outputs = typed_outputs(self.ec_outputs, AddressType::EntryCreditPublic)?;

        // Fails early on an out-of-range timestamp.
        to_milli_timestamp(self.timestamp)?;

        Ok(Transaction {
            timestamp: self.timestamp,
            inputs,
            outputs,
            ec_outputs,
            signatures: BTreeMap::new(),
        })
    }

    /// Validate, compute the header once, and sign every input with the
    /// signer whose key matches its redeem condition.
    ///
    /// Fails with [`CoreError::Assertion`] if some input has no signer.
    pub async fn seal(self, signers: &[&dyn SigningProvider]) -> Result<Transaction> {
        let mut tx = self.seal_unsigned()?;
        let header = tx.header_bytes()?;

        let mut keys = Vec::with_capacity(signers.len());
        for signer in signers {
            let public_key = signer.public_key().await?;
            keys.push((rcd_hash(&public_key), public_key, *signer));
        }

        for (i, input) in tx.inputs.iter_mut().enumerate() {
            let (hash, public_key, signer) = keys
                .iter()
                .find(|(hash, _, _)| *hash == input.rcd.hash)
                .ok_or_else(|| {
                    CoreError::assertion(format!(
                        "no signer for input {i} ({})",
                        input.rcd.address
                    ))
                })?;

            input.rcd.public_key = Some(*public_key);
            if !tx.signatures.contains_key(hash) {
                let signature = signer.sign(&header).await?;
                tx.signatures.insert(*hash, signature);
            }
        }

        Ok(tx)
    }
}

fn typed_outputs(outputs: Vec<(Address, u64)>, kind: AddressType) -> Result<Vec<TxOutput>> {
    outputs
        .into_iter()
        .map(|(address, amount)| {
            if address.kind() != kind {
                return Err(CoreError::invalid_address(format!(
                    "output to {} must be a {kind} address",
                    address
                )));
            }
            Ok(TxOutput { amount, address })
        })
        .collect()
}

/// A sealed transaction. Immutable.
#[derive(Clone, PartialEq, Eq)]
pub struct Transaction {
    timestamp: i64,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    ec_outputs: Vec<TxOutput>,
    signatures: BTreeMap<[u8; 32], Ed25519Signature>,
}

impl Transaction {
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn ec_outputs(&self) -> &[TxOutput] {
        &self.ec_outputs
    }

    /// The signature recorded for a redeem condition, if any.
    pub fn signature(&self, rcd: &Rcd) -> Option<&Ed25519Signature> {
        self.signatures.get(&rcd.hash)
    }

    /// True only when every input has a key and a signature.
    pub fn is_signed(&self) -> bool {
        self.inputs.iter().all(|input| {
            input.rcd.public_key.is_some() && self.signatures.contains_key(&input.rcd.hash)
        })
    }

    /// The signed portion: version, timestamp, counts and every item.
    pub fn header_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.push(TRANSACTION_VERSION);
        buf.extend_from_slice(&to_milli_timestamp(self.timestamp)?);
        buf.push(count(self.inputs.len())?);
        buf.push(count(self.outputs.len())?);
        buf.push(count(self.ec_outputs.len())?);

        for input in &self.inputs {
            buf.extend_from_slice(&encode_varint(input.amount));
            buf.extend_from_slice(&input.rcd.hash);
        }
        for output in self.outputs.iter().chain(&self.ec_outputs) {
            buf.extend_from_slice(&encode_varint(output.amount));
            buf.extend_from_slice(&output.address.payload());
        }
        Ok(buf)
    }

    /// One `[rcd type][public key][signature]` record per input, in input
    /// order.
    pub fn signature_block_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.inputs.len() * (1 + 32 + 64));
        for (i, input) in self.inputs.iter().enumerate() {
            let missing = || {
                CoreError::assertion(format!(
                    "input {i} ({}) is not signed",
                    input.rcd.address
                ))
            };
            let public_key = input.rcd.public_key.ok_or_else(missing)?;
            let signature = self.signatures.get(&input.rcd.hash).ok_or_else(missing)?;

            buf.push(RCD_TYPE_1);
            buf.extend_from_slice(public_key.as_bytes());
            buf.extend_from_slice(signature.as_bytes());
        }
        Ok(buf)
    }

    /// Header followed by the signature block.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = self.header_bytes()?;
        buf.extend_from_slice(&self.signature_block_bytes()?);
        Ok(buf)
    }

    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// `sha256(header)`: stable across independently signed copies.
    pub fn id(&self) -> Result<TxId> {
        Ok(TxId(sha256(&self.header_bytes()?)))
    }

    /// `sha256(header || signature block)`.
    pub fn hash(&self) -> Result<Sha256Hash> {
        Ok(Sha256Hash::hash(&self.to_bytes()?))
    }

    /// Check every input's key against its redeem condition and its
    /// signature against the header.
    pub fn verify_signatures(&self) -> Result<()> {
        let header = self.header_bytes()?;
        for (i, input) in self.inputs.iter().enumerate() {
            let public_key = input
                .rcd
                .public_key
                .ok_or_else(|| CoreError::assertion(format!("input {i} has no public key")))?;
            if rcd_hash(&public_key) != input.rcd.hash {
                return Err(CoreError::InvalidPublicKey);
            }
            let signature = self
                .signatures
                .get(&input.rcd.hash)
                .ok_or(CoreError::InvalidSignature)?;
            public_key.verify(&header, signature)?;
        }
        Ok(())
    }

    pub fn total_inputs(&self) -> u64 {
        self.inputs
            .iter()
            .fold(0u64, |acc, input| acc.saturating_add(input.amount))
    }

    /// Value plus credit outputs.
    pub fn total_outputs(&self) -> u64 {
        self.outputs
            .iter()
            .chain(&self.ec_outputs)
            .fold(0u64, |acc, output| acc.saturating_add(output.amount))
    }

    /// Decode a transaction, signed or not.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);

        let version = r.u8()?;
        if version != TRANSACTION_VERSION {
            return Err(CoreError::Decoding(format!(
                "unsupported transaction version {version}"
            )));
        }
        let timestamp = from_milli_timestamp(&r.array::<6>()?);
        let input_count = r.u8()? as usize;
        let output_count = r.u8()? as usize;
        let ec_output_count = r.u8()? as usize;

        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let amount = r.varint()?;
            let hash = r.array::<32>()?;
            inputs.push(TxInput {
                amount,
                rcd: Rcd {
                    address: Address::from_payload(&hash, AddressType::FactoidPublic),
                    hash,
                    public_key: None,
                },
            });
        }
        let outputs = read_outputs(&mut r, output_count, AddressType::FactoidPublic)?;
        let ec_outputs = read_outputs(&mut r, ec_output_count, AddressType::EntryCreditPublic)?;

        let mut signatures = BTreeMap::new();
        if r.remaining() > 0 {
            for input in &mut inputs {
                let rcd_type = r.u8()?;
                if rcd_type != RCD_TYPE_1 {
                    return Err(CoreError::Decoding(format!(
                        "unsupported rcd type {rcd_type}"
                    )));
                }
                let public_key = Ed25519PublicKey(r.array::<32>()?);
                let signature = Ed25519Signature(r.array::<64>()?);
                input.rcd = input.rcd.clone().with_public_key(public_key)?;
                signatures.insert(input.rcd.hash, signature);
            }
        }
        if r.remaining() > 0 {
            return Err(CoreError::Decoding(format!(
                "{} trailing bytes after transaction",
                r.remaining()
            )));
        }

        Ok(Self {
            timestamp,
            inputs,
            outputs,
            ec_outputs,
            signatures,
        })
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("timestamp", &self.timestamp)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("ec_outputs", &self.ec_outputs.len())
            .field("signed", &self.is_signed())
            .finish()
    }
}

fn count(len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| CoreError::Encoding(format!("{len} items do not fit a count byte")))
}

fn read_outputs(r: &mut Reader<'_>, n: usize, kind: AddressType) -> Result<Vec<TxOutput>> {
    let mut outputs = Vec::with_capacity(n);
    for _ in 0..n {
        let amount = r.varint()?;
        let payload = r.array::<32>()?;
        outputs.push(TxOutput {
            amount,
            address: Address::from_payload(&payload, kind),
        });
    }
    Ok(outputs)
}
