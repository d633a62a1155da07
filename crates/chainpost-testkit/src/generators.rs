//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use chainpost_core::{Address, AddressType, Chain, ChainId, Entry, Keypair};

/// A random 32-byte seed.
pub fn seed() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

pub fn keypair() -> impl Strategy<Value = Keypair> {
    seed().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn chain_id() -> impl Strategy<Value = ChainId> {
    any::<[u8; 32]>().prop_map(ChainId::from_bytes)
}

/// Any of the fourteen address types.
pub fn address_type() -> impl Strategy<Value = AddressType> {
    prop::sample::select(AddressType::ALL.to_vec())
}

/// A secret address of any type.
pub fn secret_address() -> impl Strategy<Value = Address> {
    let secrets: Vec<AddressType> = AddressType::ALL
        .into_iter()
        .filter(|t| t.visibility() == chainpost_core::Visibility::Secret)
        .collect();
    (seed(), prop::sample::select(secrets))
        .prop_map(|(seed, kind)| Address::from_payload(&seed, kind))
}

/// A credit (`Es`) secret address.
pub fn credit_secret() -> impl Strategy<Value = Address> {
    seed().prop_map(|seed| Address::from_payload(&seed, AddressType::EntryCreditSecret))
}

/// Opaque bytes up to `max_len` long.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Up to `max_count` external IDs of at most 64 bytes each.
pub fn external_ids(max_count: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload(64), 0..=max_count)
}

/// Parameters for an entry that always fits the payload limit.
#[derive(Debug, Clone)]
pub struct EntryParams {
    pub chain_id: Option<ChainId>,
    pub external_ids: Vec<Vec<u8>>,
    pub content: Vec<u8>,
}

impl Arbitrary for EntryParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::option::of(chain_id()),
            external_ids(8),
            payload(4096),
        )
            .prop_map(|(chain_id, external_ids, content)| EntryParams {
                chain_id,
                external_ids,
                content,
            })
            .boxed()
    }
}

/// Build the entry described by `params`.
pub fn entry_from_params(params: &EntryParams) -> Entry {
    Entry {
        chain_id: params.chain_id,
        external_ids: params
            .external_ids
            .iter()
            .map(|id| Bytes::copy_from_slice(id))
            .collect(),
        content: Bytes::copy_from_slice(&params.content),
    }
}

/// A valid chain: at least one external ID, chain ID left to derivation.
pub fn chain() -> impl Strategy<Value = Chain> {
    (
        prop::collection::vec(payload(64), 1..=4),
        payload(1024),
    )
        .prop_filter_map("chain rejected", |(ids, content)| {
            let entry = ids
                .into_iter()
                .fold(Entry::first(), |e, id| e.external_id(id))
                .content(content);
            Chain::new(entry).ok()
        })
}
