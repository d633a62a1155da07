//! Test fixtures and helpers.
//!
//! Common setup for integration tests: an in-memory ledger and wallet plus
//! funded-looking keys.

use std::sync::Arc;

use chainpost_core::{Address, AddressType, Chain, Entry, LocalSigner};
use chainpost_rpc::{MemoryLedger, MemoryWallet};

use crate::vectors::{CREDIT_SECRET, FACTOID_SECRET};

/// A credit signer, a value signer, and the services that know them.
pub struct TestFixture {
    pub ledger: Arc<MemoryLedger>,
    /// Holds both secret keys.
    pub wallet: Arc<MemoryWallet>,
    pub credit: Arc<LocalSigner>,
    pub factoid: Arc<LocalSigner>,
}

impl TestFixture {
    /// A fixture using the golden-vector keys.
    pub fn new() -> Self {
        Self::from_secrets(CREDIT_SECRET, FACTOID_SECRET)
    }

    /// A fixture with keys derived from `seed`.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let mut fct_seed = seed;
        fct_seed[31] ^= 0xff;
        let credit = Address::from_payload(&seed, AddressType::EntryCreditSecret);
        let factoid = Address::from_payload(&fct_seed, AddressType::FactoidSecret);
        Self::from_secrets(credit.as_str(), factoid.as_str())
    }

    /// A fixture with fresh random keys.
    pub fn random() -> Self {
        Self::with_seed(rand::random())
    }

    fn from_secrets(credit: &str, factoid: &str) -> Self {
        let wallet = MemoryWallet::new()
            .with_key(credit)
            .and_then(|w| w.with_key(factoid))
            .expect("fixture keys are valid secret addresses");
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            wallet: Arc::new(wallet),
            credit: Arc::new(LocalSigner::from_secret(credit).expect("valid credit secret")),
            factoid: Arc::new(LocalSigner::from_secret(factoid).expect("valid factoid secret")),
        }
    }

    /// Public address that pays for commits.
    pub fn credit_address(&self) -> Address {
        self.credit.address().clone()
    }

    /// Public address that funds transactions.
    pub fn factoid_address(&self) -> Address {
        self.factoid.address().clone()
    }

    /// A chain named `name` with `content` in its first entry.
    pub fn make_chain(&self, name: &str, content: &[u8]) -> Chain {
        Chain::new(
            Entry::first()
                .external_id(name.as_bytes().to_vec())
                .content(content.to_vec()),
        )
        .expect("one external id is enough for a chain")
    }

    /// Create `chain` on the ledger directly, skipping commit and reveal.
    pub fn seed_chain(&self, chain: &Chain) {
        self.ledger.insert_chain(chain);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
