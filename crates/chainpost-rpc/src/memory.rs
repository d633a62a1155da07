//! In-memory ledger and wallet.
//!
//! [`MemoryLedger`] checks commits the way a node does (signature, chain
//! binding, credits paid) and keeps chains in a map. Every call is recorded,
//! and failures, acknowledgment progress and echoed hashes can be scripted.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chainpost_core::codec::now_millis;
use chainpost_core::commit::{CHAIN_COMMIT_SIGNED_LEN, ENTRY_COMMIT_SIGNED_LEN};
use chainpost_core::entry::hash_entry_bytes;
use chainpost_core::{
    chain_cost, compose_chain, compose_entry, entry_cost, sha256, Address, Chain, ChainId,
    CoreError, Entry, EntryHash, LocalSigner, ParsedCommit, SigningProvider, Transaction, TxId,
};

use crate::error::code::{INVALID_PARAMS, MISSING_CHAIN_HEAD, OBJECT_NOT_FOUND, REPEATED_COMMIT};
use crate::error::{Result, RpcError};
use crate::ledger::{method as ledger_method, LedgerRpc};
use crate::types::{
    AckResponse, AckStatus, AckTarget, ChainHead, CommitChainResponse, CommitEntryResponse,
    ComposedMessages, EntryData, FactoidSubmitResponse, RevealResponse, RpcResponse,
    SignDataResponse, WalletAddress,
};
use crate::wallet::WalletRpc;

/// A scripted failure for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Http(u16),
    Rpc { code: i64, message: String },
    Transport(String),
}

impl Failure {
    fn respond<T>(self) -> Result<RpcResponse<T>> {
        match self {
            Failure::Http(status) => Ok(RpcResponse::http(status)),
            Failure::Rpc { code, message } => Ok(RpcResponse::error(code, message)),
            Failure::Transport(msg) => Err(RpcError::Transport(msg)),
        }
    }
}

/// Call log and scripted failures, keyed by method.
#[derive(Debug)]
struct Recorder<M> {
    log: Vec<M>,
    failures: HashMap<M, Failure>,
}

impl<M> Default for Recorder<M> {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            failures: HashMap::new(),
        }
    }
}

impl<M: Copy + Eq + Hash> Recorder<M> {
    /// Log a call and return its scripted failure, if any.
    fn record(&mut self, method: M) -> Option<Failure> {
        self.log.push(method);
        self.failures.get(&method).cloned()
    }

    fn calls(&self, method: M) -> usize {
        self.log.iter().filter(|m| **m == method).count()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid<T>(message: impl std::fmt::Display) -> RpcResponse<T> {
    tracing::debug!(%message, "memory ledger rejected call");
    RpcResponse::error(INVALID_PARAMS, message.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerMethod {
    CommitChain,
    CommitEntry,
    RevealChain,
    RevealEntry,
    Ack,
    AllEntries,
    ChainHead,
    FactoidSubmit,
}

#[derive(Debug)]
struct LedgerState {
    recorder: Recorder<LedgerMethod>,
    commits: HashMap<EntryHash, ParsedCommit>,
    revealed: HashSet<EntryHash>,
    chains: HashMap<ChainId, Vec<Entry>>,
    transactions: HashMap<TxId, Transaction>,
    ack_script: VecDeque<AckStatus>,
    settled: AckStatus,
    commit_echo: Option<EntryHash>,
    reveal_echo: Option<EntryHash>,
}

impl LedgerState {
    fn commit(&self, message: &str, chain: bool) -> std::result::Result<(ParsedCommit, TxId), String> {
        let bytes = hex::decode(message).map_err(|e| format!("commit is not hex: {e}"))?;
        let parsed = ParsedCommit::parse(&bytes).map_err(|e| e.to_string())?;
        if parsed.is_chain() != chain {
            return Err(if chain {
                "expected a chain commit".into()
            } else {
                "expected an entry commit".into()
            });
        }
        let signed_len = if chain {
            CHAIN_COMMIT_SIGNED_LEN
        } else {
            ENTRY_COMMIT_SIGNED_LEN
        };
        let tx_id = TxId(sha256(&bytes[..signed_len]));
        Ok((parsed, tx_id))
    }

    fn commit_chain(&mut self, message: &str) -> RpcResponse<CommitChainResponse> {
        let (parsed, tx_id) = match self.commit(message, true) {
            Ok(c) => c,
            Err(e) => return invalid(e),
        };
        if self.commits.contains_key(&parsed.entry_hash) {
            return RpcResponse::error(REPEATED_COMMIT, "Repeated Commit");
        }
        let chain_id_hash = parsed.chain.map(|(hash, _)| hex::encode(hash));
        let entry_hash = self.commit_echo.unwrap_or(parsed.entry_hash);
        self.commits.insert(parsed.entry_hash, parsed);
        RpcResponse::ok(CommitChainResponse {
            message: "Chain Commit Success".into(),
            tx_id,
            entry_hash,
            chain_id_hash,
        })
    }

    fn commit_entry(&mut self, message: &str) -> RpcResponse<CommitEntryResponse> {
        let (parsed, tx_id) = match self.commit(message, false) {
            Ok(c) => c,
            Err(e) => return invalid(e),
        };
        if self.commits.contains_key(&parsed.entry_hash) {
            return RpcResponse::error(REPEATED_COMMIT, "Repeated Commit");
        }
        let entry_hash = self.commit_echo.unwrap_or(parsed.entry_hash);
        self.commits.insert(parsed.entry_hash, parsed);
        RpcResponse::ok(CommitEntryResponse {
            message: "Entry Commit Success".into(),
            tx_id,
            entry_hash,
        })
    }

    fn reveal(&mut self, entry_hex: &str, chain: bool) -> RpcResponse<RevealResponse> {
        let bytes = match hex::decode(entry_hex) {
            Ok(b) => b,
            Err(e) => return invalid(format!("entry is not hex: {e}")),
        };
        let entry = match Entry::from_bytes(&bytes) {
            Ok(e) => e,
            Err(e) => return invalid(e),
        };
        let entry_hash = hash_entry_bytes(&bytes);
        let chain_id = entry.resolved_chain_id();

        let Some(commit) = self.commits.get(&entry_hash) else {
            return RpcResponse::error(OBJECT_NOT_FOUND, "Receipt creation error: no commit");
        };
        let required = if chain {
            chain_cost(bytes.len())
        } else {
            entry_cost(bytes.len())
        };
        match required {
            Ok(cost) if commit.cost >= cost => {}
            Ok(cost) => {
                return invalid(format!("commit paid {} credits, {cost} needed", commit.cost))
            }
            Err(e) => return invalid(e),
        }

        if chain {
            if !commit.commits_to_chain(&chain_id) {
                return invalid("commit does not match the chain");
            }
            if self.chains.contains_key(&chain_id) {
                return invalid(format!("chain {chain_id} already exists"));
            }
            self.chains.insert(chain_id, vec![entry]);
        } else {
            if commit.is_chain() {
                return invalid("a chain commit cannot reveal an entry");
            }
            match self.chains.get_mut(&chain_id) {
                Some(entries) => entries.push(entry),
                None => return RpcResponse::error(MISSING_CHAIN_HEAD, "Missing Chain Head"),
            }
        }
        self.revealed.insert(entry_hash);

        RpcResponse::ok(RevealResponse {
            message: "Entry Reveal Success".into(),
            entry_hash: self.reveal_echo.unwrap_or(entry_hash),
            chain_id,
        })
    }

    fn ack(&mut self, target: &AckTarget) -> RpcResponse<AckResponse> {
        let known = match target {
            AckTarget::Entry { entry_hash, .. } => {
                self.revealed.contains(entry_hash) || self.commits.contains_key(entry_hash)
            }
            AckTarget::Transaction(tx_id) => self.transactions.contains_key(tx_id),
        };
        let status = match self.ack_script.pop_front() {
            Some(status) => status,
            None if known => self.settled,
            None => AckStatus::Unknown,
        };
        RpcResponse::ok(match target {
            AckTarget::Entry { entry_hash, .. } => AckResponse::entry(*entry_hash, status),
            AckTarget::Transaction(tx_id) => AckResponse::transaction(*tx_id, status),
        })
    }

    fn factoid_submit(&mut self, transaction: &str) -> RpcResponse<FactoidSubmitResponse> {
        let parsed = hex::decode(transaction)
            .map_err(|e| CoreError::Decoding(e.to_string()))
            .and_then(|bytes| Transaction::from_bytes(&bytes))
            .and_then(|tx| {
                tx.verify_signatures()?;
                Ok((tx.id()?, tx))
            });
        match parsed {
            Ok((tx_id, tx)) => {
                self.transactions.insert(tx_id, tx);
                RpcResponse::ok(FactoidSubmitResponse {
                    message: "Successfully submitted the transaction".into(),
                    tx_id,
                })
            }
            Err(e) => invalid(e),
        }
    }
}

/// An in-memory ledger node.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// A ledger whose acks reach `DBlockConfirmed` immediately.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                recorder: Recorder::default(),
                commits: HashMap::new(),
                revealed: HashSet::new(),
                chains: HashMap::new(),
                transactions: HashMap::new(),
                ack_script: VecDeque::new(),
                settled: AckStatus::DBlockConfirmed,
                commit_echo: None,
                reveal_echo: None,
            }),
        }
    }

    /// Make every call to `method` fail until cleared.
    pub fn fail(&self, method: LedgerMethod, failure: Failure) {
        lock(&self.state).recorder.failures.insert(method, failure);
    }

    pub fn clear_failure(&self, method: LedgerMethod) {
        lock(&self.state).recorder.failures.remove(&method);
    }

    /// Queue statuses for the next acknowledgment polls, in order.
    pub fn script_acks(&self, statuses: impl IntoIterator<Item = AckStatus>) {
        lock(&self.state).ack_script.extend(statuses);
    }

    /// Status reported for known hashes once the script runs out.
    pub fn settle_at(&self, status: AckStatus) {
        lock(&self.state).settled = status;
    }

    /// Report `hash` as the entry hash of every commit, whatever was
    /// committed.
    pub fn echo_commit_hash(&self, hash: EntryHash) {
        lock(&self.state).commit_echo = Some(hash);
    }

    /// Report `hash` as the entry hash of every reveal.
    pub fn echo_reveal_hash(&self, hash: EntryHash) {
        lock(&self.state).reveal_echo = Some(hash);
    }

    /// Seed an existing chain without going through commit and reveal.
    pub fn insert_chain(&self, chain: &Chain) {
        lock(&self.state)
            .chains
            .insert(chain.id(), vec![chain.resolved_first_entry()]);
    }

    pub fn calls(&self, method: LedgerMethod) -> usize {
        lock(&self.state).recorder.calls(method)
    }

    /// Every call so far, in order.
    pub fn call_log(&self) -> Vec<LedgerMethod> {
        lock(&self.state).recorder.log.clone()
    }

    /// Entries stored on a chain.
    pub fn chain_entries(&self, chain_id: &ChainId) -> Vec<Entry> {
        lock(&self.state)
            .chains
            .get(chain_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn transaction(&self, tx_id: &TxId) -> Option<Transaction> {
        lock(&self.state).transactions.get(tx_id).cloned()
    }
}

#[async_trait]
impl LedgerRpc for MemoryLedger {
    async fn commit_chain(&self, message: &str) -> Result<RpcResponse<CommitChainResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::CommitChain) {
            return failure.respond();
        }
        Ok(state.commit_chain(message))
    }

    async fn commit_entry(&self, message: &str) -> Result<RpcResponse<CommitEntryResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::CommitEntry) {
            return failure.respond();
        }
        Ok(state.commit_entry(message))
    }

    async fn reveal_chain(&self, entry: &str) -> Result<RpcResponse<RevealResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::RevealChain) {
            return failure.respond();
        }
        Ok(state.reveal(entry, true))
    }

    async fn reveal_entry(&self, entry: &str) -> Result<RpcResponse<RevealResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::RevealEntry) {
            return failure.respond();
        }
        Ok(state.reveal(entry, false))
    }

    async fn acknowledgment(&self, target: &AckTarget) -> Result<RpcResponse<AckResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::Ack) {
            return failure.respond();
        }
        Ok(state.ack(target))
    }

    async fn all_entries(&self, chain_id: &ChainId) -> Result<RpcResponse<Vec<EntryData>>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::AllEntries) {
            return failure.respond();
        }
        Ok(match state.chains.get(chain_id) {
            Some(entries) => RpcResponse::ok(entries.iter().map(EntryData::from_entry).collect()),
            None => RpcResponse::error(MISSING_CHAIN_HEAD, "Missing Chain Head"),
        })
    }

    async fn chain_head(&self, chain_id: &ChainId) -> Result<RpcResponse<ChainHead>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::ChainHead) {
            return failure.respond();
        }
        let head = state
            .chains
            .get(chain_id)
            .and_then(|entries| entries.last())
            .map(|last| last.hash().map(|h| h.to_hex()));
        Ok(match head {
            Some(Ok(chain_head)) => RpcResponse::ok(ChainHead {
                chain_head,
                in_process_list: false,
            }),
            Some(Err(e)) => invalid(e),
            None => RpcResponse::error(MISSING_CHAIN_HEAD, "Missing Chain Head"),
        })
    }

    async fn factoid_submit(&self, transaction: &str) -> Result<RpcResponse<FactoidSubmitResponse>> {
        let mut state = lock(&self.state);
        if let Some(failure) = state.recorder.record(LedgerMethod::FactoidSubmit) {
            return failure.respond();
        }
        Ok(state.factoid_submit(transaction))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletMethod {
    ComposeChain,
    ComposeEntry,
    SignData,
    PublicAddress,
}

/// An in-memory wallet holding secret keys by public address.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    keys: HashMap<Address, LocalSigner>,
    recorder: Mutex<Recorder<WalletMethod>>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a secret address.
    pub fn with_key(mut self, secret: &str) -> std::result::Result<Self, CoreError> {
        let signer = LocalSigner::from_secret(secret)?;
        self.keys.insert(signer.address().clone(), signer);
        Ok(self)
    }

    pub fn fail(&self, method: WalletMethod, failure: Failure) {
        lock(&self.recorder).failures.insert(method, failure);
    }

    pub fn calls(&self, method: WalletMethod) -> usize {
        lock(&self.recorder).calls(method)
    }

    fn begin(&self, method: WalletMethod) -> Option<Failure> {
        lock(&self.recorder).record(method)
    }

    fn signer(&self, address: &Address) -> Option<&LocalSigner> {
        self.keys.get(address)
    }
}

fn not_in_wallet<T>(address: &Address) -> RpcResponse<T> {
    RpcResponse::error(OBJECT_NOT_FOUND, format!("{address} is not in the wallet"))
}

#[async_trait]
impl WalletRpc for MemoryWallet {
    async fn compose_chain(
        &self,
        chain: &Chain,
        ec_address: &Address,
    ) -> Result<RpcResponse<ComposedMessages>> {
        if let Some(failure) = self.begin(WalletMethod::ComposeChain) {
            return failure.respond();
        }
        let Some(signer) = self.signer(ec_address) else {
            return Ok(not_in_wallet(ec_address));
        };
        Ok(match compose_chain(chain, signer, now_millis()).await {
            Ok(composed) => RpcResponse::ok(ComposedMessages::from_hex(
                ledger_method::COMMIT_CHAIN,
                composed.commit_hex(),
                ledger_method::REVEAL_CHAIN,
                composed.reveal_hex(),
            )),
            Err(e) => invalid(e),
        })
    }

    async fn compose_entry(
        &self,
        entry: &Entry,
        ec_address: &Address,
    ) -> Result<RpcResponse<ComposedMessages>> {
        if let Some(failure) = self.begin(WalletMethod::ComposeEntry) {
            return failure.respond();
        }
        let Some(signer) = self.signer(ec_address) else {
            return Ok(not_in_wallet(ec_address));
        };
        Ok(match compose_entry(entry, signer, now_millis()).await {
            Ok(composed) => RpcResponse::ok(ComposedMessages::from_hex(
                ledger_method::COMMIT_ENTRY,
                composed.commit_hex(),
                ledger_method::REVEAL_ENTRY,
                composed.reveal_hex(),
            )),
            Err(e) => invalid(e),
        })
    }

    async fn sign_data(
        &self,
        signer: &Address,
        data: &[u8],
    ) -> Result<RpcResponse<SignDataResponse>> {
        if let Some(failure) = self.begin(WalletMethod::SignData) {
            return failure.respond();
        }
        let Some(key) = self.signer(signer) else {
            return Ok(not_in_wallet(signer));
        };
        let signature = key.sign(data).await?;
        let public_key = key.public_key().await?;
        Ok(RpcResponse::ok(SignDataResponse {
            public_key: public_key.to_hex(),
            signature: signature.to_hex(),
        }))
    }

    async fn public_address(&self, address: &Address) -> Result<RpcResponse<WalletAddress>> {
        if let Some(failure) = self.begin(WalletMethod::PublicAddress) {
            return failure.respond();
        }
        Ok(match self.signer(address) {
            Some(key) => RpcResponse::ok(WalletAddress {
                public: key.address().clone(),
            }),
            None => not_in_wallet(address),
        })
    }
}
