//! The commit/reveal submission protocol.
//!
//! One submission is one future: compose, commit, reveal, then poll for
//! acknowledgment. Dropping the future stops polling; anything already sent
//! stays sent.

use std::sync::Arc;

use chainpost_core::{
    chain_cost, entry_cost, Chain, ChainId, CoreError, Entry, EntryHash, Transaction, TxId,
};
use chainpost_rpc::ledger::method;
use chainpost_rpc::{
    AckResponse, AckStatus, AckTarget, FactoidSubmitResponse, LedgerRpc, RevealResponse,
};

use crate::compose::{Composed, Composer};
use crate::config::{AckLevel, SubmitConfig};
use crate::error::{Result, SubmitError};
use crate::listener::{CommitEvent, Listener, Listeners};
use crate::state::{SubmissionKind, SubmissionState, Tracker};

/// A chain or entry that was committed, revealed and acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAndRevealResponse {
    pub commit: CommitEvent,
    pub reveal: RevealResponse,
    /// The acknowledgment that completed the submission.
    pub ack: AckResponse,
}

impl CommitAndRevealResponse {
    pub fn entry_hash(&self) -> EntryHash {
        self.reveal.entry_hash
    }

    pub fn chain_id(&self) -> ChainId {
        self.reveal.chain_id
    }
}

/// A transaction that was submitted and acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub submit: FactoidSubmitResponse,
    pub ack: AckResponse,
}

impl TransactionResponse {
    pub fn tx_id(&self) -> TxId {
        self.submit.tx_id
    }
}

/// Drives submissions against a ledger node and reports to listeners.
///
/// Holds no per-submission state, so one orchestrator can run many
/// submissions concurrently.
pub struct Orchestrator<R> {
    ledger: Arc<R>,
    listeners: Listeners,
    config: SubmitConfig,
}

impl<R: LedgerRpc> Orchestrator<R> {
    pub fn new(ledger: Arc<R>, config: SubmitConfig) -> Self {
        Self {
            ledger,
            listeners: Listeners::new(),
            config,
        }
    }

    /// Add a listener. Listeners are notified in the order added.
    pub fn register(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.register(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.register(listener);
        self
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    pub fn ledger(&self) -> &R {
        &self.ledger
    }

    /// Create a chain.
    pub async fn submit_chain(
        &self,
        chain: &Chain,
        composer: &dyn Composer,
    ) -> Result<CommitAndRevealResponse> {
        let mut tracker = Tracker::new(SubmissionKind::Chain);
        let result = self.run_chain(chain, composer, &mut tracker).await;
        self.finish(result, &mut tracker)
    }

    /// Append an entry to an existing chain.
    pub async fn submit_entry(
        &self,
        entry: &Entry,
        composer: &dyn Composer,
    ) -> Result<CommitAndRevealResponse> {
        let mut tracker = Tracker::new(SubmissionKind::Entry);
        let result = self.run_entry(entry, composer, &mut tracker).await;
        self.finish(result, &mut tracker)
    }

    /// Submit a signed transaction and wait for its acknowledgment.
    pub async fn submit_transaction(&self, transaction: &Transaction) -> Result<TransactionResponse> {
        let mut tracker = Tracker::new(SubmissionKind::Transaction);
        let result = self.run_transaction(transaction, &mut tracker).await;
        self.finish(result, &mut tracker)
    }

    /// Every entry on a chain, decoded.
    pub async fn entries(&self, chain_id: &ChainId) -> Result<Vec<Entry>> {
        let data = self
            .ledger
            .all_entries(chain_id)
            .await?
            .into_result(method::ALL_ENTRIES)?;
        let entries = data
            .iter()
            .map(|d| d.to_entry())
            .collect::<std::result::Result<Vec<_>, CoreError>>()?;
        Ok(entries)
    }

    async fn run_chain(
        &self,
        chain: &Chain,
        composer: &dyn Composer,
        tracker: &mut Tracker,
    ) -> Result<CommitAndRevealResponse> {
        chain_cost(chain.resolved_first_entry().to_bytes()?.len())?;
        if self.config.check_chain_exists {
            self.ensure_chain_absent(&chain.id()).await?;
        }
        let composed = composer.compose_chain(chain).await?;

        tracker.advance(SubmissionState::Committing);
        let commit = self
            .ledger
            .commit_chain(&composed.commit)
            .await?
            .into_result(method::COMMIT_CHAIN)?;
        let commit = CommitEvent::Chain(commit);
        self.committed(&composed, &commit, tracker);

        tracker.advance(SubmissionState::Revealing);
        let reveal = self
            .ledger
            .reveal_chain(&composed.reveal)
            .await?
            .into_result(method::REVEAL_CHAIN)?;

        self.complete(commit, reveal, tracker).await
    }

    async fn run_entry(
        &self,
        entry: &Entry,
        composer: &dyn Composer,
        tracker: &mut Tracker,
    ) -> Result<CommitAndRevealResponse> {
        entry_cost(entry.to_bytes()?.len())?;
        let composed = composer.compose_entry(entry).await?;

        tracker.advance(SubmissionState::Committing);
        let commit = self
            .ledger
            .commit_entry(&composed.commit)
            .await?
            .into_result(method::COMMIT_ENTRY)?;
        let commit = CommitEvent::Entry(commit);
        self.committed(&composed, &commit, tracker);

        tracker.advance(SubmissionState::Revealing);
        let reveal = self
            .ledger
            .reveal_entry(&composed.reveal)
            .await?
            .into_result(method::REVEAL_ENTRY)?;

        self.complete(commit, reveal, tracker).await
    }

    async fn run_transaction(
        &self,
        transaction: &Transaction,
        tracker: &mut Tracker,
    ) -> Result<TransactionResponse> {
        if !transaction.is_signed() {
            return Err(CoreError::Assertion("transaction is not signed".into()).into());
        }
        let encoded = transaction.to_hex()?;

        tracker.advance(SubmissionState::Committing);
        let submit = self
            .ledger
            .factoid_submit(&encoded)
            .await?
            .into_result(method::FACTOID_SUBMIT)?;
        tracker.advance(SubmissionState::Committed);
        tracing::info!(tx_id = %submit.tx_id, "transaction submitted");

        tracker.advance(SubmissionState::AwaitingAck);
        let ack = self
            .await_ack(&AckTarget::Transaction(submit.tx_id))
            .await?;
        tracker.advance(SubmissionState::Acknowledged);

        Ok(TransactionResponse { submit, ack })
    }

    async fn ensure_chain_absent(&self, chain_id: &ChainId) -> Result<()> {
        let head = self
            .ledger
            .chain_head(chain_id)
            .await?
            .into_result(method::CHAIN_HEAD);
        match head {
            Ok(_) => Err(SubmitError::ChainExists(*chain_id)),
            Err(e) if e.is_missing_chain() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn committed(&self, composed: &Composed, commit: &CommitEvent, tracker: &mut Tracker) {
        tracker.advance(SubmissionState::Committed);
        tracing::info!(
            kind = %composed.kind,
            entry_hash = %commit.entry_hash(),
            "commit accepted"
        );
        self.listeners
            .notify("on_compose", |l| l.on_compose(composed));
        self.listeners.notify("on_commit", |l| l.on_commit(commit));
    }

    /// Check the reveal against the commit, then wait for acknowledgment.
    async fn complete(
        &self,
        commit: CommitEvent,
        reveal: RevealResponse,
        tracker: &mut Tracker,
    ) -> Result<CommitAndRevealResponse> {
        if commit.entry_hash() != reveal.entry_hash {
            return Err(SubmitError::ProtocolMismatch {
                commit: commit.entry_hash(),
                reveal: reveal.entry_hash,
            });
        }
        tracker.advance(SubmissionState::Revealed);
        self.listeners.notify("on_reveal", |l| l.on_reveal(&reveal));

        tracker.advance(SubmissionState::AwaitingAck);
        let ack = self
            .await_ack(&AckTarget::Entry {
                entry_hash: reveal.entry_hash,
                chain_id: reveal.chain_id,
            })
            .await?;
        tracker.advance(SubmissionState::Acknowledged);

        Ok(CommitAndRevealResponse {
            commit,
            reveal,
            ack,
        })
    }

    /// Poll until the configured level is reached or attempts run out.
    ///
    /// `on_transaction_acknowledged` fires the first time the node reports
    /// at least `TransactionACK`; `on_commit_confirmed` fires on
    /// `DBlockConfirmed`.
    async fn await_ack(&self, target: &AckTarget) -> Result<AckResponse> {
        let ack_config = &self.config.ack;
        let wanted = match ack_config.level {
            AckLevel::TransactionAck => AckStatus::TransactionAck,
            AckLevel::DBlockConfirmed => AckStatus::DBlockConfirmed,
        };

        let mut last_status = AckStatus::Unknown;
        let mut acknowledged = false;
        for attempt in 1..=ack_config.max_attempts {
            let ack = self
                .ledger
                .acknowledgment(target)
                .await?
                .into_result(method::ACK)?;
            let status = ack.status();
            last_status = status;
            tracing::debug!(attempt, ?status, hash = %target.hash_hex(), "acknowledgment poll");

            if status >= AckStatus::TransactionAck && !acknowledged {
                acknowledged = true;
                self.listeners.notify("on_transaction_acknowledged", |l| {
                    l.on_transaction_acknowledged(&ack)
                });
            }
            if status >= wanted {
                if status == AckStatus::DBlockConfirmed {
                    self.listeners
                        .notify("on_commit_confirmed", |l| l.on_commit_confirmed(&ack));
                }
                return Ok(ack);
            }

            if attempt < ack_config.max_attempts {
                tokio::time::sleep(ack_config.poll_interval).await;
            }
        }

        Err(SubmitError::Timeout {
            attempts: ack_config.max_attempts,
            last_status,
        })
    }

    /// Record the outcome and report failures to listeners.
    ///
    /// Local validation failures (raised while composing) come back through
    /// the result only. Size limits are checked before any composer or
    /// ledger call, so wallet mode fails the same way.
    fn finish<T>(&self, result: Result<T>, tracker: &mut Tracker) -> Result<T> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let state = tracker.state();
        tracker.advance(SubmissionState::Failed);
        let local = error.is_local() && state == SubmissionState::Composing;
        if local {
            tracing::debug!(kind = %tracker.kind(), %error, "submission rejected locally");
        } else {
            tracing::warn!(kind = %tracker.kind(), %state, %error, "submission failed");
            self.listeners.notify("on_error", |l| l.on_error(&error));
        }
        Err(error)
    }
}
