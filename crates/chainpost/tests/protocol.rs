//! End-to-end submissions against the in-memory ledger and wallet.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chainpost::core::entry::MAX_ENTRY_PAYLOAD;
use chainpost::core::SigningProvider;
use chainpost::rpc::error::code::REPEATED_COMMIT;
use chainpost::rpc::{
    AckResponse, AckStatus, Failure, LedgerMethod, MemoryLedger, RemoteSigner, RevealResponse,
    RpcError, WalletMethod,
};
use chainpost::{
    AckConfig, AckLevel, CommitEvent, Composed, CoreError, Entry, EntryHash, Listener,
    LocalComposer, Orchestrator, SubmitConfig, SubmitError, TransactionBuilder, WalletComposer,
};
use chainpost_testkit::TestFixture;

/// Records the events it sees, by name.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<&'static str>>,
}

impl Recorder {
    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl Listener for Recorder {
    fn on_compose(&self, _composed: &Composed) {
        self.push("compose");
    }

    fn on_commit(&self, _event: &CommitEvent) {
        self.push("commit");
    }

    fn on_reveal(&self, _reveal: &RevealResponse) {
        self.push("reveal");
    }

    fn on_transaction_acknowledged(&self, _ack: &AckResponse) {
        self.push("acknowledged");
    }

    fn on_commit_confirmed(&self, _ack: &AckResponse) {
        self.push("confirmed");
    }

    fn on_error(&self, _error: &SubmitError) {
        self.push("error");
    }
}

struct PanicsOnReveal;

impl Listener for PanicsOnReveal {
    fn on_reveal(&self, _reveal: &RevealResponse) {
        panic!("listener bug");
    }
}

fn fast_ack() -> AckConfig {
    AckConfig::default()
        .with_poll_interval(Duration::from_millis(1))
        .with_max_attempts(5)
}

fn setup(config: SubmitConfig) -> (TestFixture, Orchestrator<MemoryLedger>, Arc<Recorder>) {
    let fixture = TestFixture::new();
    let recorder = Arc::new(Recorder::default());
    let orchestrator = Orchestrator::new(Arc::clone(&fixture.ledger), config)
        .with_listener(recorder.clone());
    (fixture, orchestrator, recorder)
}

fn default_setup() -> (TestFixture, Orchestrator<MemoryLedger>, Arc<Recorder>) {
    setup(SubmitConfig::default().with_ack(fast_ack()))
}

fn local(fixture: &TestFixture) -> LocalComposer {
    LocalComposer::new(fixture.credit.clone())
}

#[tokio::test]
async fn test_chain_then_entry() {
    let (fixture, orchestrator, recorder) = default_setup();
    let composer = local(&fixture);
    let chain = fixture.make_chain("protocol", b"first");

    let created = orchestrator.submit_chain(&chain, &composer).await.unwrap();
    assert_eq!(created.chain_id(), chain.id());
    assert_eq!(
        created.entry_hash(),
        chain.resolved_first_entry().hash().unwrap()
    );
    assert!(matches!(created.commit, CommitEvent::Chain(_)));
    assert_eq!(created.ack.status(), AckStatus::DBlockConfirmed);
    assert_eq!(
        recorder.events(),
        vec!["compose", "commit", "reveal", "acknowledged", "confirmed"]
    );

    let entry = Entry::new(chain.id()).external_id("tag").content("second");
    let appended = orchestrator.submit_entry(&entry, &composer).await.unwrap();
    assert_eq!(appended.entry_hash(), entry.hash().unwrap());
    assert!(matches!(appended.commit, CommitEvent::Entry(_)));

    let stored = orchestrator.entries(&chain.id()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(&stored[1].content[..], b"second");
    assert_eq!(stored[1].hash().unwrap(), entry.hash().unwrap());
    assert_eq!(recorder.count("error"), 0);
}

#[tokio::test]
async fn test_calls_follow_protocol_order() {
    let (fixture, orchestrator, _) = default_setup();
    let chain = fixture.make_chain("order", b"");
    orchestrator
        .submit_chain(&chain, &local(&fixture))
        .await
        .unwrap();

    assert_eq!(
        fixture.ledger.call_log(),
        vec![
            LedgerMethod::CommitChain,
            LedgerMethod::RevealChain,
            LedgerMethod::Ack
        ]
    );
}

#[tokio::test]
async fn test_mismatched_reveal_hash_fails() {
    let (fixture, orchestrator, recorder) = default_setup();
    let bogus = EntryHash::from_bytes([0x11; 32]);
    fixture.ledger.echo_reveal_hash(bogus);

    let chain = fixture.make_chain("mismatch", b"");
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;

    match result {
        Err(SubmitError::ProtocolMismatch { commit, reveal }) => {
            assert_eq!(commit, chain.resolved_first_entry().hash().unwrap());
            assert_eq!(reveal, bogus);
        }
        other => panic!("expected a protocol mismatch, got {other:?}"),
    }
    assert_eq!(recorder.events(), vec!["compose", "commit", "error"]);
    assert_eq!(fixture.ledger.calls(LedgerMethod::Ack), 0);
}

#[tokio::test]
async fn test_mismatched_commit_hash_fails() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture.ledger.echo_commit_hash(EntryHash::from_bytes([0x22; 32]));

    let chain = fixture.make_chain("mismatch-commit", b"");
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;
    assert!(matches!(result, Err(SubmitError::ProtocolMismatch { .. })));
    assert_eq!(recorder.count("acknowledged"), 0);
    assert_eq!(recorder.count("error"), 1);
}

#[tokio::test]
async fn test_ack_timeout() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture.ledger.settle_at(AckStatus::NotConfirmed);

    let chain = fixture.make_chain("slow", b"");
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;

    assert!(matches!(
        result,
        Err(SubmitError::Timeout {
            attempts: 5,
            last_status: AckStatus::NotConfirmed
        })
    ));
    assert_eq!(fixture.ledger.calls(LedgerMethod::Ack), 5);
    assert_eq!(recorder.count("error"), 1);
    assert_eq!(recorder.count("acknowledged"), 0);
    // The reveal still went through.
    assert_eq!(fixture.ledger.chain_entries(&chain.id()).len(), 1);
}

#[tokio::test]
async fn test_dblock_level_waits_for_confirmation() {
    let config = SubmitConfig::default()
        .with_ack(fast_ack().with_level(AckLevel::DBlockConfirmed));
    let (fixture, orchestrator, recorder) = setup(config);
    fixture.ledger.script_acks([
        AckStatus::NotConfirmed,
        AckStatus::TransactionAck,
        AckStatus::TransactionAck,
    ]);

    let chain = fixture.make_chain("dblock", b"");
    let created = orchestrator
        .submit_chain(&chain, &local(&fixture))
        .await
        .unwrap();

    assert_eq!(created.ack.status(), AckStatus::DBlockConfirmed);
    assert_eq!(fixture.ledger.calls(LedgerMethod::Ack), 4);
    assert_eq!(recorder.count("acknowledged"), 1);
    assert_eq!(recorder.count("confirmed"), 1);
}

#[tokio::test]
async fn test_transaction_ack_level_stops_early() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture
        .ledger
        .script_acks([AckStatus::Unknown, AckStatus::TransactionAck]);

    let chain = fixture.make_chain("early", b"");
    let created = orchestrator
        .submit_chain(&chain, &local(&fixture))
        .await
        .unwrap();

    assert_eq!(created.ack.status(), AckStatus::TransactionAck);
    assert_eq!(fixture.ledger.calls(LedgerMethod::Ack), 2);
    assert_eq!(recorder.count("acknowledged"), 1);
    assert_eq!(recorder.count("confirmed"), 0);
}

#[tokio::test]
async fn test_failed_commit_skips_reveal() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture.ledger.fail(
        LedgerMethod::CommitChain,
        Failure::Rpc {
            code: -32600,
            message: "bad request".into(),
        },
    );

    let chain = fixture.make_chain("rejected", b"");
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;

    match result {
        Err(SubmitError::Rpc(e)) => assert_eq!(e.code(), Some(-32600)),
        other => panic!("expected an rpc error, got {other:?}"),
    }
    assert_eq!(fixture.ledger.calls(LedgerMethod::RevealChain), 0);
    assert_eq!(recorder.events(), vec!["error"]);
}

#[tokio::test]
async fn test_http_status_is_a_failure() {
    let (fixture, orchestrator, recorder) = default_setup();
    let chain = fixture.make_chain("http", b"");
    fixture.seed_chain(&chain);
    fixture
        .ledger
        .fail(LedgerMethod::RevealEntry, Failure::Http(503));

    let entry = Entry::new(chain.id()).content("x");
    let result = orchestrator.submit_entry(&entry, &local(&fixture)).await;

    assert!(matches!(
        result,
        Err(SubmitError::Rpc(RpcError::Http { status: 503, .. }))
    ));
    assert_eq!(recorder.events(), vec!["compose", "commit", "error"]);
}

#[tokio::test]
async fn test_transport_failure_while_polling() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture
        .ledger
        .fail(LedgerMethod::Ack, Failure::Transport("connection reset".into()));

    let chain = fixture.make_chain("transport", b"");
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;

    assert!(matches!(
        result,
        Err(SubmitError::Rpc(RpcError::Transport(_)))
    ));
    assert_eq!(recorder.count("reveal"), 1);
    assert_eq!(recorder.count("error"), 1);
}

#[tokio::test]
async fn test_repeated_commit_rejected() {
    let (fixture, orchestrator, recorder) = default_setup();
    let chain = fixture.make_chain("twice", b"");
    fixture.seed_chain(&chain);
    let entry = Entry::new(chain.id()).content("same");

    orchestrator
        .submit_entry(&entry, &local(&fixture))
        .await
        .unwrap();
    let again = orchestrator.submit_entry(&entry, &local(&fixture)).await;

    match again {
        Err(SubmitError::Rpc(e)) => assert_eq!(e.code(), Some(REPEATED_COMMIT)),
        other => panic!("expected a repeated commit, got {other:?}"),
    }
    assert_eq!(recorder.count("error"), 1);
}

#[tokio::test]
async fn test_entry_on_missing_chain() {
    let (fixture, orchestrator, _) = default_setup();
    let chain = fixture.make_chain("absent", b"");
    let entry = Entry::new(chain.id()).content("orphan");

    let result = orchestrator.submit_entry(&entry, &local(&fixture)).await;
    match result {
        Err(SubmitError::Rpc(e)) => assert!(e.is_missing_chain()),
        other => panic!("expected a missing chain, got {other:?}"),
    }

    let listed = orchestrator.entries(&chain.id()).await;
    assert!(matches!(listed, Err(SubmitError::Rpc(e)) if e.is_missing_chain()));
}

#[tokio::test]
async fn test_listeners_in_order_and_isolated() {
    let (fixture, mut orchestrator, first) = default_setup();
    let second = Arc::new(Recorder::default());
    orchestrator.register(Arc::new(PanicsOnReveal));
    orchestrator.register(second.clone());

    let chain = fixture.make_chain("listeners", b"");
    orchestrator
        .submit_chain(&chain, &local(&fixture))
        .await
        .unwrap();

    assert_eq!(first.events(), second.events());
    assert_eq!(second.count("reveal"), 1);
}

#[tokio::test]
async fn test_oversized_entry_rejected_before_network() {
    let (fixture, orchestrator, recorder) = default_setup();
    let chain = fixture.make_chain("big", b"");
    fixture.seed_chain(&chain);
    let calls_before = fixture.ledger.call_log().len();

    let entry = Entry::new(chain.id()).content(vec![0u8; MAX_ENTRY_PAYLOAD + 1]);
    let result = orchestrator.submit_entry(&entry, &local(&fixture)).await;

    assert!(matches!(
        result,
        Err(SubmitError::Core(CoreError::PayloadTooLarge { .. }))
    ));
    assert_eq!(fixture.ledger.call_log().len(), calls_before);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_wallet_mode_rejects_oversized_entry() {
    let (fixture, orchestrator, recorder) = default_setup();
    let chain = fixture.make_chain("big-wallet", b"");
    fixture.seed_chain(&chain);
    let composer =
        WalletComposer::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();

    let entry = Entry::new(chain.id()).content(vec![0u8; MAX_ENTRY_PAYLOAD + 1]);
    let result = orchestrator.submit_entry(&entry, &composer).await;

    assert!(matches!(
        result,
        Err(SubmitError::Core(CoreError::PayloadTooLarge { .. }))
    ));
    assert_eq!(fixture.wallet.calls(WalletMethod::ComposeEntry), 0);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_wallet_mode_rejects_oversized_chain() {
    let (fixture, orchestrator, recorder) = default_setup();
    let composer =
        WalletComposer::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();

    let chain = fixture.make_chain("big-wallet-chain", &vec![0u8; MAX_ENTRY_PAYLOAD + 1]);
    let result = orchestrator.submit_chain(&chain, &composer).await;

    assert!(matches!(
        result,
        Err(SubmitError::Core(CoreError::PayloadTooLarge { .. }))
    ));
    assert_eq!(fixture.wallet.calls(WalletMethod::ComposeChain), 0);
    assert!(fixture.ledger.call_log().is_empty());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_oversized_chain_skips_existence_check() {
    let config = SubmitConfig::default()
        .with_ack(fast_ack())
        .with_chain_exists_check(true);
    let (fixture, orchestrator, recorder) = setup(config);

    let chain = fixture.make_chain("big-chain", &vec![0u8; MAX_ENTRY_PAYLOAD + 1]);
    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;

    assert!(matches!(
        result,
        Err(SubmitError::Core(CoreError::PayloadTooLarge { .. }))
    ));
    assert_eq!(fixture.ledger.calls(LedgerMethod::ChainHead), 0);
    assert!(fixture.ledger.call_log().is_empty());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_largest_entry_accepted() {
    let (fixture, orchestrator, _) = default_setup();
    let chain = fixture.make_chain("edge", b"");
    fixture.seed_chain(&chain);

    let entry = Entry::new(chain.id()).content(vec![7u8; MAX_ENTRY_PAYLOAD]);
    orchestrator
        .submit_entry(&entry, &local(&fixture))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_existing_chain_detected() {
    let config = SubmitConfig::default()
        .with_ack(fast_ack())
        .with_chain_exists_check(true);
    let (fixture, orchestrator, recorder) = setup(config);
    let chain = fixture.make_chain("exists", b"");
    fixture.seed_chain(&chain);

    let result = orchestrator.submit_chain(&chain, &local(&fixture)).await;
    assert!(matches!(result, Err(SubmitError::ChainExists(id)) if id == chain.id()));
    assert_eq!(fixture.ledger.calls(LedgerMethod::CommitChain), 0);
    assert_eq!(recorder.events(), vec!["error"]);

    let fresh = fixture.make_chain("fresh", b"");
    orchestrator
        .submit_chain(&fresh, &local(&fixture))
        .await
        .unwrap();
    assert_eq!(fixture.ledger.calls(LedgerMethod::ChainHead), 2);
}

#[tokio::test]
async fn test_dropping_submission_stops_polling() {
    let ack = AckConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_max_attempts(1_000);
    let (fixture, orchestrator, recorder) = setup(SubmitConfig::default().with_ack(ack));
    fixture.ledger.settle_at(AckStatus::NotConfirmed);

    let chain = fixture.make_chain("cancelled", b"");
    let composer = local(&fixture);
    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        orchestrator.submit_chain(&chain, &composer),
    )
    .await;
    assert!(outcome.is_err());

    let polls = fixture.ledger.calls(LedgerMethod::Ack);
    assert!(polls >= 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fixture.ledger.calls(LedgerMethod::Ack), polls);
    assert_eq!(recorder.count("error"), 0);
    assert_eq!(recorder.count("reveal"), 1);
}

#[tokio::test]
async fn test_wallet_composer() {
    let (fixture, orchestrator, recorder) = default_setup();
    let composer =
        WalletComposer::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();

    let chain = fixture.make_chain("wallet", b"via wallet");
    let created = orchestrator.submit_chain(&chain, &composer).await.unwrap();
    assert_eq!(created.chain_id(), chain.id());

    let entry = Entry::new(chain.id()).content("more");
    orchestrator.submit_entry(&entry, &composer).await.unwrap();

    assert_eq!(fixture.wallet.calls(WalletMethod::ComposeChain), 1);
    assert_eq!(fixture.wallet.calls(WalletMethod::ComposeEntry), 1);
    assert_eq!(fixture.ledger.chain_entries(&chain.id()).len(), 2);
    assert_eq!(recorder.count("error"), 0);
}

#[tokio::test]
async fn test_wallet_failure_reported() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture
        .wallet
        .fail(WalletMethod::ComposeChain, Failure::Http(500));
    let composer =
        WalletComposer::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();

    let chain = fixture.make_chain("wallet-down", b"");
    let result = orchestrator.submit_chain(&chain, &composer).await;

    assert!(matches!(result, Err(SubmitError::Rpc(RpcError::Http { .. }))));
    assert!(fixture.ledger.call_log().is_empty());
    assert_eq!(recorder.events(), vec!["error"]);
}

#[tokio::test]
async fn test_remote_signer_composes_locally() {
    let (fixture, orchestrator, _) = default_setup();
    let signer = RemoteSigner::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();
    assert_eq!(
        signer.public_key().await.unwrap(),
        fixture.credit.public_key().await.unwrap()
    );
    let composer = LocalComposer::new(Arc::new(signer));

    let chain = fixture.make_chain("remote-signer", b"");
    orchestrator.submit_chain(&chain, &composer).await.unwrap();
    assert!(fixture.wallet.calls(WalletMethod::SignData) >= 1);
}

#[tokio::test]
async fn test_signing_service_failure_reaches_listeners() {
    let (fixture, orchestrator, recorder) = default_setup();
    fixture
        .wallet
        .fail(WalletMethod::SignData, Failure::Http(503));
    let signer = RemoteSigner::new(Arc::clone(&fixture.wallet), fixture.credit_address()).unwrap();
    let composer = LocalComposer::new(Arc::new(signer));

    let chain = fixture.make_chain("signer-down", b"");
    let result = orchestrator.submit_chain(&chain, &composer).await;

    assert!(matches!(
        result,
        Err(SubmitError::Rpc(RpcError::Http { status: 503, .. }))
    ));
    assert_eq!(recorder.events(), vec!["error"]);
    assert!(fixture.ledger.call_log().is_empty());
}

#[tokio::test]
async fn test_concurrent_entries() {
    let (fixture, orchestrator, recorder) = default_setup();
    let chain = fixture.make_chain("concurrent", b"");
    fixture.seed_chain(&chain);
    let composer = local(&fixture);

    let a = Entry::new(chain.id()).content("a");
    let b = Entry::new(chain.id()).content("b");
    let (ra, rb) = tokio::join!(
        orchestrator.submit_entry(&a, &composer),
        orchestrator.submit_entry(&b, &composer)
    );

    assert_eq!(ra.unwrap().entry_hash(), a.hash().unwrap());
    assert_eq!(rb.unwrap().entry_hash(), b.hash().unwrap());
    assert_eq!(fixture.ledger.chain_entries(&chain.id()).len(), 3);
    assert_eq!(recorder.count("reveal"), 2);
}

#[tokio::test]
async fn test_transaction_submit() {
    let (fixture, orchestrator, recorder) = default_setup();
    let tx = TransactionBuilder::new()
        .input(fixture.factoid_address(), 1_000)
        .output(fixture.factoid_address(), 400)
        .ec_output(fixture.credit_address(), 600)
        .seal(&[fixture.factoid.as_ref() as &dyn SigningProvider])
        .await
        .unwrap();

    let response = orchestrator.submit_transaction(&tx).await.unwrap();
    assert_eq!(response.tx_id(), tx.id().unwrap());
    assert_eq!(fixture.ledger.transaction(&response.tx_id()), Some(tx));
    assert_eq!(
        fixture.ledger.call_log(),
        vec![LedgerMethod::FactoidSubmit, LedgerMethod::Ack]
    );
    assert_eq!(recorder.events(), vec!["acknowledged", "confirmed"]);
}

#[tokio::test]
async fn test_unsigned_transaction_rejected_locally() {
    let (fixture, orchestrator, recorder) = default_setup();
    let tx = TransactionBuilder::new()
        .input(fixture.factoid_address(), 10)
        .output(fixture.factoid_address(), 10)
        .seal_unsigned()
        .unwrap();

    let result = orchestrator.submit_transaction(&tx).await;
    assert!(matches!(
        result,
        Err(SubmitError::Core(CoreError::Assertion(_)))
    ));
    assert!(fixture.ledger.call_log().is_empty());
    assert!(recorder.events().is_empty());
}
