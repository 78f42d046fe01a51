use async_trait::async_trait;
use prov_adapters::{FixedHasher, ScriptedBuildTool};
use prov_core::constants::CONFIRMATION_MARKER;
use prov_core::{AttestationPipeline, BuildOutput, BuildRequest, ContentHasher, InMemoryLedger,
                JobState, LedgerBackend, LedgerError, LogSink, PendingWrite, PipelineError,
                SigningIdentity, SubmissionQueue, TxId};
use prov_domain::{AccountId, ContentHash, ImageRef};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

fn signer() -> SigningIdentity {
    SigningIdentity::new(AccountId::new("0xaaa").unwrap())
}

fn queue_over(ledger: Arc<dyn LedgerBackend>) -> SubmissionQueue {
    SubmissionQueue::spawn(ledger, signer(), Duration::from_secs(5))
}

fn request(image: &str) -> BuildRequest {
    BuildRequest { image_name: image.to_string(),
                   source_location: "./app".to_string() }
}

fn marker_lines(logs: &[String]) -> Vec<&String> {
    logs.iter()
        .filter(|l| l.starts_with(&format!("{CONFIRMATION_MARKER}: ")))
        .collect()
}

#[tokio::test]
async fn success_scenario_confirms_and_registers() {
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = AttestationPipeline::new(ScriptedBuildTool::succeeding(&["step 1/2", "step 2/2"]),
                                            FixedHasher::new("sha256:aaa"),
                                            queue_over(ledger.clone()));

    let job = pipeline.run(request("demo:v1"), None).await.unwrap();

    assert_eq!(job.state, JobState::Confirmed);
    assert!(job.state.is_terminal() && job.state.is_success());
    assert_eq!(job.computed_hash.as_ref().unwrap().as_str(), "sha256:aaa");
    assert!(job.submitted_tx.is_some());

    // Exactly one confirmation marker, carrying the tx handle
    let markers = marker_lines(&job.logs);
    assert_eq!(markers.len(), 1);
    let tx = job.submitted_tx.as_ref().unwrap();
    assert_eq!(markers[0].as_str(), format!("{CONFIRMATION_MARKER}: {tx}"));

    // Ledger holds (hash, signing identity)
    let rec = ledger.lookup(&ImageRef::new("demo:v1").unwrap()).await.unwrap().unwrap();
    assert_eq!(rec.content_hash.as_str(), "sha256:aaa");
    assert_eq!(rec.owner.as_str(), "0xaaa");
}

#[tokio::test]
async fn build_lines_are_forwarded_in_arrival_order() {
    let ledger = Arc::new(InMemoryLedger::new());
    let tool = ScriptedBuildTool::new(vec![BuildOutput::Line("step 1/2".into()),
                                           BuildOutput::Stderr("warning: cache miss".into()),
                                           BuildOutput::Line("step 2/2".into()),
                                           BuildOutput::Exited(0)]);
    let pipeline =
        AttestationPipeline::new(tool, FixedHasher::new("sha256:aaa"), queue_over(ledger));

    let (sink, mut rx) = LogSink::channel();
    let job = pipeline.run(request("demo:v1"), Some(sink)).await.unwrap();

    // The sink saw exactly the job log, in the same order
    let mut streamed = Vec::new();
    while let Some(line) = rx.recv().await {
        streamed.push(line);
    }
    assert_eq!(streamed, job.logs);

    let s1 = job.logs.iter().position(|l| l == "step 1/2").unwrap();
    let serr = job.logs.iter().position(|l| l == "[STDERR] warning: cache miss").unwrap();
    let s2 = job.logs.iter().position(|l| l == "step 2/2").unwrap();
    assert!(s1 < serr && serr < s2);
}

#[tokio::test]
async fn build_failure_never_writes_to_ledger() {
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = AttestationPipeline::new(ScriptedBuildTool::failing(&["step 1/2"], 1),
                                            FixedHasher::new("sha256:aaa"),
                                            queue_over(ledger.clone()));

    let job = pipeline.run(request("demo:v1"), None).await.unwrap();

    assert_eq!(job.state, JobState::BuildFailed);
    assert!(job.computed_hash.is_none());
    assert_eq!(marker_lines(&job.logs).len(), 0);
    assert!(job.logs.iter().any(|l| l == "build failed (exit 1)"));

    // No submission reached the ledger: state unchanged, no audit event
    assert!(ledger.lookup(&ImageRef::new("demo:v1").unwrap()).await.unwrap().is_none());
    assert!(ledger.events().is_empty());
}

struct FailingHasher;

#[async_trait]
impl ContentHasher for FailingHasher {
    async fn hash_artifact(&self, _image: &ImageRef) -> Result<ContentHash, PipelineError> {
        Err(PipelineError::HashComputation("artifact missing".into()))
    }
}

#[tokio::test]
async fn hash_failure_is_terminal_without_write() {
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = AttestationPipeline::new(ScriptedBuildTool::succeeding(&["ok"]),
                                            FailingHasher,
                                            queue_over(ledger.clone()));

    let job = pipeline.run(request("demo:v1"), None).await.unwrap();

    assert_eq!(job.state, JobState::HashFailed);
    assert_eq!(marker_lines(&job.logs).len(), 0);
    assert!(job.logs.iter().any(|l| l.contains("hash error")));
    assert!(ledger.events().is_empty());
}

#[tokio::test]
async fn ownership_conflict_ends_in_reverted() {
    let ledger = Arc::new(InMemoryLedger::new());

    // Pre-register the name under a different identity
    let other = AccountId::new("0xbbb").unwrap();
    let pending = ledger.submit(&ImageRef::new("demo:v1").unwrap(),
                                &ContentHash::new("sha256:old").unwrap(),
                                &other)
                        .await
                        .unwrap();
    pending.await_confirmation().await.unwrap();

    let pipeline = AttestationPipeline::new(ScriptedBuildTool::succeeding(&["ok"]),
                                            FixedHasher::new("sha256:aaa"),
                                            queue_over(ledger.clone()));
    let job = pipeline.run(request("demo:v1"), None).await.unwrap();

    assert_eq!(job.state, JobState::Reverted);
    assert_eq!(marker_lines(&job.logs).len(), 0);
    assert!(job.logs.iter().any(|l| l.contains("ledger rejected write")));

    // Pre-existing record untouched
    let rec = ledger.lookup(&ImageRef::new("demo:v1").unwrap()).await.unwrap().unwrap();
    assert_eq!(rec.content_hash.as_str(), "sha256:old");
    assert_eq!(rec.owner, other);
}

// Backend whose writes never confirm: the pending resolver is parked forever
struct NeverConfirming {
    parked: Mutex<Vec<oneshot::Sender<prov_core::WriteOutcome>>>,
}

#[async_trait]
impl LedgerBackend for NeverConfirming {
    async fn submit(&self,
                    name: &ImageRef,
                    content_hash: &ContentHash,
                    submitter: &AccountId)
                    -> Result<PendingWrite, LedgerError> {
        let tx_id = TxId::derive(0, name, content_hash, submitter);
        let (pending, resolve) = PendingWrite::new(tx_id);
        self.parked.lock().unwrap().push(resolve);
        Ok(pending)
    }

    async fn lookup(&self, _name: &ImageRef) -> Result<Option<prov_core::ArtifactRecord>, LedgerError> {
        Ok(None)
    }
}

#[tokio::test]
async fn confirmation_timeout_ends_in_submit_failed() {
    let ledger = Arc::new(NeverConfirming { parked: Mutex::new(Vec::new()) });
    let queue = SubmissionQueue::spawn(ledger, signer(), Duration::from_millis(50));
    let pipeline = AttestationPipeline::new(ScriptedBuildTool::succeeding(&["ok"]),
                                            FixedHasher::new("sha256:aaa"),
                                            queue);

    let job = pipeline.run(request("demo:v1"), None).await.unwrap();

    assert_eq!(job.state, JobState::SubmitFailed);
    assert_eq!(marker_lines(&job.logs).len(), 0);
    assert!(job.logs.iter().any(|l| l.contains("confirmation timeout")));
}

#[tokio::test]
async fn validation_failure_precedes_any_work() {
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = AttestationPipeline::new(ScriptedBuildTool::succeeding(&["ok"]),
                                            FixedHasher::new("sha256:aaa"),
                                            queue_over(ledger.clone()));

    let err = pipeline.run(request("demo v1"), None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    let err = pipeline.run(BuildRequest { image_name: "demo:v1".into(),
                                          source_location: "  ".into() },
                           None)
                      .await
                      .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    assert!(ledger.events().is_empty());
}
