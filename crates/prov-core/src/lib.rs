//! prov-core: pipeline de atestación y modelo de consistencia del ledger.
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod job;
pub mod ledger;
pub mod pipeline;
pub mod queue;
pub mod verify;

pub use errors::{LedgerError, PipelineError};
pub use job::{BuildJob, BuildRequest, JobState, LogSink, PendingSubmission};
pub use ledger::{ArtifactRecord, InMemoryLedger, LedgerBackend, PendingWrite, RegisterDecision,
                 RegistryEvent, TxId, WriteOutcome, decide_register};
pub use pipeline::{AttestationPipeline, BuildOutput, BuildTool, ContentHasher};
pub use queue::{SigningIdentity, SubmissionHandle, SubmissionQueue};
pub use verify::{VerificationGate, VerificationResult};
