//! Pipeline de atestación: orquestador de una corrida build → hash → submit
//! → confirm.
//!
//! Invariantes:
//! - `Submitting` es inalcanzable si `Building` no terminó con exit 0: ningún
//!   build fallido produce jamás una escritura en el ledger.
//! - Una corrida es single-shot: no hay transiciones de reintento; reintentar
//!   es arrancar un `BuildJob` nuevo.
//! - El pipeline nunca firma ni habla con el ledger: entrega el envío a la
//!   `SubmissionQueue` y espera el handle.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::constants::{CONFIRMATION_MARKER, STDERR_PREFIX};
use crate::errors::{LedgerError, PipelineError};
use crate::job::{BuildJob, BuildRequest, JobState, LogSink, PendingSubmission};
use crate::queue::SubmissionQueue;
use prov_domain::{ContentHash, DomainError, ImageRef};

/// Salida incremental del build tool, línea a línea y con el código de salida
/// como último elemento del stream.
#[derive(Debug, Clone)]
pub enum BuildOutput {
    Line(String),
    Stderr(String),
    Exited(i32),
}

/// Herramienta de build externa. Corre como proceso aparte; su salida se
/// consume incrementalmente (el canal cede control entre líneas).
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn start(&self,
                   image: &ImageRef,
                   source_location: &str)
                   -> Result<mpsc::Receiver<BuildOutput>, PipelineError>;
}

/// Función de huella de contenido, opaca para el core. Único requisito:
/// determinismo sobre contenido idéntico y codificación textual estable.
#[async_trait]
pub trait ContentHasher: Send + Sync {
    async fn hash_artifact(&self, image: &ImageRef) -> Result<ContentHash, PipelineError>;
}

/// Orquestador de corridas de atestación. Varias corridas pueden convivir en
/// `Building`/`Hashing` sin estado compartido; la serialización ocurre recién
/// al entregar el envío a la cola.
pub struct AttestationPipeline<B, H>
    where B: BuildTool,
          H: ContentHasher
{
    build_tool: B,
    hasher: H,
    queue: SubmissionQueue,
}

impl<B, H> AttestationPipeline<B, H>
    where B: BuildTool,
          H: ContentHasher
{
    pub fn new(build_tool: B, hasher: H, queue: SubmissionQueue) -> Self {
        Self { build_tool, hasher, queue }
    }

    /// Ejecuta una corrida completa hasta estado terminal.
    ///
    /// `Err` sólo por validación de inputs (antes de cualquier trabajo de
    /// proceso o red, y antes de que exista el job). Todo fallo posterior es
    /// un estado terminal del `BuildJob` retornado, con su línea de log
    /// emitida antes de cerrar el stream.
    pub async fn run(&self,
                     request: BuildRequest,
                     sink: Option<LogSink>)
                     -> Result<BuildJob, PipelineError> {
        let image = ImageRef::new(&request.image_name)?;
        if request.source_location.trim().is_empty() {
            return Err(DomainError::InvalidSourceLocation(request.source_location).into());
        }

        let mut job = BuildJob::new(image, request.source_location);
        job.push_log(sink.as_ref(), format!("attestation started for {}", job.image_name));
        job.push_log(sink.as_ref(), format!("source location: {}", job.source_location));

        if let Some(hash) = self.build_and_hash(&mut job, sink.as_ref()).await {
            self.submit_and_confirm(&mut job, sink.as_ref(), hash).await;
        }
        Ok(job)
    }

    /// Etapas `Building` y `Hashing`. Retorna la huella sólo si ambas
    /// terminaron bien; en otro caso el job ya quedó en estado terminal.
    async fn build_and_hash(&self, job: &mut BuildJob, sink: Option<&LogSink>) -> Option<ContentHash> {
        job.state = JobState::Building;
        let mut output = match self.build_tool.start(&job.image_name, &job.source_location).await {
            Ok(rx) => rx,
            Err(e) => {
                job.push_log(sink, format!("build tool error: {e}"));
                job.state = JobState::BuildFailed;
                return None;
            }
        };

        let mut exit_code = None;
        while let Some(out) = output.recv().await {
            match out {
                BuildOutput::Line(line) => job.push_log(sink, line),
                BuildOutput::Stderr(line) => job.push_log(sink, format!("{STDERR_PREFIX}{line}")),
                BuildOutput::Exited(code) => {
                    exit_code = Some(code);
                    break;
                }
            }
        }

        match exit_code {
            Some(0) => job.push_log(sink, "build ok (exit 0)".to_string()),
            Some(code) => {
                job.push_log(sink, format!("build failed (exit {code})"));
                job.state = JobState::BuildFailed;
                return None;
            }
            None => {
                job.push_log(sink, "build stream ended without exit status".to_string());
                job.state = JobState::BuildFailed;
                return None;
            }
        }

        job.state = JobState::Hashing;
        match self.hasher.hash_artifact(&job.image_name).await {
            Ok(hash) => {
                job.push_log(sink, format!("content hash: {hash}"));
                job.computed_hash = Some(hash.clone());
                Some(hash)
            }
            Err(e) => {
                job.push_log(sink, format!("hash error: {e}"));
                job.state = JobState::HashFailed;
                None
            }
        }
    }

    /// Etapas `Submitting` y `AwaitingConfirmation`. Una vez encolado, el
    /// worker de la cola lleva la escritura a desenlace terminal aunque la
    /// tarea dueña del job sea abortada.
    async fn submit_and_confirm(&self, job: &mut BuildJob, sink: Option<&LogSink>, hash: ContentHash) {
        job.state = JobState::Submitting;
        job.push_log(sink, format!("submitting attestation for {}", job.image_name));

        let submission = PendingSubmission::new(job.id, job.image_name.clone(), hash);
        let handle = match self.queue.enqueue(submission) {
            Ok(h) => h,
            Err(e) => {
                job.push_log(sink, format!("submission failed: {e}"));
                job.state = JobState::SubmitFailed;
                return;
            }
        };

        job.state = JobState::AwaitingConfirmation;
        job.push_log(sink, "awaiting ledger confirmation".to_string());

        match handle.wait().await {
            Ok(tx_id) => {
                job.push_log(sink, "record confirmed".to_string());
                job.push_log(sink, format!("{CONFIRMATION_MARKER}: {tx_id}"));
                job.submitted_tx = Some(tx_id);
                job.state = JobState::Confirmed;
            }
            Err(e @ LedgerError::OwnershipConflict { .. }) | Err(e @ LedgerError::Backend(_)) => {
                job.push_log(sink, format!("ledger rejected write: {e}"));
                job.state = JobState::Reverted;
            }
            Err(e) => {
                // Transaction / ConfirmationTimeout: la escritura no llegó a
                // estado durable conocido.
                job.push_log(sink, format!("submission failed: {e}"));
                job.state = JobState::SubmitFailed;
            }
        }
    }
}
