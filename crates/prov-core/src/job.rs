//! Modelo transitorio de una corrida del pipeline: request, job y su stream
//! de log.
//!
//! Rol en el flujo:
//! - Un `BuildJob` nace por invocación, es propiedad exclusiva de esa corrida
//!   y muere al llegar a un estado terminal. No hay persistencia del job más
//!   allá del stream emitido y, en éxito, del registro en el ledger.
//! - `logs` es append-only en orden de llegada; cada línea se reenvía de
//!   inmediato al `LogSink` (si hay uno) sin buffering más allá de la línea.
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ledger::TxId;
use prov_domain::{ContentHash, ImageRef};

/// Entrada cruda del trigger de build. Se valida antes de cualquier trabajo
/// de proceso o red.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub image_name: String,
    pub source_location: String,
}

/// Estados del pipeline. Lineales, sin transiciones de reintento: un caller
/// que quiere reintentar arranca un `BuildJob` nuevo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Building,
    Hashing,
    Submitting,
    AwaitingConfirmation,
    /// Terminal: escritura confirmada y aceptada por el ledger.
    Confirmed,
    /// Terminal: el build tool salió con código distinto de cero.
    BuildFailed,
    /// Terminal: el hasher no produjo huella (error o artefacto ausente).
    HashFailed,
    /// Terminal: fallo de encolado/broadcast o timeout de confirmación.
    SubmitFailed,
    /// Terminal: el ledger rechazó la escritura (conflicto de ownership u
    /// otro rechazo del backend).
    Reverted,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self,
                 JobState::Confirmed
                 | JobState::BuildFailed
                 | JobState::HashFailed
                 | JobState::SubmitFailed
                 | JobState::Reverted)
    }

    pub fn is_success(self) -> bool { self == JobState::Confirmed }
}

/// Extremo de publicación del stream de log. El receptor asociado es el
/// stream server-push del trigger; el cierre del canal señala fin de stream.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<String>,
}

impl LogSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reenvía una línea. Un receptor caído no interrumpe el pipeline.
    pub fn send(&self, line: &str) {
        let _ = self.tx.send(line.to_string());
    }
}

/// Job transitorio de una invocación del pipeline.
#[derive(Debug)]
pub struct BuildJob {
    pub id: Uuid,
    pub image_name: ImageRef,
    pub source_location: String,
    pub logs: Vec<String>,
    pub state: JobState,
    pub computed_hash: Option<ContentHash>,
    pub submitted_tx: Option<TxId>,
}

impl BuildJob {
    pub fn new(image_name: ImageRef, source_location: String) -> Self {
        Self { id: Uuid::new_v4(),
               image_name,
               source_location,
               logs: Vec::new(),
               state: JobState::Init,
               computed_hash: None,
               submitted_tx: None }
    }

    /// Append + reenvío inmediato. Nunca reordena.
    pub fn push_log(&mut self, sink: Option<&LogSink>, line: String) {
        if let Some(s) = sink {
            s.send(&line);
        }
        self.logs.push(line);
    }
}

/// Entrada de la cola de envíos. Propiedad de la cola hasta que su worker la
/// entrega al camino de escritura del ledger.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub job_id: Uuid,
    pub name: ImageRef,
    pub content_hash: ContentHash,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn new(job_id: Uuid, name: ImageRef, content_hash: ContentHash) -> Self {
        Self { job_id, name, content_hash, enqueued_at: Utc::now() }
    }
}
