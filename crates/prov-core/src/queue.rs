//! Cola de envíos: punto único de serialización de escrituras al ledger.
//!
//! Rol en el flujo:
//! - Todas las escrituras de una identidad firmante pasan por aquí en orden
//!   FIFO estricto, con a lo sumo una sin confirmar a la vez. Esto elimina
//!   las carreras sobre el contador de secuencia de la identidad.
//! - Sólo el worker de la cola posee la `SigningIdentity`; el pipeline nunca
//!   firma ni difunde directamente.
//! - El fallo de un envío no envenena la cola: el siguiente procede igual.

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::errors::LedgerError;
use crate::job::PendingSubmission;
use crate::ledger::{LedgerBackend, TxId, WriteOutcome};
use prov_domain::AccountId;
use std::sync::Arc;
use std::time::Duration;

/// Credencial firmante, recurso compartido de todo el proceso. Se construye
/// una vez al arranque y se entrega a la cola; nunca es estado global.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    pub account: AccountId,
}

impl SigningIdentity {
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }
}

struct QueueEntry {
    submission: PendingSubmission,
    reply: oneshot::Sender<Result<TxId, LedgerError>>,
}

/// Handle retornado por `enqueue`: se resuelve cuando el envío alcanza un
/// desenlace terminal (confirmado, rechazado o timeout).
#[derive(Debug)]
pub struct SubmissionHandle {
    rx: oneshot::Receiver<Result<TxId, LedgerError>>,
}

impl SubmissionHandle {
    pub async fn wait(self) -> Result<TxId, LedgerError> {
        self.rx
            .await
            .map_err(|_| LedgerError::Transaction("submission queue dropped".into()))?
    }
}

/// Cola FIFO con worker único. Clonar la cola comparte el mismo worker (y la
/// misma disciplina de escritor único).
#[derive(Clone)]
pub struct SubmissionQueue {
    tx: mpsc::UnboundedSender<QueueEntry>,
}

impl SubmissionQueue {
    /// Lanza el worker. `confirm_timeout` es el techo de espera de
    /// confirmación por envío; al vencer, el desenlace es
    /// `ConfirmationTimeout` y el worker pasa a la siguiente entrada.
    pub fn spawn(backend: Arc<dyn LedgerBackend>,
                 signer: SigningIdentity,
                 confirm_timeout: Duration)
                 -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueEntry>();
        tokio::spawn(async move {
            // Una entrada a la vez: la siguiente no se saca del canal hasta
            // que la anterior alcanzó desenlace terminal.
            while let Some(entry) = rx.recv().await {
                let res = Self::process(backend.as_ref(), &signer, confirm_timeout,
                                        &entry.submission).await;
                let _ = entry.reply.send(res);
            }
        });
        Self { tx }
    }

    /// Encola sin bloquear; el envío real ocurre asíncronamente en el worker.
    pub fn enqueue(&self, submission: PendingSubmission) -> Result<SubmissionHandle, LedgerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueueEntry { submission, reply })
            .map_err(|_| LedgerError::Transaction("submission queue closed".into()))?;
        Ok(SubmissionHandle { rx })
    }

    async fn process(backend: &dyn LedgerBackend,
                     signer: &SigningIdentity,
                     confirm_timeout: Duration,
                     submission: &PendingSubmission)
                     -> Result<TxId, LedgerError> {
        let pending = backend.submit(&submission.name, &submission.content_hash,
                                     &signer.account)
                             .await?;
        match timeout(confirm_timeout, pending.await_confirmation()).await {
            Err(_) => Err(LedgerError::ConfirmationTimeout),
            Ok(outcome) => match outcome? {
                WriteOutcome::Confirmed(tx_id) => Ok(tx_id),
                WriteOutcome::Rejected(e) => Err(e),
            },
        }
    }
}
