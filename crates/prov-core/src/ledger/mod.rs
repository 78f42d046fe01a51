//! Contrato del ledger de procedencia.
//!
//! Rol en el flujo:
//! - `LedgerBackend` modela la escritura como llamada remota con confirmación
//!   eventual: `submit` retorna un `PendingWrite` y el resultado real
//!   (aceptado / rechazado) llega al resolver la confirmación.
//! - `lookup` es lectura pura: la ausencia es `None`, nunca un error.
//! - `decide_register` concentra la política de sobrescritura (owner-locked,
//!   owner-may-update) para que todos los backends apliquen la misma regla.

mod memory;

pub use memory::InMemoryLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

use crate::errors::LedgerError;
use crate::hashing::hash_value;
pub use prov_domain::ArtifactRecord;
use prov_domain::{AccountId, ContentHash, ImageRef};
use std::fmt;

/// Handle de confirmación de una escritura. Determinista: mismo input y
/// misma posición (`seq`) producen el mismo id en cualquier backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn derive(seq: u64, name: &ImageRef, hash: &ContentHash, owner: &AccountId) -> Self {
        let fp = hash_value(&json!({
            "seq": seq,
            "name": name.as_str(),
            "content_hash": hash.as_str(),
            "owner": owner.as_str(),
        }));
        TxId(format!("0x{fp}"))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evento de auditoría emitido por cada escritura aceptada. Junto al estado
/// actual, es la única traza durable de la operación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEvent {
    pub seq: u64,
    pub name: ImageRef,
    pub content_hash: ContentHash,
    pub owner: AccountId,
    pub tx_id: TxId,
    pub ts: DateTime<Utc>,
}

/// Resultado terminal de una escritura ya difundida.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Confirmed(TxId),
    Rejected(LedgerError),
}

/// Escritura difundida pero aún no confirmada.
#[derive(Debug)]
pub struct PendingWrite {
    pub tx_id: TxId,
    rx: oneshot::Receiver<WriteOutcome>,
}

impl PendingWrite {
    /// Crea el par pendiente/resolutor. El backend retiene el sender y lo
    /// resuelve exactamente una vez.
    pub fn new(tx_id: TxId) -> (Self, oneshot::Sender<WriteOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx_id, rx }, tx)
    }

    /// Suspende hasta el desenlace. Un backend que suelta el sender sin
    /// resolver cuenta como fallo de transacción.
    pub async fn await_confirmation(self) -> Result<WriteOutcome, LedgerError> {
        self.rx
            .await
            .map_err(|_| LedgerError::Transaction("confirmation channel dropped".into()))
    }
}

/// Qué hacer con una escritura entrante frente al registro existente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterDecision {
    /// No había registro: se crea con `owner = submitter`.
    Created,
    /// Mismo owner, hash distinto: se actualiza el hash (re-atestación).
    Updated,
    /// Mismo owner, mismo hash: aceptado sin cambios (idempotente).
    Unchanged,
}

/// Política de sobrescritura compartida por todos los backends.
///
/// Invariante: el `owner` queda fijado en la primera escritura; una identidad
/// distinta jamás sobrescribe en silencio, recibe `OwnershipConflict` y el
/// registro queda intacto.
pub fn decide_register(existing: Option<&ArtifactRecord>,
                       new_hash: &ContentHash,
                       submitter: &AccountId)
                       -> Result<RegisterDecision, LedgerError> {
    match existing {
        None => Ok(RegisterDecision::Created),
        Some(rec) if rec.owner != *submitter => {
            Err(LedgerError::OwnershipConflict { name: rec.name.to_string(),
                                                 owner: rec.owner.to_string() })
        }
        Some(rec) if rec.content_hash == *new_hash => Ok(RegisterDecision::Unchanged),
        Some(_) => Ok(RegisterDecision::Updated),
    }
}

/// Backend del ledger. La escritura es asíncrona con confirmación separada;
/// la lectura refleja sólo estado confirmado.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Difunde `register(name, content_hash)` firmado por `submitter` y
    /// retorna el handle pendiente. El rechazo (p.ej. ownership) se reporta
    /// en la confirmación, no aquí.
    async fn submit(&self,
                    name: &ImageRef,
                    content_hash: &ContentHash,
                    submitter: &AccountId)
                    -> Result<PendingWrite, LedgerError>;

    /// Lectura pura del registro actual. `None` si el nombre no existe.
    async fn lookup(&self, name: &ImageRef) -> Result<Option<ArtifactRecord>, LedgerError>;
}
