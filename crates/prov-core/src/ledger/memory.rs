//! Ledger en memoria: backend por defecto para demos y tests.
//!
//! Atomicidad a granularidad de registro vía la entry API de `DashMap`: una
//! lectura concurrente ve el valor pre o post escritura, nunca uno parcial.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;

use super::{ArtifactRecord, LedgerBackend, PendingWrite, RegisterDecision, RegistryEvent, TxId,
            WriteOutcome, decide_register};
use crate::errors::LedgerError;
use prov_domain::{AccountId, ContentHash, ImageRef};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct InMemoryLedger {
    records: DashMap<String, ArtifactRecord>,
    events: Mutex<Vec<RegistryEvent>>,
    seq: AtomicU64,
    audit_tx: broadcast::Sender<RegistryEvent>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let (audit_tx, _) = broadcast::channel(64);
        Self { records: DashMap::new(),
               events: Mutex::new(Vec::new()),
               seq: AtomicU64::new(0),
               audit_tx }
    }

    /// Suscripción al trail de auditoría (un evento por escritura aceptada).
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.audit_tx.subscribe()
    }

    /// Copia del trail de auditoría en orden de aceptación.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn apply(&self,
             name: &ImageRef,
             hash: &ContentHash,
             submitter: &AccountId,
             tx_id: &TxId,
             seq: u64)
             -> WriteOutcome {
        match self.records.entry(name.as_str().to_string()) {
            Entry::Occupied(mut occupied) => {
                match decide_register(Some(occupied.get()), hash, submitter) {
                    Err(e) => return WriteOutcome::Rejected(e),
                    Ok(RegisterDecision::Updated) => occupied.get_mut().content_hash = hash.clone(),
                    // Created es inalcanzable con entry ocupada; Unchanged no muta.
                    Ok(_) => {}
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ArtifactRecord::new(name.clone(), hash.clone(), submitter.clone()));
            }
        }

        let ev = RegistryEvent { seq,
                                 name: name.clone(),
                                 content_hash: hash.clone(),
                                 owner: submitter.clone(),
                                 tx_id: tx_id.clone(),
                                 ts: Utc::now() };
        if let Ok(mut guard) = self.events.lock() {
            guard.push(ev.clone());
        }
        let _ = self.audit_tx.send(ev);
        WriteOutcome::Confirmed(tx_id.clone())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn submit(&self,
                    name: &ImageRef,
                    content_hash: &ContentHash,
                    submitter: &AccountId)
                    -> Result<PendingWrite, LedgerError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let tx_id = TxId::derive(seq, name, content_hash, submitter);
        let (pending, resolve) = PendingWrite::new(tx_id.clone());
        // En memoria la escritura confirma de inmediato; el desenlace sigue
        // viajando por el canal para conservar la forma remota del contrato.
        let outcome = self.apply(name, content_hash, submitter, &tx_id, seq);
        let _ = resolve.send(outcome);
        Ok(pending)
    }

    async fn lookup(&self, name: &ImageRef) -> Result<Option<ArtifactRecord>, LedgerError> {
        Ok(self.records.get(name.as_str()).map(|r| r.value().clone()))
    }
}
