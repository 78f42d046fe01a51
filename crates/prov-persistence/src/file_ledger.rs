//! Ledger durable sobre un documento JSON.
//!
//! Reglas clave:
//! - Escritura load-modify-write bajo un flock exclusivo sobre un archivo
//!   `.lock` hermano: dos procesos (o dos instancias) sobre el mismo path
//!   no pueden intercalarse y pisar escrituras confirmadas. El rename
//!   atómico garantiza además que un lector ve el documento pre o post
//!   escritura, nunca uno truncado.
//! - La política de ownership es exactamente la de `decide_register`; un
//!   rechazo no toca el archivo.
//! - `seq` en el documento hace deterministas los tx-ids entre corridas.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use prov_core::{ArtifactRecord, LedgerBackend, LedgerError, PendingWrite, RegisterDecision,
                RegistryEvent, TxId, WriteOutcome, decide_register};
use prov_domain::{AccountId, ContentHash, ImageRef};

use crate::error::PersistenceError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    content_hash: ContentHash,
    owner: AccountId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    seq: u64,
    records: BTreeMap<String, StoredRecord>,
    events: Vec<RegistryEvent>,
}

pub struct FileLedger {
    path: PathBuf,
    // Serializa escritores de la misma instancia; la exclusión entre
    // instancias y entre procesos la da el flock de `lock_exclusive`.
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path, write_lock: Mutex::new(()) }
    }

    /// Toma el flock exclusivo del ledger. El lock vive mientras viva el
    /// `File` devuelto; cada submit abre su propio descriptor, así que
    /// también excluye a otra instancia dentro del mismo proceso.
    async fn lock_exclusive(&self) -> Result<std::fs::File, PersistenceError> {
        let lock_path = self.path.with_extension("lock");
        tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new().create(true)
                                                  .read(true)
                                                  .write(true)
                                                  .open(&lock_path)?;
            fs2::FileExt::lock_exclusive(&file)?;
            Ok::<_, PersistenceError>(file)
        })
        .await
        .map_err(|e| PersistenceError::Io(e.to_string()))?
    }

    async fn load(&self) -> Result<LedgerDocument, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LedgerDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, doc: &LedgerDocument) -> Result<(), PersistenceError> {
        // Nombre por proceso: dos escritores nunca comparten el temporal.
        let tmp = self.path.with_extension(format!("tmp.{}", std::process::id()));
        let bytes = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Trail de auditoría completo, en orden de aceptación.
    pub async fn events(&self) -> Result<Vec<RegistryEvent>, PersistenceError> {
        Ok(self.load().await?.events)
    }
}

#[async_trait]
impl LedgerBackend for FileLedger {
    async fn submit(&self,
                    name: &ImageRef,
                    content_hash: &ContentHash,
                    submitter: &AccountId)
                    -> Result<PendingWrite, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let _flock = self.lock_exclusive().await.map_err(LedgerError::from)?;
        let mut doc = self.load().await.map_err(LedgerError::from)?;

        let seq = doc.seq;
        let tx_id = TxId::derive(seq, name, content_hash, submitter);
        let (pending, resolve) = PendingWrite::new(tx_id.clone());

        let existing = doc.records.get(name.as_str()).map(|r| {
            ArtifactRecord::new(name.clone(), r.content_hash.clone(), r.owner.clone())
        });

        match decide_register(existing.as_ref(), content_hash, submitter) {
            Err(e) => {
                warn!("rejected write for {}: {}", name, e);
                let _ = resolve.send(WriteOutcome::Rejected(e));
            }
            Ok(decision) => {
                if decision != RegisterDecision::Unchanged {
                    doc.records.insert(name.as_str().to_string(),
                                       StoredRecord { content_hash: content_hash.clone(),
                                                      owner: submitter.clone() });
                }
                doc.events.push(RegistryEvent { seq,
                                                name: name.clone(),
                                                content_hash: content_hash.clone(),
                                                owner: submitter.clone(),
                                                tx_id: tx_id.clone(),
                                                ts: Utc::now() });
                doc.seq = seq + 1;
                self.store(&doc).await.map_err(LedgerError::from)?;
                debug!("{:?} {} as {} (tx {})", decision, name, submitter, tx_id);
                let _ = resolve.send(WriteOutcome::Confirmed(tx_id));
            }
        }
        Ok(pending)
    }

    async fn lookup(&self, name: &ImageRef) -> Result<Option<ArtifactRecord>, LedgerError> {
        let doc = self.load().await.map_err(LedgerError::from)?;
        Ok(doc.records.get(name.as_str()).map(|r| {
            ArtifactRecord::new(name.clone(), r.content_hash.clone(), r.owner.clone())
        }))
    }
}
