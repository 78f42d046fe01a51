//! Gate de verificación: lectura-y-comparación previa al despliegue.
//!
//! Lectura pura a través de `LedgerBackend::lookup`: sin reintentos, sin
//! caché. La ausencia de registro es dato (`found: false`), no error; sólo
//! fallos de transporte hacia el backend se propagan como `Err`.

use crate::errors::LedgerError;
use crate::ledger::LedgerBackend;
use prov_domain::{AccountId, ContentHash, ImageRef};
use std::sync::Arc;

/// Resultado de la admisión. `matched` sólo se informa si el caller aportó
/// un hash esperado; `matched != Some(true)` debe bloquear el despliegue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub found: bool,
    pub hash: Option<ContentHash>,
    pub owner: Option<AccountId>,
    pub matched: Option<bool>,
}

pub struct VerificationGate {
    ledger: Arc<dyn LedgerBackend>,
}

impl VerificationGate {
    pub fn new(ledger: Arc<dyn LedgerBackend>) -> Self {
        Self { ledger }
    }

    /// Consulta el estado actual del registro. La comparación del hash es
    /// byte a byte, sin normalización.
    pub async fn check(&self,
                       name: &ImageRef,
                       expected_hash: Option<&str>)
                       -> Result<VerificationResult, LedgerError> {
        match self.ledger.lookup(name).await? {
            None => Ok(VerificationResult { found: false,
                                            hash: None,
                                            owner: None,
                                            matched: expected_hash.map(|_| false) }),
            Some(record) => {
                let matched = expected_hash.map(|exp| record.content_hash.as_str() == exp);
                Ok(VerificationResult { found: true,
                                        hash: Some(record.content_hash),
                                        owner: Some(record.owner),
                                        matched })
            }
        }
    }
}
