//! Errores del core (ledger y pipeline).

use prov_domain::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallos en el camino de escritura/lectura del ledger.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("ownership conflict: {name} already registered by {owner}")]
    OwnershipConflict { name: String, owner: String },
    #[error("transaction error: {0}")] Transaction(String),
    #[error("confirmation timeout")] ConfirmationTimeout,
    #[error("ledger backend error: {0}")] Backend(String),
}

/// Fallos terminales de una corrida del pipeline. Sin reintentos: cada
/// variante cierra el `BuildJob` que la produjo.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PipelineError {
    #[error("invalid build request: {0}")] Validation(#[from] DomainError),
    #[error("build tool exited with code {code}")] BuildTool { code: i32 },
    #[error("build tool could not start: {0}")] BuildSpawn(String),
    #[error("hash computation failed: {0}")] HashComputation(String),
    #[error(transparent)] Submit(#[from] LedgerError),
}
