//! prov-persistence: backend durable del ledger sobre un documento JSON.
//!
//! Contraparte persistente de `InMemoryLedger`: mismo contrato
//! (`LedgerBackend`) y misma política de sobrescritura (`decide_register`
//! compartida con el core), con durabilidad vía rename atómico de archivo.
pub mod config;
pub mod error;
pub mod file_ledger;

pub use config::{LedgerConfig, init_dotenv};
pub use error::PersistenceError;
pub use file_ledger::FileLedger;
