//! Identidad criptográfica que firma escrituras en el ledger.
//!
//! La comparación es byte a byte: no se normaliza mayúsculas/minúsculas ni
//! se recortan espacios. Dos `AccountId` con distinta capitalización son
//! identidades distintas.

use serde::{Deserialize, Serialize};

use crate::DomainError;
use std::fmt;

/// Identificador de cuenta con forma `0x` + dígitos hexadecimales.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Valida la forma del identificador. No normaliza el contenido.
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let hex = raw
            .strip_prefix("0x")
            .ok_or_else(|| DomainError::InvalidAccount(raw.to_string()))?;
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidAccount(raw.to_string()));
        }
        Ok(AccountId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
