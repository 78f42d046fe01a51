//! Tipos del registro de procedencia: nombre de imagen, hash de contenido y
//! el registro completo (nombre, hash, dueño).
//!
//! Reglas clave:
//! - `ContentHash` es opaco para el ledger: sólo se exige no-vacío. El formato
//!   concreto lo decide el hasher externo (determinismo exigido allí).
//! - Las comparaciones son byte a byte, sin normalización.
//! - `ArtifactRecord` fija su `owner` en la primera escritura; ese invariante
//!   lo hace cumplir el ledger, no este tipo.

use serde::{Deserialize, Serialize};

use crate::{AccountId, DomainError};
use std::fmt;

/// Nombre de imagen (p.ej. `demo:v1`). Clave única dentro del ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Valida no-vacío y ausencia de espacios (romperían la línea de build).
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() || raw.chars().any(|c| c.is_whitespace()) {
            return Err(DomainError::InvalidImageName(raw.to_string()));
        }
        Ok(ImageRef(raw.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Huella de contenido del artefacto. Opaca: el ledger no valida su formato.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::EmptyHash);
        }
        Ok(ContentHash(raw.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registro de atestación: un artefacto registrado en el ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: ImageRef,
    pub content_hash: ContentHash,
    pub owner: AccountId,
}

impl ArtifactRecord {
    pub fn new(name: ImageRef, content_hash: ContentHash, owner: AccountId) -> Self {
        Self { name, content_hash, owner }
    }
}
