//! Hashers de contenido. El core sólo exige determinismo y codificación
//! textual estable; el formato concreto lo fija cada implementación.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use prov_core::{ContentHasher, PipelineError};
use prov_domain::{ContentHash, ImageRef};
use std::path::PathBuf;

/// Huella de una imagen ya construida vía `docker inspect --format {{.Id}}`.
/// El id reportado por el daemon es el hash de contenido de la imagen.
pub struct DockerInspectHasher {
    program: String,
}

impl DockerInspectHasher {
    pub fn new() -> Self {
        Self { program: "docker".to_string() }
    }
}

impl Default for DockerInspectHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentHasher for DockerInspectHasher {
    async fn hash_artifact(&self, image: &ImageRef) -> Result<ContentHash, PipelineError> {
        let out = Command::new(&self.program)
            .args(["inspect", "--format", "{{.Id}}", image.as_str()])
            .output()
            .await
            .map_err(|e| PipelineError::HashComputation(e.to_string()))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(PipelineError::HashComputation(stderr.trim().to_string()));
        }
        let id = String::from_utf8_lossy(&out.stdout)
            .trim()
            .trim_matches('"')
            .to_string();
        ContentHash::new(&id).map_err(|e| PipelineError::HashComputation(e.to_string()))
    }
}

/// Huella sha256 de un archivo local. Usada cuando el artefacto es un archivo
/// en disco (tests, demo) en lugar de una imagen en el daemon.
pub struct Sha256FileHasher {
    path: PathBuf,
}

impl Sha256FileHasher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ContentHasher for Sha256FileHasher {
    async fn hash_artifact(&self, _image: &ImageRef) -> Result<ContentHash, PipelineError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PipelineError::HashComputation(format!("{}: {e}", self.path.display())))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hex = format!("sha256:{:x}", hasher.finalize());
        ContentHash::new(&hex).map_err(|e| PipelineError::HashComputation(e.to_string()))
    }
}

/// Hasher fijo para tests y demo: siempre la misma huella.
#[derive(Debug, Clone)]
pub struct FixedHasher {
    hash: String,
}

impl FixedHasher {
    pub fn new(hash: &str) -> Self {
        Self { hash: hash.to_string() }
    }
}

#[async_trait]
impl ContentHasher for FixedHasher {
    async fn hash_artifact(&self, _image: &ImageRef) -> Result<ContentHash, PipelineError> {
        ContentHash::new(&self.hash).map_err(|e| PipelineError::HashComputation(e.to_string()))
    }
}
