//! Build tools: proceso `docker build` real y una variante guionada.
//!
//! Reglas clave:
//! - La salida se consume línea a línea y se reenvía de inmediato; no hay
//!   buffering hasta fin de proceso.
//! - `Exited` es siempre el último elemento del stream: los lectores de
//!   stdout/stderr se agotan antes de reportar el código de salida.
//! - `kill_on_drop`: abortar la tarea dueña de la corrida mata el subproceso.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use prov_core::{BuildOutput, BuildTool, PipelineError};
use prov_domain::ImageRef;
use std::process::Stdio;

/// `docker build -t <image> <source>` como subproceso con salida streaming.
pub struct DockerBuildTool {
    program: String,
}

impl DockerBuildTool {
    pub fn new() -> Self {
        Self { program: "docker".to_string() }
    }

    /// Permite apuntar a un binario compatible (p.ej. podman) sin tocar el
    /// resto del pipeline.
    pub fn with_program(program: &str) -> Self {
        Self { program: program.to_string() }
    }
}

impl Default for DockerBuildTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildTool for DockerBuildTool {
    async fn start(&self,
                   image: &ImageRef,
                   source_location: &str)
                   -> Result<mpsc::Receiver<BuildOutput>, PipelineError> {
        let mut child = Command::new(&self.program)
            .args(["build", "-t", image.as_str(), source_location])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::BuildSpawn(e.to_string()))?;

        let stdout = child.stdout
                          .take()
                          .ok_or_else(|| PipelineError::BuildSpawn("stdout not captured".into()))?;
        let stderr = child.stderr
                          .take()
                          .ok_or_else(|| PipelineError::BuildSpawn("stderr not captured".into()))?;

        let (tx, rx) = mpsc::channel(64);

        let tx_out = tx.clone();
        let out_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx_out.send(BuildOutput::Line(line)).await.is_err() {
                    break;
                }
            }
        });

        let tx_err = tx.clone();
        let err_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx_err.send(BuildOutput::Stderr(line)).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            // Agotar ambos canales antes de emitir el código de salida.
            let _ = out_task.await;
            let _ = err_task.await;
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(_) => -1,
            };
            let _ = tx.send(BuildOutput::Exited(code)).await;
        });

        Ok(rx)
    }
}

/// Build tool guionado: reproduce una secuencia fija de líneas y un código
/// de salida. Determinista, sin IO; para tests y el demo.
#[derive(Debug, Clone)]
pub struct ScriptedBuildTool {
    outputs: Vec<BuildOutput>,
}

impl ScriptedBuildTool {
    pub fn new(outputs: Vec<BuildOutput>) -> Self {
        Self { outputs }
    }

    /// Guion que termina con exit 0.
    pub fn succeeding(lines: &[&str]) -> Self {
        let mut outputs: Vec<BuildOutput> =
            lines.iter().map(|l| BuildOutput::Line(l.to_string())).collect();
        outputs.push(BuildOutput::Exited(0));
        Self { outputs }
    }

    /// Guion que termina con un código de fallo.
    pub fn failing(lines: &[&str], code: i32) -> Self {
        let mut outputs: Vec<BuildOutput> =
            lines.iter().map(|l| BuildOutput::Line(l.to_string())).collect();
        outputs.push(BuildOutput::Exited(code));
        Self { outputs }
    }
}

#[async_trait]
impl BuildTool for ScriptedBuildTool {
    async fn start(&self,
                   _image: &ImageRef,
                   _source_location: &str)
                   -> Result<mpsc::Receiver<BuildOutput>, PipelineError> {
        let (tx, rx) = mpsc::channel(64);
        let outputs = self.outputs.clone();
        tokio::spawn(async move {
            for out in outputs {
                if tx.send(out).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
