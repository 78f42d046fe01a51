//! prov-adapters: colaboradores externos detrás de los seams del core
//! (`BuildTool`, `ContentHasher`), más dobles deterministas para tests/demo.
pub mod build;
pub mod hasher;

pub use build::{DockerBuildTool, ScriptedBuildTool};
pub use hasher::{DockerInspectHasher, FixedHasher, Sha256FileHasher};
