// prov-domain library entry point
pub mod account;
pub mod artifact;
pub mod error;
pub use account::AccountId;
pub use artifact::{ArtifactRecord, ContentHash, ImageRef};
pub use error::DomainError;
