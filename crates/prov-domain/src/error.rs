use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid image name: {0}")]
    InvalidImageName(String),
    #[error("invalid source location: {0:?}")]
    InvalidSourceLocation(String),
    #[error("invalid account identifier: {0}")]
    InvalidAccount(String),
    #[error("content hash must not be empty")]
    EmptyHash,
}
