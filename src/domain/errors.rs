use thiserror::Error;

use super::advisory::AdvisoryState;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("artifact table has no entry for state {0}")]
    MissingArtifact(AdvisoryState),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
