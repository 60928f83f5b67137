use thiserror::Error;

/// Failures surfaced by the book and notes stores.
///
/// The first three variants carry the operator-facing message verbatim; the
/// HTTP layer maps them to 400/404/409. Everything else is an unexpected
/// fault and answers as a generic 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
