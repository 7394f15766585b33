use thiserror::Error;

/// Error type that captures crate-level failures outside the backend seam.
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failures reported by the hosted backend or its transport.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not authorized")]
    Unauthorized,
    #[error("access forbidden")]
    Forbidden,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
