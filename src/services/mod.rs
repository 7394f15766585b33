pub mod budget_service;

pub use budget_service::BudgetService;

use crate::errors::RepositoryError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Duplicate(String),
}

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn ensure_amount(label: &str, amount: f64) -> ServiceResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ServiceError::Invalid(format!(
            "{} must be a positive amount",
            label
        )))
    }
}

pub(crate) fn ensure_name(label: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        Err(ServiceError::Invalid(format!("{} is required", label)))
    } else {
        Ok(())
    }
}
