use thiserror::Error;

/// Errors surfaced by every team, invitation and matching operation
///
/// A failed check aborts the whole transaction, so none of these leave
/// partially applied state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A referenced team, user, invitation or match request does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting user lacks the role the operation requires
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A business rule rejects the operation in the current state
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Duplicate entity or a race lost to a concurrent transaction
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The persistence layer failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::PolicyViolation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
