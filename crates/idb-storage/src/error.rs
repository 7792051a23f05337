//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with the same key already exists.
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// The operation conflicts with the current state (e.g. creating a
    /// group whose parent is missing).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transaction handling failed (e.g. commit without begin).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Internal storage failure.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(what: impl Into<String>) -> Self {
        Self::Duplicate(what.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a transaction error.
    #[must_use]
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Checks if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        assert!(StorageError::not_found("entity").is_not_found());
        assert!(StorageError::duplicate("identity").is_duplicate());
        assert!(!StorageError::conflict("parent missing").is_not_found());
    }
}
