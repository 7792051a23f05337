//! Translation error types.
//!
//! Only configuration errors and persistence errors may abort an
//! operation; everything else degrades to "rule had no effect" at rule
//! evaluation time and never reaches this taxonomy.

use idb_storage::StorageError;
use thiserror::Error;

/// Errors that can occur during profile management and translation.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Invalid configuration (bad action parameters, editing a system
    /// profile, unresolvable included profile).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A referenced profile does not exist.
    #[error("Translation profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile inclusion formed a cycle.
    #[error("Cyclic profile inclusion detected at '{0}'")]
    CyclicInclusion(String),

    /// The profile run produced no identity for the principal.
    #[error("The translation profile did not map the principal to any identity")]
    NoIdentityMapped,

    /// The profile run mapped the input to two different entities.
    #[error("Input was mapped to two different entities: {0}")]
    IdentityConflict(String),

    /// A `REQUIRE_MATCH` identity does not exist locally.
    #[error("Identity {0} does not exist locally but the profile requires a match")]
    RequiredIdentityMissing(String),

    /// Storage failure; the surrounding transaction is rolled back.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TranslationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Checks if this is a configuration-class error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::ProfileNotFound(_) | Self::CyclicInclusion(_)
        )
    }

    /// Checks if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type for translation operations.
pub type EngineResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_class_covers_profile_resolution() {
        assert!(TranslationError::config("bad").is_configuration());
        assert!(TranslationError::ProfileNotFound("p1".into()).is_configuration());
        assert!(TranslationError::CyclicInclusion("p1".into()).is_configuration());
        assert!(!TranslationError::NoIdentityMapped.is_configuration());
    }
}
