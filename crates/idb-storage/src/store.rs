//! Combined store trait with the transaction boundary.

use async_trait::async_trait;

use crate::attribute::AttributeProvider;
use crate::entity::EntityProvider;
use crate::error::StorageResult;
use crate::group::GroupProvider;

/// The full identity store the translation engine drives.
///
/// The engine wraps every `process()` run in one transaction: either all
/// accumulated mutations commit, or none do.
#[async_trait]
pub trait DirectoryStore: EntityProvider + GroupProvider + AttributeProvider {
    /// Begins a transaction.
    async fn begin(&self) -> StorageResult<()>;

    /// Commits the current transaction.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Transaction` if no transaction is open.
    async fn commit(&self) -> StorageResult<()>;

    /// Rolls back the current transaction, discarding all mutations made
    /// since `begin`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Transaction` if no transaction is open.
    async fn rollback(&self) -> StorageResult<()>;
}
