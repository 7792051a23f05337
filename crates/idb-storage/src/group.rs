//! Group storage provider trait.

use async_trait::async_trait;
use idb_model::{Attribute, GroupMembership, Provenance};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for group and membership storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait GroupProvider: Send + Sync {
    /// Checks whether a group exists.
    async fn group_exists(&self, path: &str) -> StorageResult<bool>;

    /// Creates a group.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Conflict` if the parent group is missing,
    /// `StorageError::Duplicate` if the group already exists.
    async fn create_group(&self, path: &str) -> StorageResult<()>;

    /// Adds an entity to a group, recording provenance and storing the
    /// given attributes in that group.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the group or entity is
    /// missing, `StorageError::Duplicate` if the entity is already a
    /// member.
    async fn add_member(
        &self,
        path: &str,
        entity_id: Uuid,
        provenance: &Provenance,
        attributes: &[Attribute],
    ) -> StorageResult<()>;

    /// Removes an entity from a group.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the membership doesn't exist.
    async fn remove_member(&self, path: &str, entity_id: Uuid) -> StorageResult<()>;

    /// Gets the group memberships of an entity.
    async fn memberships(&self, entity_id: Uuid) -> StorageResult<Vec<GroupMembership>>;
}
