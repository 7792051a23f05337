//! Attribute storage provider trait.

use async_trait::async_trait;
use idb_model::{Attribute, StoredAttribute};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for attribute storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait AttributeProvider: Send + Sync {
    /// Gets all attributes of an entity, across all groups.
    async fn all_attributes(&self, entity_id: Uuid) -> StorageResult<Vec<StoredAttribute>>;

    /// Creates an attribute.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the entity already has an
    /// attribute with this name in the same group.
    async fn create_attribute(&self, entity_id: Uuid, attribute: &Attribute) -> StorageResult<()>;

    /// Creates or replaces an attribute.
    ///
    /// Replacing resets the confirmation state to unconfirmed.
    async fn set_attribute(&self, entity_id: Uuid, attribute: &Attribute) -> StorageResult<()>;

    /// Removes an attribute.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the attribute doesn't exist.
    async fn remove_attribute(
        &self,
        entity_id: Uuid,
        group_path: &str,
        name: &str,
    ) -> StorageResult<()>;

    /// Marks the current value set of an attribute as confirmed.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the attribute doesn't exist.
    async fn confirm_attribute(
        &self,
        entity_id: Uuid,
        group_path: &str,
        name: &str,
    ) -> StorageResult<()>;
}
