//! Entity storage provider trait.

use async_trait::async_trait;
use idb_model::{Attribute, Entity, EntityScheduledChange, EntityState, Identity, IdentityParam};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for entity and identity storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait EntityProvider: Send + Sync {
    /// Creates a new entity with its first identity and the given
    /// root-group attributes.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the identity already exists.
    async fn create_entity(
        &self,
        identity: &IdentityParam,
        state: EntityState,
        root_attributes: &[Attribute],
    ) -> StorageResult<Entity>;

    /// Gets an entity by ID.
    async fn get_entity(&self, id: Uuid) -> StorageResult<Option<Entity>>;

    /// Finds the entity owning an identity with the given type and value.
    async fn find_entity_by_identity(
        &self,
        type_id: &str,
        value: &str,
    ) -> StorageResult<Option<Entity>>;

    /// Attaches an additional identity to an existing entity.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the identity already exists,
    /// `StorageError::NotFound` if the entity doesn't.
    async fn add_identity(&self, entity_id: Uuid, identity: &IdentityParam) -> StorageResult<()>;

    /// Removes an identity from an entity.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the identity doesn't exist.
    async fn remove_identity(
        &self,
        entity_id: Uuid,
        type_id: &str,
        value: &str,
    ) -> StorageResult<()>;

    /// Lists the identities attached to an entity.
    async fn list_identities(&self, entity_id: Uuid) -> StorageResult<Vec<Identity>>;

    /// Sets or clears the pending scheduled operation of an entity.
    ///
    /// An entity carries at most one pending change; setting a new one
    /// overwrites any previous schedule.
    async fn schedule_entity_change(
        &self,
        entity_id: Uuid,
        change: Option<EntityScheduledChange>,
    ) -> StorageResult<()>;
}
