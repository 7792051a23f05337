//! In-memory reference store.
//!
//! Backs the engine tests and small embedded deployments. Transactions
//! are snapshot-based: `begin` clones the state, `rollback` restores it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use idb_model::{
    Attribute, Entity, EntityScheduledChange, EntityState, GroupMembership, Identity,
    IdentityParam, Provenance, StoredAttribute,
};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::attribute::AttributeProvider;
use crate::entity::EntityProvider;
use crate::error::{StorageError, StorageResult};
use crate::group::GroupProvider;
use crate::store::DirectoryStore;

#[derive(Debug, Clone)]
struct State {
    entities: HashMap<Uuid, Entity>,
    identities: Vec<Identity>,
    groups: HashSet<String>,
    memberships: Vec<GroupMembership>,
    attributes: HashMap<Uuid, Vec<StoredAttribute>>,
}

impl State {
    fn new() -> Self {
        let mut groups = HashSet::new();
        groups.insert(idb_model::group::ROOT_GROUP.to_string());
        Self {
            entities: HashMap::new(),
            identities: Vec::new(),
            groups,
            memberships: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    fn upsert_attribute(&mut self, entity_id: Uuid, attribute: &Attribute) {
        let slot = self.attributes.entry(entity_id).or_default();
        match slot
            .iter_mut()
            .find(|a| a.attribute.same_slot(&attribute.group_path, &attribute.name))
        {
            Some(existing) => {
                existing.attribute = attribute.clone();
                existing.confirmed = false;
                existing.updated_at = Utc::now();
            }
            None => slot.push(StoredAttribute::new(attribute.clone())),
        }
    }
}

/// In-memory identity store.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    snapshots: Mutex<Vec<State>>,
    fail_on: RwLock<Option<String>>,
}

impl MemoryStore {
    /// Creates an empty store containing only the root group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::new()),
            snapshots: Mutex::new(Vec::new()),
            fail_on: RwLock::new(None),
        }
    }

    /// Injects a failure for the next call of the named operation.
    ///
    /// Test support for exercising transaction rollback paths.
    pub fn fail_on(&self, operation: impl Into<String>) {
        *self.fail_on.write() = Some(operation.into());
    }

    fn check_fail(&self, operation: &str) -> StorageResult<()> {
        let mut armed = self.fail_on.write();
        if armed.as_deref() == Some(operation) {
            *armed = None;
            return Err(StorageError::internal(format!(
                "injected failure in {operation}"
            )));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityProvider for MemoryStore {
    async fn create_entity(
        &self,
        identity: &IdentityParam,
        state: EntityState,
        root_attributes: &[Attribute],
    ) -> StorageResult<Entity> {
        self.check_fail("create_entity")?;
        let mut guard = self.state.write();
        if guard
            .identities
            .iter()
            .any(|i| i.param.same_identity(&identity.type_id, &identity.value))
        {
            return Err(StorageError::duplicate(format!(
                "identity {}:{}",
                identity.type_id, identity.value
            )));
        }
        let entity = Entity::new(state);
        guard.entities.insert(entity.id, entity.clone());
        guard
            .identities
            .push(Identity::new(entity.id, identity.clone()));
        guard.memberships.push(GroupMembership::new(
            idb_model::group::ROOT_GROUP,
            entity.id,
            Provenance::local(),
        ));
        for attribute in root_attributes {
            guard.upsert_attribute(entity.id, attribute);
        }
        Ok(entity)
    }

    async fn get_entity(&self, id: Uuid) -> StorageResult<Option<Entity>> {
        Ok(self.state.read().entities.get(&id).cloned())
    }

    async fn find_entity_by_identity(
        &self,
        type_id: &str,
        value: &str,
    ) -> StorageResult<Option<Entity>> {
        let guard = self.state.read();
        let entity = guard
            .identities
            .iter()
            .find(|i| i.param.same_identity(type_id, value))
            .and_then(|i| guard.entities.get(&i.entity_id))
            .cloned();
        Ok(entity)
    }

    async fn add_identity(&self, entity_id: Uuid, identity: &IdentityParam) -> StorageResult<()> {
        self.check_fail("add_identity")?;
        let mut guard = self.state.write();
        if !guard.entities.contains_key(&entity_id) {
            return Err(StorageError::not_found(format!("entity {entity_id}")));
        }
        if guard
            .identities
            .iter()
            .any(|i| i.param.same_identity(&identity.type_id, &identity.value))
        {
            return Err(StorageError::duplicate(format!(
                "identity {}:{}",
                identity.type_id, identity.value
            )));
        }
        guard
            .identities
            .push(Identity::new(entity_id, identity.clone()));
        Ok(())
    }

    async fn remove_identity(
        &self,
        entity_id: Uuid,
        type_id: &str,
        value: &str,
    ) -> StorageResult<()> {
        self.check_fail("remove_identity")?;
        let mut guard = self.state.write();
        let before = guard.identities.len();
        guard
            .identities
            .retain(|i| !(i.entity_id == entity_id && i.param.same_identity(type_id, value)));
        if guard.identities.len() == before {
            return Err(StorageError::not_found(format!(
                "identity {type_id}:{value}"
            )));
        }
        Ok(())
    }

    async fn list_identities(&self, entity_id: Uuid) -> StorageResult<Vec<Identity>> {
        Ok(self
            .state
            .read()
            .identities
            .iter()
            .filter(|i| i.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn schedule_entity_change(
        &self,
        entity_id: Uuid,
        change: Option<EntityScheduledChange>,
    ) -> StorageResult<()> {
        self.check_fail("schedule_entity_change")?;
        let mut guard = self.state.write();
        let entity = guard
            .entities
            .get_mut(&entity_id)
            .ok_or_else(|| StorageError::not_found(format!("entity {entity_id}")))?;
        entity.scheduled_change = change;
        Ok(())
    }
}

#[async_trait]
impl GroupProvider for MemoryStore {
    async fn group_exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.state.read().groups.contains(path))
    }

    async fn create_group(&self, path: &str) -> StorageResult<()> {
        self.check_fail("create_group")?;
        if !idb_model::group::is_valid_path(path) {
            return Err(StorageError::conflict(format!("invalid group path {path}")));
        }
        let mut guard = self.state.write();
        if guard.groups.contains(path) {
            return Err(StorageError::duplicate(format!("group {path}")));
        }
        if let Some(parent) = idb_model::group::parent_path(path) {
            if !guard.groups.contains(&parent) {
                return Err(StorageError::conflict(format!(
                    "parent group {parent} of {path} does not exist"
                )));
            }
        }
        guard.groups.insert(path.to_string());
        Ok(())
    }

    async fn add_member(
        &self,
        path: &str,
        entity_id: Uuid,
        provenance: &Provenance,
        attributes: &[Attribute],
    ) -> StorageResult<()> {
        self.check_fail("add_member")?;
        let mut guard = self.state.write();
        if !guard.groups.contains(path) {
            return Err(StorageError::not_found(format!("group {path}")));
        }
        if !guard.entities.contains_key(&entity_id) {
            return Err(StorageError::not_found(format!("entity {entity_id}")));
        }
        if guard
            .memberships
            .iter()
            .any(|m| m.entity_id == entity_id && m.group == path)
        {
            return Err(StorageError::duplicate(format!(
                "membership of {entity_id} in {path}"
            )));
        }
        guard
            .memberships
            .push(GroupMembership::new(path, entity_id, provenance.clone()));
        for attribute in attributes {
            guard.upsert_attribute(entity_id, attribute);
        }
        Ok(())
    }

    async fn remove_member(&self, path: &str, entity_id: Uuid) -> StorageResult<()> {
        self.check_fail("remove_member")?;
        let mut guard = self.state.write();
        let before = guard.memberships.len();
        guard
            .memberships
            .retain(|m| !(m.entity_id == entity_id && m.group == path));
        if guard.memberships.len() == before {
            return Err(StorageError::not_found(format!(
                "membership of {entity_id} in {path}"
            )));
        }
        Ok(())
    }

    async fn memberships(&self, entity_id: Uuid) -> StorageResult<Vec<GroupMembership>> {
        Ok(self
            .state
            .read()
            .memberships
            .iter()
            .filter(|m| m.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttributeProvider for MemoryStore {
    async fn all_attributes(&self, entity_id: Uuid) -> StorageResult<Vec<StoredAttribute>> {
        Ok(self
            .state
            .read()
            .attributes
            .get(&entity_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_attribute(&self, entity_id: Uuid, attribute: &Attribute) -> StorageResult<()> {
        self.check_fail("create_attribute")?;
        let mut guard = self.state.write();
        let slot = guard.attributes.entry(entity_id).or_default();
        if slot
            .iter()
            .any(|a| a.attribute.same_slot(&attribute.group_path, &attribute.name))
        {
            return Err(StorageError::duplicate(format!(
                "attribute {} in {}",
                attribute.name, attribute.group_path
            )));
        }
        slot.push(StoredAttribute::new(attribute.clone()));
        Ok(())
    }

    async fn set_attribute(&self, entity_id: Uuid, attribute: &Attribute) -> StorageResult<()> {
        self.check_fail("set_attribute")?;
        self.state.write().upsert_attribute(entity_id, attribute);
        Ok(())
    }

    async fn remove_attribute(
        &self,
        entity_id: Uuid,
        group_path: &str,
        name: &str,
    ) -> StorageResult<()> {
        self.check_fail("remove_attribute")?;
        let mut guard = self.state.write();
        let slot = guard
            .attributes
            .get_mut(&entity_id)
            .ok_or_else(|| StorageError::not_found(format!("attribute {name} in {group_path}")))?;
        let before = slot.len();
        slot.retain(|a| !a.attribute.same_slot(group_path, name));
        if slot.len() == before {
            return Err(StorageError::not_found(format!(
                "attribute {name} in {group_path}"
            )));
        }
        Ok(())
    }

    async fn confirm_attribute(
        &self,
        entity_id: Uuid,
        group_path: &str,
        name: &str,
    ) -> StorageResult<()> {
        let mut guard = self.state.write();
        let stored = guard
            .attributes
            .get_mut(&entity_id)
            .and_then(|slot| {
                slot.iter_mut()
                    .find(|a| a.attribute.same_slot(group_path, name))
            })
            .ok_or_else(|| StorageError::not_found(format!("attribute {name} in {group_path}")))?;
        stored.confirmed = true;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn begin(&self) -> StorageResult<()> {
        let snapshot = self.state.read().clone();
        self.snapshots.lock().push(snapshot);
        Ok(())
    }

    async fn commit(&self) -> StorageResult<()> {
        self.snapshots
            .lock()
            .pop()
            .map(|_| ())
            .ok_or_else(|| StorageError::transaction("commit without begin"))
    }

    async fn rollback(&self) -> StorageResult<()> {
        let snapshot = self
            .snapshots
            .lock()
            .pop()
            .ok_or_else(|| StorageError::transaction("rollback without begin"))?;
        *self.state.write() = snapshot;
        Ok(())
    }
}
