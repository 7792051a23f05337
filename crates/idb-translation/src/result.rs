//! Inbound mapping accumulator.
//!
//! A [`MappingResult`] is created empty per `translate()` call, populated
//! by actions in rule order, consumed exactly once by the inbound engine
//! and then discarded.

use idb_model::{Attribute, EntityScheduledChange, IdentityParam, Provenance};
use uuid::Uuid;

use crate::effect::{AttributeEffectMode, GroupEffectMode, IdentityEffectMode};

/// An identity proposed by a profile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedIdentity {
    /// The identity value with provenance attached.
    pub identity: IdentityParam,

    /// Merge policy.
    pub mode: IdentityEffectMode,
}

impl MappedIdentity {
    /// Creates a mapped identity.
    #[must_use]
    pub const fn new(identity: IdentityParam, mode: IdentityEffectMode) -> Self {
        Self { identity, mode }
    }
}

/// A group membership proposed by a profile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedGroup {
    /// Group path.
    pub group: String,

    /// Merge policy.
    pub mode: GroupEffectMode,

    /// Where the membership came from.
    pub provenance: Provenance,
}

impl MappedGroup {
    /// Creates a mapped group.
    #[must_use]
    pub fn new(group: impl Into<String>, mode: GroupEffectMode, provenance: Provenance) -> Self {
        Self {
            group: group.into(),
            mode,
            provenance,
        }
    }
}

/// An attribute proposed by a profile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedAttribute {
    /// The attribute with provenance attached.
    pub attribute: Attribute,

    /// Merge policy.
    pub mode: AttributeEffectMode,
}

impl MappedAttribute {
    /// Creates a mapped attribute.
    #[must_use]
    pub const fn new(attribute: Attribute, mode: AttributeEffectMode) -> Self {
        Self { attribute, mode }
    }
}

/// A scheduled entity operation proposed by a profile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedEntityChange {
    /// The operation and its trigger time.
    pub change: EntityScheduledChange,

    /// Which run scheduled it.
    pub provenance: Provenance,
}

impl MappedEntityChange {
    /// Creates a mapped entity change.
    #[must_use]
    pub const fn new(change: EntityScheduledChange, provenance: Provenance) -> Self {
        Self { change, provenance }
    }
}

/// Accumulator of all mutations proposed by one inbound profile run.
#[derive(Debug, Clone, Default)]
pub struct MappingResult {
    identities: Vec<MappedIdentity>,
    groups: Vec<MappedGroup>,
    attributes: Vec<MappedAttribute>,
    entity_changes: Vec<MappedEntityChange>,
    clean_stale: bool,
    authenticated_with: Vec<String>,
    mapped_entity: Option<Uuid>,
}

impl MappingResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mapped identity.
    pub fn add_identity(&mut self, identity: MappedIdentity) {
        self.identities.push(identity);
    }

    /// Records a mapped group.
    pub fn add_group(&mut self, group: MappedGroup) {
        self.groups.push(group);
    }

    /// Records a mapped attribute.
    pub fn add_attribute(&mut self, attribute: MappedAttribute) {
        self.attributes.push(attribute);
    }

    /// Records a scheduled entity change.
    pub fn add_entity_change(&mut self, change: MappedEntityChange) {
        self.entity_changes.push(change);
    }

    /// Requests stale-data removal at apply time.
    pub fn request_clean_stale(&mut self) {
        self.clean_stale = true;
    }

    /// Whether stale-data removal was requested by this run.
    #[must_use]
    pub const fn clean_stale(&self) -> bool {
        self.clean_stale
    }

    /// The mapped identities, in rule order.
    #[must_use]
    pub fn identities(&self) -> &[MappedIdentity] {
        &self.identities
    }

    /// The mapped groups, in rule order.
    #[must_use]
    pub fn groups(&self) -> &[MappedGroup] {
        &self.groups
    }

    /// The mapped attributes, in rule order.
    #[must_use]
    pub fn attributes(&self) -> &[MappedAttribute] {
        &self.attributes
    }

    /// The scheduled entity changes, in rule order.
    #[must_use]
    pub fn entity_changes(&self) -> &[MappedEntityChange] {
        &self.entity_changes
    }

    /// Records an identity value that resolved or created the mapped
    /// entity.
    pub fn add_authenticated_with(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.authenticated_with.contains(&value) {
            self.authenticated_with.push(value);
        }
    }

    /// The identity values that resolved or created the mapped entity.
    #[must_use]
    pub fn authenticated_with(&self) -> &[String] {
        &self.authenticated_with
    }

    /// Sets the entity the run resolved to, once known.
    pub fn set_mapped_entity(&mut self, entity: Option<Uuid>) {
        self.mapped_entity = entity;
    }

    /// The entity the run resolved to, populated by the engine.
    #[must_use]
    pub const fn mapped_entity(&self) -> Option<Uuid> {
        self.mapped_entity
    }

    /// The provenance tag of this run, derived from the first mapped
    /// identity.
    #[must_use]
    pub fn run_provenance(&self) -> Provenance {
        self.identities
            .first()
            .map(|mi| mi.identity.provenance.clone())
            .unwrap_or_else(Provenance::local)
    }

    /// The mapped attributes scoped to one group.
    #[must_use]
    pub fn attributes_in_group(&self, group_path: &str) -> Vec<Attribute> {
        self.attributes
            .iter()
            .filter(|ma| ma.attribute.group_path == group_path)
            .map(|ma| ma.attribute.clone())
            .collect()
    }
}
