//! Inbound engine: applies a mapping result to the identity store.
//!
//! One `process()` call is one transaction. The apply order is fixed:
//! resolve or create the entity from the mapped identities, then group
//! memberships, then attributes, then scheduled entity changes, with
//! stale-data reconciliation interleaved where the data lives. Re-running
//! the same mapping against the resulting state is a no-op.

use std::collections::HashSet;
use std::sync::Arc;

use idb_model::EntityState;
use uuid::Uuid;

use idb_storage::{AttributeProvider, DirectoryStore, EntityProvider, GroupProvider};

use crate::effect::{AttributeEffectMode, GroupEffectMode, IdentityEffectMode};
use crate::error::{EngineResult, TranslationError};
use crate::result::{MappedIdentity, MappingResult};

/// Applies inbound mapping results to a [`DirectoryStore`].
pub struct InputTranslationEngine {
    store: Arc<dyn DirectoryStore>,
}

impl InputTranslationEngine {
    /// Creates an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Applies a mapping result in one transaction.
    ///
    /// On success the result's mapped entity is populated. Any failure
    /// rolls the transaction back and leaves the store untouched.
    pub async fn process(&self, result: &mut MappingResult) -> EngineResult<()> {
        self.store.begin().await?;
        match self.apply(result).await {
            Ok(()) => {
                self.store.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(&self, result: &mut MappingResult) -> EngineResult<()> {
        // Attribute slots already written during entity creation or group
        // joins; the attribute phase must not touch them again.
        let mut written_attrs: HashSet<(String, String)> = HashSet::new();

        let entity_id = self.process_identities(result, &mut written_attrs).await?;
        result.set_mapped_entity(Some(entity_id));
        tracing::debug!(%entity_id, "mapped entity resolved");

        self.process_groups(result, entity_id, &mut written_attrs)
            .await?;
        self.process_attributes(result, entity_id, &written_attrs)
            .await?;
        self.process_entity_changes(result, entity_id).await?;
        Ok(())
    }

    /// Resolves the mapped identities to exactly one entity, creating one
    /// when allowed, and attaches the remaining identities as equivalents.
    async fn process_identities(
        &self,
        result: &mut MappingResult,
        written_attrs: &mut HashSet<(String, String)>,
    ) -> EngineResult<Uuid> {
        let mapped = result.identities().to_vec();
        if mapped.is_empty() {
            return Err(TranslationError::NoIdentityMapped);
        }

        let mut existing: Option<Uuid> = None;
        let mut to_create: Vec<MappedIdentity> = Vec::new();
        let mut update_or_match: Vec<MappedIdentity> = Vec::new();

        for mi in &mapped {
            let found = self
                .store
                .find_entity_by_identity(&mi.identity.type_id, &mi.identity.value)
                .await?;
            match found {
                Some(entity) => {
                    if let Some(already) = existing {
                        if already != entity.id {
                            return Err(TranslationError::IdentityConflict(format!(
                                "{}:{} resolves {} but {} was already matched",
                                mi.identity.type_id, mi.identity.value, entity.id, already
                            )));
                        }
                    }
                    existing = Some(entity.id);
                    result.add_authenticated_with(mi.identity.value.clone());
                }
                None => match mi.mode {
                    IdentityEffectMode::RequireMatch => {
                        return Err(TranslationError::RequiredIdentityMissing(format!(
                            "{}:{}",
                            mi.identity.type_id, mi.identity.value
                        )))
                    }
                    IdentityEffectMode::CreateOrMatch => to_create.push(mi.clone()),
                    IdentityEffectMode::UpdateOrMatch => update_or_match.push(mi.clone()),
                    IdentityEffectMode::Match => {
                        tracing::debug!(
                            type_id = %mi.identity.type_id,
                            value = %mi.identity.value,
                            "match-only identity not found, ignoring"
                        );
                    }
                },
            }
        }

        // UPDATE_OR_MATCH attaches missing identities only to an entity
        // matched by another rule; it never creates one.
        if existing.is_some() {
            to_create.append(&mut update_or_match);
        } else if !update_or_match.is_empty() {
            tracing::debug!(
                count = update_or_match.len(),
                "no entity matched, dropping update-or-match identities"
            );
        }

        let entity_id = match existing {
            Some(id) => id,
            None => {
                let Some(first) = to_create.first().cloned() else {
                    return Err(TranslationError::NoIdentityMapped);
                };
                let root_attributes = result.attributes_in_group(idb_model::group::ROOT_GROUP);
                let entity = self
                    .store
                    .create_entity(&first.identity, EntityState::Valid, &root_attributes)
                    .await?;
                tracing::info!(
                    entity_id = %entity.id,
                    type_id = %first.identity.type_id,
                    value = %first.identity.value,
                    "created entity for remote principal"
                );
                for attribute in &root_attributes {
                    written_attrs.insert((attribute.group_path.clone(), attribute.name.clone()));
                }
                result.add_authenticated_with(first.identity.value.clone());
                to_create.remove(0);
                entity.id
            }
        };

        for mi in to_create {
            self.store.add_identity(entity_id, &mi.identity).await?;
            result.add_authenticated_with(mi.identity.value.clone());
        }

        if result.clean_stale() {
            self.remove_stale_identities(result, entity_id).await?;
        }
        Ok(entity_id)
    }

    async fn remove_stale_identities(
        &self,
        result: &MappingResult,
        entity_id: Uuid,
    ) -> EngineResult<()> {
        let run = result.run_provenance();
        for stored in self.store.list_identities(entity_id).await? {
            let reasserted = result.identities().iter().any(|mi| {
                mi.identity
                    .same_identity(&stored.param.type_id, &stored.param.value)
            });
            if !reasserted && run.matches(&stored.param.provenance) {
                tracing::info!(
                    type_id = %stored.param.type_id,
                    value = %stored.param.value,
                    "removing stale identity"
                );
                self.store
                    .remove_identity(entity_id, &stored.param.type_id, &stored.param.value)
                    .await?;
            }
        }
        Ok(())
    }

    /// Joins mapped groups, creating missing ancestors per effect mode,
    /// and removes stale memberships owned by this run's provenance.
    async fn process_groups(
        &self,
        result: &MappingResult,
        entity_id: Uuid,
        written_attrs: &mut HashSet<(String, String)>,
    ) -> EngineResult<()> {
        let current = self.store.memberships(entity_id).await?;
        let mut member_of: HashSet<String> =
            current.iter().map(|m| m.group.clone()).collect();
        let mut asserted: HashSet<String> = HashSet::new();

        'groups: for mg in result.groups() {
            asserted.insert(mg.group.clone());
            if member_of.contains(&mg.group) {
                continue;
            }
            let chain = idb_model::group::missing_groups(
                &mg.group,
                member_of.iter().map(String::as_str),
            );
            for group in chain {
                if !self.store.group_exists(&group).await? {
                    match mg.mode {
                        GroupEffectMode::CreateGroupIfMissing => {
                            self.store.create_group(&group).await?;
                            tracing::info!(%group, "created group");
                        }
                        GroupEffectMode::RequireExistingGroup => {
                            tracing::warn!(
                                %group,
                                target = %mg.group,
                                "required group does not exist, skipping membership"
                            );
                            continue 'groups;
                        }
                        GroupEffectMode::AddIfGroupExists => {
                            tracing::debug!(
                                %group,
                                target = %mg.group,
                                "group does not exist, skipping membership"
                            );
                            continue 'groups;
                        }
                    }
                }
                let attributes = result.attributes_in_group(&group);
                self.store
                    .add_member(&group, entity_id, &mg.provenance, &attributes)
                    .await?;
                for attribute in &attributes {
                    written_attrs.insert((attribute.group_path.clone(), attribute.name.clone()));
                }
                member_of.insert(group.clone());
                asserted.insert(group);
            }
        }

        if result.clean_stale() {
            let run = result.run_provenance();
            for membership in current {
                if membership.group != idb_model::group::ROOT_GROUP
                    && !asserted.contains(&membership.group)
                    && run.matches(&membership.provenance)
                {
                    tracing::info!(group = %membership.group, "removing stale membership");
                    self.store
                        .remove_member(&membership.group, entity_id)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Writes mapped attributes per effect mode and removes stale
    /// attributes owned by this run's provenance.
    ///
    /// Unchanged value sets are never rewritten, so confirmation state
    /// survives re-assertions of the same values.
    async fn process_attributes(
        &self,
        result: &MappingResult,
        entity_id: Uuid,
        written_attrs: &HashSet<(String, String)>,
    ) -> EngineResult<()> {
        let snapshot = self.store.all_attributes(entity_id).await?;
        let mut current: HashSet<(String, String)> = snapshot
            .iter()
            .map(|a| (a.attribute.group_path.clone(), a.attribute.name.clone()))
            .collect();
        let mut asserted: HashSet<(String, String)> = written_attrs.clone();

        for ma in result.attributes() {
            let key = (ma.attribute.group_path.clone(), ma.attribute.name.clone());
            asserted.insert(key.clone());
            if written_attrs.contains(&key) {
                continue;
            }
            let exists = current.contains(&key);
            match ma.mode {
                AttributeEffectMode::CreateOnly if exists => {
                    tracing::debug!(
                        name = %ma.attribute.name,
                        group = %ma.attribute.group_path,
                        "attribute exists, create-only mapping skipped"
                    );
                }
                AttributeEffectMode::UpdateOnly if !exists => {
                    tracing::debug!(
                        name = %ma.attribute.name,
                        group = %ma.attribute.group_path,
                        "attribute absent, update-only mapping skipped"
                    );
                }
                AttributeEffectMode::CreateOnly => {
                    self.store.create_attribute(entity_id, &ma.attribute).await?;
                    current.insert(key);
                }
                AttributeEffectMode::CreateOrUpdate | AttributeEffectMode::UpdateOnly => {
                    let unchanged = snapshot.iter().any(|stored| {
                        stored
                            .attribute
                            .same_slot(&ma.attribute.group_path, &ma.attribute.name)
                            && stored.attribute.values == ma.attribute.values
                    });
                    if unchanged {
                        tracing::debug!(
                            name = %ma.attribute.name,
                            group = %ma.attribute.group_path,
                            "attribute values unchanged, not rewriting"
                        );
                    } else {
                        self.store.set_attribute(entity_id, &ma.attribute).await?;
                        current.insert(key);
                    }
                }
            }
        }

        if result.clean_stale() {
            let run = result.run_provenance();
            for stored in snapshot {
                let key = (
                    stored.attribute.group_path.clone(),
                    stored.attribute.name.clone(),
                );
                if !asserted.contains(&key) && run.matches(&stored.attribute.provenance) {
                    tracing::info!(
                        name = %stored.attribute.name,
                        group = %stored.attribute.group_path,
                        "removing stale attribute"
                    );
                    self.store
                        .remove_attribute(entity_id, &stored.attribute.group_path, &stored.attribute.name)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn process_entity_changes(
        &self,
        result: &MappingResult,
        entity_id: Uuid,
    ) -> EngineResult<()> {
        for mc in result.entity_changes() {
            self.store
                .schedule_entity_change(entity_id, Some(mc.change))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{MappedAttribute, MappedEntityChange, MappedGroup, MappedIdentity};
    use idb_model::{
        Attribute, EntityScheduledChange, IdentityParam, Provenance, ScheduledOperation,
    };
    use idb_storage::{AttributeProvider, EntityProvider, GroupProvider, MemoryStore};

    fn engine() -> (Arc<MemoryStore>, InputTranslationEngine) {
        let store = Arc::new(MemoryStore::new());
        let engine = InputTranslationEngine::new(store.clone());
        (store, engine)
    }

    fn run_provenance() -> Provenance {
        Provenance::remote("testIdp", "p1")
    }

    fn identity(value: &str, mode: IdentityEffectMode) -> MappedIdentity {
        MappedIdentity::new(
            IdentityParam::new("userName", value).with_provenance(run_provenance()),
            mode,
        )
    }

    fn attribute(name: &str, group: &str, value: &str) -> MappedAttribute {
        MappedAttribute::new(
            Attribute::single(name, group, value).with_provenance(run_provenance()),
            AttributeEffectMode::CreateOrUpdate,
        )
    }

    fn base_result() -> MappingResult {
        let mut result = MappingResult::new();
        result.add_identity(identity("jdoe", IdentityEffectMode::CreateOrMatch));
        result
    }

    #[tokio::test]
    async fn creates_entity_with_root_attributes_and_groups() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_attribute(attribute("cn", "/", "John Doe"));
        result.add_attribute(attribute("role", "/staff", "dev"));
        result.add_group(MappedGroup::new(
            "/staff",
            GroupEffectMode::CreateGroupIfMissing,
            run_provenance(),
        ));

        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();

        let entity = store
            .find_entity_by_identity("userName", "jdoe")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity.id, entity_id);

        let groups: Vec<String> = store
            .memberships(entity_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.group)
            .collect();
        assert!(groups.contains(&"/".to_string()));
        assert!(groups.contains(&"/staff".to_string()));

        let attrs = store.all_attributes(entity_id).await.unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(result.authenticated_with(), ["jdoe".to_string()]);
    }

    #[tokio::test]
    async fn rerunning_the_same_mapping_changes_nothing() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_attribute(attribute("cn", "/", "John Doe"));
        result.add_group(MappedGroup::new(
            "/staff",
            GroupEffectMode::CreateGroupIfMissing,
            run_provenance(),
        ));
        result.request_clean_stale();

        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();
        let before_attrs = store.all_attributes(entity_id).await.unwrap();
        let before_groups = store.memberships(entity_id).await.unwrap();

        let mut rerun = result.clone();
        rerun.set_mapped_entity(None);
        engine.process(&mut rerun).await.unwrap();

        assert_eq!(rerun.mapped_entity(), Some(entity_id));
        assert_eq!(store.all_attributes(entity_id).await.unwrap(), before_attrs);
        assert_eq!(store.memberships(entity_id).await.unwrap().len(), before_groups.len());
    }

    #[tokio::test]
    async fn two_different_entities_is_a_conflict() {
        let (store, engine) = engine();
        store
            .create_entity(
                &IdentityParam::new("userName", "jdoe"),
                EntityState::Valid,
                &[],
            )
            .await
            .unwrap();
        store
            .create_entity(
                &IdentityParam::new("email", "jdoe@example.com"),
                EntityState::Valid,
                &[],
            )
            .await
            .unwrap();

        let mut result = base_result();
        result.add_identity(MappedIdentity::new(
            IdentityParam::new("email", "jdoe@example.com").with_provenance(run_provenance()),
            IdentityEffectMode::CreateOrMatch,
        ));

        let err = engine.process(&mut result).await.unwrap_err();
        assert!(matches!(err, TranslationError::IdentityConflict(_)));
    }

    #[tokio::test]
    async fn require_match_aborts_on_missing_identity() {
        let (_, engine) = engine();
        let mut result = MappingResult::new();
        result.add_identity(identity("jdoe", IdentityEffectMode::RequireMatch));

        let err = engine.process(&mut result).await.unwrap_err();
        assert!(matches!(err, TranslationError::RequiredIdentityMissing(_)));
    }

    #[tokio::test]
    async fn update_or_match_never_creates_an_entity() {
        let (store, engine) = engine();
        let mut result = MappingResult::new();
        result.add_identity(identity("jdoe", IdentityEffectMode::UpdateOrMatch));

        let err = engine.process(&mut result).await.unwrap_err();
        assert!(matches!(err, TranslationError::NoIdentityMapped));
        assert!(store
            .find_entity_by_identity("userName", "jdoe")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_or_match_attaches_to_a_matched_entity() {
        let (store, engine) = engine();
        store
            .create_entity(
                &IdentityParam::new("userName", "jdoe"),
                EntityState::Valid,
                &[],
            )
            .await
            .unwrap();

        let mut result = base_result();
        result.add_identity(MappedIdentity::new(
            IdentityParam::new("email", "jdoe@example.com").with_provenance(run_provenance()),
            IdentityEffectMode::UpdateOrMatch,
        ));

        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();
        assert_eq!(store.list_identities(entity_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn later_match_resolves_when_earlier_match_misses() {
        let (store, engine) = engine();
        let known = store
            .create_entity(
                &IdentityParam::new("userName", "known"),
                EntityState::Valid,
                &[],
            )
            .await
            .unwrap();

        let mut result = MappingResult::new();
        result.add_identity(identity("unknown", IdentityEffectMode::Match));
        result.add_identity(identity("known", IdentityEffectMode::Match));

        engine.process(&mut result).await.unwrap();
        assert_eq!(result.mapped_entity(), Some(known.id));
        assert_eq!(result.authenticated_with(), ["known".to_string()]);
    }

    #[tokio::test]
    async fn no_mapped_identity_is_an_error() {
        let (_, engine) = engine();
        let mut result = MappingResult::new();
        let err = engine.process(&mut result).await.unwrap_err();
        assert!(matches!(err, TranslationError::NoIdentityMapped));
    }

    #[tokio::test]
    async fn stale_removal_is_scoped_to_run_provenance() {
        let (store, engine) = engine();

        // First run asserts /A and /B plus one attribute in each.
        let mut first = base_result();
        for group in ["/A", "/B"] {
            first.add_group(MappedGroup::new(
                group,
                GroupEffectMode::CreateGroupIfMissing,
                run_provenance(),
            ));
        }
        first.add_attribute(attribute("roleA", "/A", "x"));
        first.add_attribute(attribute("roleB", "/B", "y"));
        first.request_clean_stale();
        engine.process(&mut first).await.unwrap();
        let entity_id = first.mapped_entity().unwrap();

        // Attribute from a different source must survive reconciliation.
        let foreign = Attribute::single("local", "/", "kept")
            .with_provenance(Provenance::remote("otherIdp", "p2"));
        store.set_attribute(entity_id, &foreign).await.unwrap();

        // Second run only re-asserts /A.
        let mut second = base_result();
        second.add_group(MappedGroup::new(
            "/A",
            GroupEffectMode::CreateGroupIfMissing,
            run_provenance(),
        ));
        second.add_attribute(attribute("roleA", "/A", "x"));
        second.request_clean_stale();
        engine.process(&mut second).await.unwrap();

        let groups: Vec<String> = store
            .memberships(entity_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.group)
            .collect();
        assert!(groups.contains(&"/".to_string()));
        assert!(groups.contains(&"/A".to_string()));
        assert!(!groups.contains(&"/B".to_string()));

        let attrs = store.all_attributes(entity_id).await.unwrap();
        assert!(attrs.iter().any(|a| a.attribute.name == "roleA"));
        assert!(attrs.iter().all(|a| a.attribute.name != "roleB"));
        assert!(attrs.iter().any(|a| a.attribute.name == "local"));
    }

    #[tokio::test]
    async fn unchanged_values_preserve_confirmation() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_attribute(attribute("email", "/", "jdoe@example.com"));
        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();

        store
            .confirm_attribute(entity_id, "/", "email")
            .await
            .unwrap();

        // Same value again: confirmation survives.
        let mut same = base_result();
        same.add_attribute(attribute("email", "/", "jdoe@example.com"));
        engine.process(&mut same).await.unwrap();
        assert!(store.all_attributes(entity_id).await.unwrap()[0].confirmed);

        // Different value: replaced and unconfirmed.
        let mut changed = base_result();
        changed.add_attribute(attribute("email", "/", "new@example.com"));
        engine.process(&mut changed).await.unwrap();
        let stored = &store.all_attributes(entity_id).await.unwrap()[0];
        assert!(!stored.confirmed);
        assert_eq!(stored.attribute.first_value(), Some("new@example.com"));
    }

    #[tokio::test]
    async fn create_only_never_overwrites() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_attribute(attribute("cn", "/", "original"));
        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();

        let mut second = base_result();
        second.add_attribute(MappedAttribute::new(
            Attribute::single("cn", "/", "proposed").with_provenance(run_provenance()),
            AttributeEffectMode::CreateOnly,
        ));
        engine.process(&mut second).await.unwrap();

        let stored = &store.all_attributes(entity_id).await.unwrap()[0];
        assert_eq!(stored.attribute.first_value(), Some("original"));
    }

    #[tokio::test]
    async fn require_existing_group_skips_without_error() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_group(MappedGroup::new(
            "/absent",
            GroupEffectMode::RequireExistingGroup,
            run_provenance(),
        ));

        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();
        let groups: Vec<String> = store
            .memberships(entity_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.group)
            .collect();
        assert_eq!(groups, ["/".to_string()]);
    }

    #[tokio::test]
    async fn missing_ancestors_are_created_top_down() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_group(MappedGroup::new(
            "/a/b/c",
            GroupEffectMode::CreateGroupIfMissing,
            run_provenance(),
        ));

        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();
        for group in ["/a", "/a/b", "/a/b/c"] {
            assert!(store.group_exists(group).await.unwrap());
        }
        assert_eq!(store.memberships(entity_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn entity_change_schedules_and_overwrites() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_entity_change(MappedEntityChange::new(
            EntityScheduledChange::with_default_grace(ScheduledOperation::Disable),
            run_provenance(),
        ));
        engine.process(&mut result).await.unwrap();
        let entity_id = result.mapped_entity().unwrap();

        let entity = store.get_entity(entity_id).await.unwrap().unwrap();
        assert_eq!(
            entity.scheduled_change.unwrap().operation,
            ScheduledOperation::Disable
        );

        let mut second = base_result();
        second.add_entity_change(MappedEntityChange::new(
            EntityScheduledChange::with_default_grace(ScheduledOperation::Remove),
            run_provenance(),
        ));
        engine.process(&mut second).await.unwrap();
        let entity = store.get_entity(entity_id).await.unwrap().unwrap();
        assert_eq!(
            entity.scheduled_change.unwrap().operation,
            ScheduledOperation::Remove
        );
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_everything() {
        let (store, engine) = engine();
        let mut result = base_result();
        result.add_group(MappedGroup::new(
            "/staff",
            GroupEffectMode::CreateGroupIfMissing,
            run_provenance(),
        ));
        store.fail_on("add_member");

        let err = engine.process(&mut result).await.unwrap_err();
        assert!(err.is_storage());
        assert!(store
            .find_entity_by_identity("userName", "jdoe")
            .await
            .unwrap()
            .is_none());
        assert!(!store.group_exists("/staff").await.unwrap());
    }
}
