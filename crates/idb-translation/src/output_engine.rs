//! Outbound engine: persists the to-persist entries of a translation
//! result.
//!
//! Disclosure itself is the caller's job (the protocol endpoint renders
//! the result); this engine only stores the attributes and identities the
//! profile asked to keep, so future logins disclose the same values.

use std::sync::Arc;

use idb_storage::{AttributeProvider, DirectoryStore, EntityProvider};

use crate::error::EngineResult;
use crate::output::{TranslationInput, TranslationResult};

/// Persists outbound translation results to a [`DirectoryStore`].
pub struct OutputTranslationEngine {
    store: Arc<dyn DirectoryStore>,
}

impl OutputTranslationEngine {
    /// Creates an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Persists the result's to-persist entries in one transaction.
    ///
    /// A result with nothing to persist is a no-op.
    pub async fn process(
        &self,
        input: &TranslationInput,
        result: &TranslationResult,
    ) -> EngineResult<()> {
        if result.attributes_to_persist().is_empty() && result.identities_to_persist().is_empty() {
            return Ok(());
        }
        self.store.begin().await?;
        match self.apply(input, result).await {
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

    async fn apply(
        &self,
        input: &TranslationInput,
        result: &TranslationResult,
    ) -> EngineResult<()> {
        for attribute in result.attributes_to_persist() {
            tracing::debug!(
                name = %attribute.name,
                entity_id = %input.entity_id,
                "persisting disclosed attribute"
            );
            self.store.set_attribute(input.entity_id, attribute).await?;
        }
        for identity in result.identities_to_persist() {
            let existing = self
                .store
                .find_entity_by_identity(&identity.type_id, &identity.value)
                .await?;
            if existing.is_none() {
                tracing::debug!(
                    type_id = %identity.type_id,
                    value = %identity.value,
                    entity_id = %input.entity_id,
                    "persisting disclosed identity"
                );
                self.store.add_identity(input.entity_id, identity).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idb_model::{Attribute, EntityState, IdentityParam};
    use idb_storage::{AttributeProvider, EntityProvider, MemoryStore};

    async fn seeded() -> (Arc<MemoryStore>, TranslationInput) {
        let store = Arc::new(MemoryStore::new());
        let entity = store
            .create_entity(
                &IdentityParam::new("userName", "jdoe"),
                EntityState::Valid,
                &[],
            )
            .await
            .unwrap();
        let input = TranslationInput::new(entity.id, "sp1", "OIDC");
        (store, input)
    }

    #[tokio::test]
    async fn empty_result_touches_nothing() {
        let (store, input) = seeded().await;
        let engine = OutputTranslationEngine::new(store.clone());

        engine
            .process(&input, &TranslationResult::new())
            .await
            .unwrap();
        assert!(store.all_attributes(input.entity_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persists_attributes_and_new_identities() {
        let (store, input) = seeded().await;
        let engine = OutputTranslationEngine::new(store.clone());

        let mut result = TranslationResult::new();
        result.add_attribute_to_persist(Attribute::single("pairwiseId", "/", "abc123"));
        result.add_identity_to_persist(IdentityParam::new("persistent", "abc123"));
        // Already stored; must not fail as a duplicate.
        result.add_identity_to_persist(IdentityParam::new("userName", "jdoe"));

        engine.process(&input, &result).await.unwrap();

        let attrs = store.all_attributes(input.entity_id).await.unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].attribute.name, "pairwiseId");
        assert_eq!(
            store.list_identities(input.entity_id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn failure_rolls_back_persisted_attributes() {
        let (store, input) = seeded().await;
        let engine = OutputTranslationEngine::new(store.clone());

        let mut result = TranslationResult::new();
        result.add_attribute_to_persist(Attribute::single("pairwiseId", "/", "abc123"));
        result.add_identity_to_persist(IdentityParam::new("persistent", "abc123"));
        store.fail_on("add_identity");

        assert!(engine.process(&input, &result).await.is_err());
        assert!(store.all_attributes(input.entity_id).await.unwrap().is_empty());
    }
}
