//! Identity model.
//!
//! An identity is a typed value (e.g. `userName`, `email`, `x500Name`)
//! attached to an entity. A single entity typically holds several
//! equivalent identities, some locally created and some imported from
//! remote identity providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provenance::Provenance;

/// Parameters of an identity to create or look up.
///
/// This is the value-object form used by translation results and by the
/// storage API; the stored form is [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityParam {
    /// Identity type (e.g. `userName`, `email`, `identifier`).
    pub type_id: String,

    /// Identity value, unique within its type.
    pub value: String,

    /// Where the identity came from.
    pub provenance: Provenance,

    /// Whether the identity value has been confirmed (e.g. a verified
    /// email address).
    pub confirmed: bool,
}

impl IdentityParam {
    /// Creates a new unconfirmed, locally-owned identity.
    #[must_use]
    pub fn new(type_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            value: value.into(),
            provenance: Provenance::local(),
            confirmed: false,
        }
    }

    /// Attaches provenance to the identity.
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Marks the identity value as confirmed.
    #[must_use]
    pub const fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    /// Checks whether this identity refers to the same type+value pair.
    #[must_use]
    pub fn same_identity(&self, type_id: &str, value: &str) -> bool {
        self.type_id == type_id && self.value == value
    }
}

/// A stored identity, attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier of this identity record.
    pub id: Uuid,

    /// The entity this identity belongs to.
    pub entity_id: Uuid,

    /// The identity value and metadata.
    pub param: IdentityParam,

    /// When the identity was created.
    pub created_at: DateTime<Utc>,

    /// When the identity was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a new stored identity for an entity.
    #[must_use]
    pub fn new(entity_id: Uuid, param: IdentityParam) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            entity_id,
            param,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_param_builder() {
        let id = IdentityParam::new("userName", "jdoe")
            .with_provenance(Provenance::remote("testIdp", "p1"))
            .confirmed();

        assert!(id.confirmed);
        assert!(id.same_identity("userName", "jdoe"));
        assert!(!id.same_identity("email", "jdoe"));
        assert_eq!(id.provenance.remote_idp.as_deref(), Some("testIdp"));
    }
}
