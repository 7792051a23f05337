//! Effect modes: the merge policies of mapped identities, attributes and
//! groups.

use serde::{Deserialize, Serialize};

/// Merge policy for a mapped identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityEffectMode {
    /// Match the owning entity if the identity exists, create a new
    /// entity otherwise.
    CreateOrMatch,

    /// Match if the identity exists; if it doesn't, attach it to the
    /// entity matched by another rule of the same run. Never creates a
    /// brand-new entity.
    UpdateOrMatch,

    /// Match only: a missing identity resolves no entity for this rule
    /// but is not an error.
    Match,

    /// The identity must already exist; a miss aborts the mapping.
    RequireMatch,
}

impl IdentityEffectMode {
    /// Parses a mode from its serialized name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE_OR_MATCH" => Some(Self::CreateOrMatch),
            "UPDATE_OR_MATCH" => Some(Self::UpdateOrMatch),
            "MATCH" => Some(Self::Match),
            "REQUIRE_MATCH" => Some(Self::RequireMatch),
            _ => None,
        }
    }
}

/// Merge policy for a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeEffectMode {
    /// Create only if absent; an existing value always wins.
    CreateOnly,

    /// Create or replace the value list. An existing confirmed value is
    /// preserved when the proposed values are identical; a different
    /// value replaces it and resets the confirmation state.
    CreateOrUpdate,

    /// Update only if the attribute already exists; never creates.
    UpdateOnly,
}

impl AttributeEffectMode {
    /// Parses a mode from its serialized name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE_ONLY" => Some(Self::CreateOnly),
            "CREATE_OR_UPDATE" => Some(Self::CreateOrUpdate),
            "UPDATE_ONLY" => Some(Self::UpdateOnly),
            _ => None,
        }
    }
}

/// Merge policy for a mapped group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupEffectMode {
    /// The group must exist; a miss skips this mapped group (not fatal).
    RequireExistingGroup,

    /// Create the group, including intermediate groups, as needed.
    CreateGroupIfMissing,

    /// Join the group if it exists, silently ignore otherwise.
    AddIfGroupExists,
}

impl GroupEffectMode {
    /// Parses a mode from its serialized name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REQUIRE_EXISTING_GROUP" => Some(Self::RequireExistingGroup),
            "CREATE_GROUP_IF_MISSING" => Some(Self::CreateGroupIfMissing),
            "ADD_IF_GROUP_EXISTS" => Some(Self::AddIfGroupExists),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_from_profile_parameters() {
        assert_eq!(
            IdentityEffectMode::parse("CREATE_OR_MATCH"),
            Some(IdentityEffectMode::CreateOrMatch)
        );
        assert_eq!(
            AttributeEffectMode::parse("CREATE_OR_UPDATE"),
            Some(AttributeEffectMode::CreateOrUpdate)
        );
        assert_eq!(
            GroupEffectMode::parse("REQUIRE_EXISTING_GROUP"),
            Some(GroupEffectMode::RequireExistingGroup)
        );
        assert_eq!(IdentityEffectMode::parse("bogus"), None);
    }
}
