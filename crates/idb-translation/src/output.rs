//! Outbound translation input and result.
//!
//! The input carries the caller's current local data; the result is the
//! disclosure payload plus the entries the output engine must persist.

use idb_model::{Attribute, IdentityParam};
use regex::Regex;
use uuid::Uuid;

use crate::context::RuleContext;

/// Local identity data handed to an output translation profile.
#[derive(Debug, Clone)]
pub struct TranslationInput {
    /// The resolved entity.
    pub entity_id: Uuid,

    /// The entity's identities.
    pub identities: Vec<IdentityParam>,

    /// The entity's attributes in the chosen group.
    pub attributes: Vec<Attribute>,

    /// The entity's group memberships.
    pub groups: Vec<String>,

    /// The group the relying party operates in.
    pub chosen_group: String,

    /// Identifier of the requesting relying party.
    pub requester: String,

    /// Protocol of the outbound exchange (e.g. `SAML`, `OIDC`).
    pub protocol: String,

    /// Protocol subtype or binding.
    pub protocol_subtype: String,

    /// Remote IdP of the current login session, if the session came from
    /// a remote authentication.
    pub auth_idp: Option<String>,

    /// Identity values the current session authenticated with.
    pub authenticated_with: Vec<String>,
}

impl TranslationInput {
    /// Creates an input for an entity and requester.
    #[must_use]
    pub fn new(entity_id: Uuid, requester: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            entity_id,
            identities: Vec::new(),
            attributes: Vec::new(),
            groups: Vec::new(),
            chosen_group: idb_model::group::ROOT_GROUP.to_string(),
            requester: requester.into(),
            protocol: protocol.into(),
            protocol_subtype: String::new(),
            auth_idp: None,
            authenticated_with: Vec::new(),
        }
    }

    /// Adds an identity.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityParam) -> Self {
        self.identities.push(identity);
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Sets the chosen group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.chosen_group = group.into();
        self
    }

    /// Builds the rule context for this input.
    ///
    /// Variables: `protocol`, `protocolSubtype`, `requester`, `usedGroup`,
    /// `idp` (or `_LOCAL`), `groups`, `subGroups`, `authenticatedWith`,
    /// `attr[...]`/`attrs[...]` and `idsByType[...]`.
    #[must_use]
    pub fn to_context(&self) -> RuleContext {
        let mut ctx = RuleContext::new();
        ctx.set_scalar("protocol", &self.protocol);
        ctx.set_scalar("protocolSubtype", &self.protocol_subtype);
        ctx.set_scalar("requester", &self.requester);
        ctx.set_scalar("usedGroup", &self.chosen_group);
        ctx.set_scalar("idp", self.auth_idp.as_deref().unwrap_or("_LOCAL"));
        for attribute in &self.attributes {
            ctx.set_map_entry("attr", &attribute.name, attribute.values.clone());
            ctx.set_map_entry("attrs", &attribute.name, attribute.values.clone());
        }
        for identity in &self.identities {
            let mut values = ctx
                .map_entry("idsByType", &identity.type_id)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            values.push(identity.value.clone());
            ctx.set_map_entry("idsByType", &identity.type_id, values);
        }
        ctx.set_list("groups", self.groups.clone());
        let prefix = if self.chosen_group == idb_model::group::ROOT_GROUP {
            idb_model::group::ROOT_GROUP.to_string()
        } else {
            format!("{}/", self.chosen_group)
        };
        ctx.set_list(
            "subGroups",
            self.groups
                .iter()
                .filter(|g| g.starts_with(&prefix) && g.as_str() != self.chosen_group)
                .cloned()
                .collect(),
        );
        ctx.set_list("authenticatedWith", self.authenticated_with.clone());
        ctx
    }
}

/// An attribute in a disclosure payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicAttribute {
    /// The attribute data.
    pub attribute: Attribute,

    /// Whether the relying party considers the attribute mandatory.
    pub mandatory: bool,
}

impl DynamicAttribute {
    /// Creates a non-mandatory dynamic attribute.
    #[must_use]
    pub const fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            mandatory: false,
        }
    }
}

/// Accumulator of one outbound profile run.
///
/// Disclosure entries and to-persist entries are tracked separately:
/// filtering an attribute removes it from disclosure but does not undo a
/// persist request made earlier in the same run.
#[derive(Debug, Clone, Default)]
pub struct TranslationResult {
    attributes: Vec<DynamicAttribute>,
    attributes_to_persist: Vec<Attribute>,
    identities: Vec<IdentityParam>,
    identities_to_persist: Vec<IdentityParam>,
    redirect_url: Option<String>,
}

impl TranslationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result prefilled with the caller's current attributes and
    /// identities, the starting state of every output profile run.
    #[must_use]
    pub fn initiate(input: &TranslationInput) -> Self {
        Self {
            attributes: input
                .attributes
                .iter()
                .cloned()
                .map(DynamicAttribute::new)
                .collect(),
            attributes_to_persist: Vec::new(),
            identities: input.identities.clone(),
            identities_to_persist: Vec::new(),
            redirect_url: None,
        }
    }

    /// Adds an attribute to the disclosure payload, replacing any earlier
    /// entry for the same group and name (last write wins).
    pub fn add_attribute(&mut self, attribute: DynamicAttribute) {
        self.attributes.retain(|existing| {
            !existing.attribute.same_slot(
                &attribute.attribute.group_path,
                &attribute.attribute.name,
            )
        });
        self.attributes.push(attribute);
    }

    /// Requests that an attribute be persisted, replacing any earlier
    /// request for the same group and name.
    pub fn add_attribute_to_persist(&mut self, attribute: Attribute) {
        self.attributes_to_persist
            .retain(|existing| !existing.same_slot(&attribute.group_path, &attribute.name));
        self.attributes_to_persist.push(attribute);
    }

    /// Adds an identity to the disclosure payload.
    pub fn add_identity(&mut self, identity: IdentityParam) {
        if !self
            .identities
            .iter()
            .any(|existing| existing.same_identity(&identity.type_id, &identity.value))
        {
            self.identities.push(identity);
        }
    }

    /// Requests that an identity be persisted.
    pub fn add_identity_to_persist(&mut self, identity: IdentityParam) {
        if !self
            .identities_to_persist
            .iter()
            .any(|existing| existing.same_identity(&identity.type_id, &identity.value))
        {
            self.identities_to_persist.push(identity);
        }
    }

    /// Removes all disclosure attributes whose name matches the pattern.
    ///
    /// Persist requests are left untouched.
    pub fn filter_attributes(&mut self, pattern: &Regex) {
        self.attributes
            .retain(|entry| !pattern.is_match(&entry.attribute.name));
    }

    /// Sets the redirect URL, overwriting any earlier one.
    pub fn set_redirect(&mut self, url: impl Into<String>) {
        self.redirect_url = Some(url.into());
    }

    /// The disclosure attributes.
    #[must_use]
    pub fn attributes(&self) -> &[DynamicAttribute] {
        &self.attributes
    }

    /// The attributes to persist.
    #[must_use]
    pub fn attributes_to_persist(&self) -> &[Attribute] {
        &self.attributes_to_persist
    }

    /// The disclosure identities.
    #[must_use]
    pub fn identities(&self) -> &[IdentityParam] {
        &self.identities
    }

    /// The identities to persist.
    #[must_use]
    pub fn identities_to_persist(&self) -> &[IdentityParam] {
        &self.identities_to_persist
    }

    /// The redirect URL, if any.
    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    /// Looks up a disclosure attribute by name, across all groups.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&DynamicAttribute> {
        self.attributes
            .iter()
            .find(|entry| entry.attribute.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> TranslationInput {
        TranslationInput::new(Uuid::now_v7(), "sp1", "SAML")
            .with_identity(IdentityParam::new("userName", "jdoe"))
            .with_attribute(Attribute::single("cn", "/", "John Doe"))
            .with_group("/")
            .with_group("/staff")
            .with_group("/staff/admins")
    }

    #[test]
    fn initiate_prefills_from_input() {
        let result = TranslationResult::initiate(&input());
        assert_eq!(result.attributes().len(), 1);
        assert_eq!(result.identities().len(), 1);
        assert!(result.attributes_to_persist().is_empty());
    }

    #[test]
    fn later_attribute_replaces_earlier_same_slot() {
        let mut result = TranslationResult::new();
        result.add_attribute(DynamicAttribute::new(Attribute::single("a1", "/", "x")));
        result.add_attribute(DynamicAttribute::new(Attribute::single("a1", "/", "x2")));

        assert_eq!(result.attributes().len(), 1);
        assert_eq!(result.attribute("a1").unwrap().attribute.first_value(), Some("x2"));
    }

    #[test]
    fn filtering_spares_persist_requests() {
        let mut result = TranslationResult::new();
        let attr = Attribute::single("secret", "/", "v");
        result.add_attribute(DynamicAttribute::new(attr.clone()));
        result.add_attribute_to_persist(attr);

        result.filter_attributes(&Regex::new("^(?:secret)$").unwrap());
        assert!(result.attributes().is_empty());
        assert_eq!(result.attributes_to_persist().len(), 1);
    }

    #[test]
    fn sub_groups_are_strict_descendants_of_chosen_group() {
        let ctx = input().in_group("/staff").to_context();
        assert_eq!(ctx.list("subGroups").unwrap(), ["/staff/admins".to_string()]);
        assert_eq!(ctx.scalar("idp"), Some("_LOCAL"));
    }
}
