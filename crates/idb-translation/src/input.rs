//! Remote authentication input and its rule context.

use crate::context::RuleContext;

/// An identity asserted by the remote identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    /// Identity value at the remote provider.
    pub value: String,

    /// Identity type at the remote provider.
    pub identity_type: String,
}

/// An attribute asserted by the remote identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttribute {
    /// Attribute name.
    pub name: String,

    /// Attribute values.
    pub values: Vec<String>,
}

/// Everything a remote authentication produced, as handed to the inbound
/// translation profile.
#[derive(Debug, Clone, Default)]
pub struct RemotelyAuthenticatedInput {
    /// Name of the remote identity provider.
    pub idp_name: String,

    /// Remote identities, in assertion order; the first is the primary.
    pub identities: Vec<RemoteIdentity>,

    /// Remote attributes.
    pub attributes: Vec<RemoteAttribute>,

    /// Remote group memberships.
    pub groups: Vec<String>,
}

impl RemotelyAuthenticatedInput {
    /// Creates an empty input from the given IdP.
    #[must_use]
    pub fn new(idp_name: impl Into<String>) -> Self {
        Self {
            idp_name: idp_name.into(),
            ..Self::default()
        }
    }

    /// Adds a remote identity.
    #[must_use]
    pub fn with_identity(
        mut self,
        identity_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.identities.push(RemoteIdentity {
            value: value.into(),
            identity_type: identity_type.into(),
        });
        self
    }

    /// Adds a remote attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.push(RemoteAttribute {
            name: name.into(),
            values,
        });
        self
    }

    /// Adds a remote group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Gets the primary remote identity, if any.
    #[must_use]
    pub fn primary_identity(&self) -> Option<&RemoteIdentity> {
        self.identities.first()
    }

    /// Builds the rule context for this input.
    ///
    /// Variables: `id`, `idType` (primary identity), `idp`, `groups`,
    /// `attr[...]`/`attrs[...]` and `idsByType[...]`.
    #[must_use]
    pub fn to_context(&self) -> RuleContext {
        let mut ctx = RuleContext::new();
        ctx.set_scalar("idp", &self.idp_name);
        if let Some(primary) = self.primary_identity() {
            ctx.set_scalar("id", &primary.value);
            ctx.set_scalar("idType", &primary.identity_type);
        }
        for attribute in &self.attributes {
            ctx.set_map_entry("attr", &attribute.name, attribute.values.clone());
            ctx.set_map_entry("attrs", &attribute.name, attribute.values.clone());
        }
        for identity in &self.identities {
            let mut values = ctx
                .map_entry("idsByType", &identity.identity_type)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            values.push(identity.value.clone());
            ctx.set_map_entry("idsByType", &identity.identity_type, values);
        }
        ctx.set_list("groups", self.groups.clone());
        ctx
    }
}
