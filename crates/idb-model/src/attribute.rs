//! Attribute model.
//!
//! Attributes are named, multi-valued and scoped to a group: the same
//! attribute name can hold different values in different groups of the
//! same entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provenance::Provenance;

/// A named, multi-valued attribute scoped to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Group path the attribute lives in (e.g. `/` or `/staff`).
    pub group_path: String,

    /// Attribute values.
    pub values: Vec<String>,

    /// Where the attribute came from.
    pub provenance: Provenance,
}

impl Attribute {
    /// Creates a new multi-valued, locally-owned attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, group_path: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            group_path: group_path.into(),
            values,
            provenance: Provenance::local(),
        }
    }

    /// Creates a new single-valued attribute.
    #[must_use]
    pub fn single(
        name: impl Into<String>,
        group_path: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(name, group_path, vec![value.into()])
    }

    /// Attaches provenance to the attribute.
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Gets the first value, if any.
    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Checks whether this attribute has the same name and group as
    /// another.
    #[must_use]
    pub fn same_slot(&self, group_path: &str, name: &str) -> bool {
        self.group_path == group_path && self.name == name
    }
}

/// A stored attribute with its confirmation state.
///
/// The confirmation flag covers the whole value set: replacing the values
/// of a confirmed attribute resets it to unconfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttribute {
    /// The attribute data.
    pub attribute: Attribute,

    /// Whether the current value set has been confirmed.
    pub confirmed: bool,

    /// When the attribute was last written.
    pub updated_at: DateTime<Utc>,
}

impl StoredAttribute {
    /// Creates a stored, unconfirmed attribute.
    #[must_use]
    pub fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            confirmed: false,
            updated_at: Utc::now(),
        }
    }
}
