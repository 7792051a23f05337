//! Group model and path utilities.
//!
//! Groups form a tree rooted at `/`. Paths are slash-separated
//! (`/staff/admins`); every entity is implicitly a member of the root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provenance::Provenance;

/// The root group every entity belongs to.
pub const ROOT_GROUP: &str = "/";

/// Checks whether a string is a well-formed group path.
///
/// A valid path is `/` or a `/`-prefixed sequence of non-empty segments
/// without a trailing slash.
#[must_use]
pub fn is_valid_path(path: &str) -> bool {
    if path == ROOT_GROUP {
        return true;
    }
    path.starts_with('/')
        && !path.ends_with('/')
        && path[1..].split('/').all(|segment| !segment.is_empty())
}

/// Returns the parent of a group path, or `None` for the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<String> {
    if path == ROOT_GROUP {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_GROUP.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Computes the chain of groups that must be created (or joined) to make
/// an entity a member of `target`, ordered from the highest missing
/// ancestor down to `target` itself.
///
/// `existing` holds the paths the entity is already a member of.
#[must_use]
pub fn missing_groups<'a, I>(target: &str, existing: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let existing: std::collections::HashSet<&str> = existing.into_iter().collect();
    let mut chain = Vec::new();
    let mut current = target.to_string();
    while current != ROOT_GROUP && !existing.contains(current.as_str()) {
        chain.push(current.clone());
        match parent_path(&current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// A stored group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Group path.
    pub group: String,

    /// Member entity.
    pub entity_id: Uuid,

    /// Where the membership came from.
    pub provenance: Provenance,

    /// When the membership was established.
    pub since: DateTime<Utc>,
}

impl GroupMembership {
    /// Creates a new membership.
    #[must_use]
    pub fn new(group: impl Into<String>, entity_id: Uuid, provenance: Provenance) -> Self {
        Self {
            group: group.into(),
            entity_id,
            provenance,
            since: Utc::now(),
        }
    }
}
