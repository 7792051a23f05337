//! Entity model.
//!
//! An entity is the principal record an authenticated user resolves to.
//! Identities, attributes and group memberships all hang off an entity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default grace period before a scheduled entity operation triggers.
pub const DEFAULT_GRACE_HOURS: i64 = 24;

/// Lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityState {
    /// The entity is active and can authenticate.
    Valid,

    /// The entity is disabled; authentication is rejected.
    Disabled,
}

/// Entity-level operation that can be scheduled for the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledOperation {
    /// Remove the entity and all its data.
    Remove,

    /// Disable the entity.
    Disable,
}

impl ScheduledOperation {
    /// Parses an operation from its serialized name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REMOVE" => Some(Self::Remove),
            "DISABLE" => Some(Self::Disable),
            _ => None,
        }
    }
}

/// A pending entity-level operation with its trigger time.
///
/// An entity carries at most one pending change; scheduling again
/// overwrites the previous schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScheduledChange {
    /// The operation to perform.
    pub operation: ScheduledOperation,

    /// When the operation triggers.
    pub when: DateTime<Utc>,
}

impl EntityScheduledChange {
    /// Creates a scheduled change with an explicit trigger time.
    #[must_use]
    pub const fn new(operation: ScheduledOperation, when: DateTime<Utc>) -> Self {
        Self { operation, when }
    }

    /// Creates a scheduled change triggering after the default grace
    /// period ([`DEFAULT_GRACE_HOURS`]).
    #[must_use]
    pub fn with_default_grace(operation: ScheduledOperation) -> Self {
        Self {
            operation,
            when: Utc::now() + Duration::hours(DEFAULT_GRACE_HOURS),
        }
    }
}

/// A stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier.
    pub id: Uuid,

    /// Lifecycle state.
    pub state: EntityState,

    /// When the entity was created.
    pub created_at: DateTime<Utc>,

    /// Pending scheduled operation, if any.
    pub scheduled_change: Option<EntityScheduledChange>,
}

impl Entity {
    /// Creates a new entity in the given state.
    #[must_use]
    pub fn new(state: EntityState) -> Self {
        Self {
            id: Uuid::now_v7(),
            state,
            created_at: Utc::now(),
            scheduled_change: None,
        }
    }
}
