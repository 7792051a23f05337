//! Translation profile model.
//!
//! A translation profile is a named, ordered list of conditional rules.
//! Profiles are stored and edited as data; binding rules to executable
//! actions happens in the translation crate.

use serde::{Deserialize, Serialize};

/// Name prefix reserved for system-provided profiles.
pub const SYSTEM_PROFILE_PREFIX: &str = "sys:";

/// Direction a profile translates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileDirection {
    /// Remote authentication data into the local identity model.
    Input,

    /// Local identity data into a disclosure payload.
    Output,
}

/// Editability mode of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileMode {
    /// Regular, administrator-editable profile.
    Normal,

    /// Profile that cannot be created or updated through the management
    /// surface; only a system profile provider may supply it.
    ReadOnly,

    /// A read-only profile additionally marked as the default for its
    /// direction.
    Default,
}

impl ProfileMode {
    /// Checks whether management operations may modify a profile in this
    /// mode.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// A named action with its raw parameters.
///
/// Parameters are opaque strings at the model level; the action registry
/// decides which entries are expressions and which are literal enums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAction {
    /// Action type name (e.g. `mapIdentity`).
    pub name: String,

    /// Ordered raw parameters.
    pub parameters: Vec<String>,
}

impl ProfileAction {
    /// Creates a new action.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single condition + action pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRule {
    /// Condition expression; `true` or an empty string always matches.
    pub condition: String,

    /// The action to invoke when the condition holds.
    pub action: ProfileAction,
}

impl TranslationRule {
    /// Creates a rule with an explicit condition.
    #[must_use]
    pub fn new(condition: impl Into<String>, action: ProfileAction) -> Self {
        Self {
            condition: condition.into(),
            action,
        }
    }

    /// Creates an unconditional rule.
    #[must_use]
    pub fn always(action: ProfileAction) -> Self {
        Self::new("true", action)
    }
}

/// A stored translation profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationProfile {
    /// Unique profile name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Translation direction.
    pub direction: ProfileDirection,

    /// Editability mode.
    pub mode: ProfileMode,

    /// Ordered rules; order is significant and is the sole tie-break.
    pub rules: Vec<TranslationRule>,
}

impl TranslationProfile {
    /// Creates a profile in [`ProfileMode::Normal`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        direction: ProfileDirection,
        rules: Vec<TranslationRule>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            direction,
            mode: ProfileMode::Normal,
            rules,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ProfileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks whether the name marks this as a system profile.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name.starts_with(SYSTEM_PROFILE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_profiles_are_recognized_by_prefix() {
        let sys = TranslationProfile::new("sys:default", ProfileDirection::Input, vec![]);
        let user = TranslationProfile::new("p1", ProfileDirection::Input, vec![]);
        assert!(sys.is_system());
        assert!(!user.is_system());
    }

    #[test]
    fn profile_round_trips_through_json() {
        let profile = TranslationProfile::new(
            "p1",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "mapGroup",
                ["'/staff'"],
            ))],
        )
        .with_description("test profile");

        let json = serde_json::to_string(&profile).unwrap();
        let back: TranslationProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(profile, back);
        assert!(json.contains("\"INPUT\""));
    }

    #[test]
    fn only_normal_mode_is_editable() {
        assert!(ProfileMode::Normal.is_editable());
        assert!(!ProfileMode::ReadOnly.is_editable());
        assert!(!ProfileMode::Default.is_editable());
    }
}
