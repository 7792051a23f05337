//! Profile management surface.
//!
//! Profiles come from two sources: the repository (administrator-managed)
//! and the system profile provider (read-only, supplied by the deployment
//! and shadowing the `sys:` namespace). The manager merges the two for
//! lookup and listing and enforces the guard rails on edits: system
//! profiles and non-`Normal` modes are off-limits to management calls.

use std::collections::HashMap;
use std::sync::Arc;

use idb_model::{ProfileDirection, TranslationProfile, SYSTEM_PROFILE_PREFIX};
use parking_lot::RwLock;

use crate::actions::{InputActionRegistry, OutputActionRegistry};
use crate::error::{EngineResult, TranslationError};
use crate::profile::ProfileResolver;

/// Storage backend for administrator-managed profiles.
pub trait ProfileRepository: Send + Sync {
    /// Gets a profile by direction and name.
    fn get(&self, direction: ProfileDirection, name: &str) -> Option<TranslationProfile>;

    /// Lists all profiles of a direction.
    fn list(&self, direction: ProfileDirection) -> Vec<TranslationProfile>;

    /// Inserts or replaces a profile.
    fn insert(&self, profile: TranslationProfile);

    /// Removes a profile; returns whether it existed.
    fn remove(&self, direction: ProfileDirection, name: &str) -> bool;
}

/// In-memory [`ProfileRepository`].
#[derive(Debug, Default)]
pub struct MemoryProfileRepository {
    profiles: RwLock<HashMap<(ProfileDirection, String), TranslationProfile>>,
}

impl MemoryProfileRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileRepository for MemoryProfileRepository {
    fn get(&self, direction: ProfileDirection, name: &str) -> Option<TranslationProfile> {
        self.profiles
            .read()
            .get(&(direction, name.to_string()))
            .cloned()
    }

    fn list(&self, direction: ProfileDirection) -> Vec<TranslationProfile> {
        let mut profiles: Vec<TranslationProfile> = self
            .profiles
            .read()
            .values()
            .filter(|p| p.direction == direction)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    fn insert(&self, profile: TranslationProfile) {
        self.profiles
            .write()
            .insert((profile.direction, profile.name.clone()), profile);
    }

    fn remove(&self, direction: ProfileDirection, name: &str) -> bool {
        self.profiles
            .write()
            .remove(&(direction, name.to_string()))
            .is_some()
    }
}

/// Supplies the read-only system profiles of a deployment.
pub trait SystemProfileProvider: Send + Sync {
    /// The system profiles, all expected to carry the `sys:` prefix.
    fn system_profiles(&self) -> Vec<TranslationProfile>;
}

/// A fixed set of system profiles.
pub struct StaticSystemProfiles(
    /// The profiles to supply.
    pub Vec<TranslationProfile>,
);

impl SystemProfileProvider for StaticSystemProfiles {
    fn system_profiles(&self) -> Vec<TranslationProfile> {
        self.0.clone()
    }
}

/// A deployment without system profiles.
pub struct NoSystemProfiles;

impl SystemProfileProvider for NoSystemProfiles {
    fn system_profiles(&self) -> Vec<TranslationProfile> {
        Vec::new()
    }
}

/// Management and lookup surface over repository and system profiles.
pub struct ProfileManager {
    repository: Arc<dyn ProfileRepository>,
    system: HashMap<(ProfileDirection, String), TranslationProfile>,
}

impl ProfileManager {
    /// Creates a manager, snapshotting the system profiles once.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ProfileRepository>,
        system_provider: &dyn SystemProfileProvider,
    ) -> Self {
        let system = system_provider
            .system_profiles()
            .into_iter()
            .map(|p| ((p.direction, p.name.clone()), p))
            .collect();
        Self { repository, system }
    }

    /// Adds a new profile.
    ///
    /// Rejects `sys:` names, non-editable modes, duplicates and rules
    /// whose actions do not bind against the registry.
    pub fn add_profile(&self, profile: TranslationProfile) -> EngineResult<()> {
        self.ensure_not_system(&profile.name)?;
        if !profile.mode.is_editable() {
            return Err(TranslationError::config(format!(
                "profile '{}' is not editable and cannot be added",
                profile.name
            )));
        }
        if self
            .repository
            .get(profile.direction, &profile.name)
            .is_some()
        {
            return Err(TranslationError::config(format!(
                "profile '{}' already exists",
                profile.name
            )));
        }
        validate_actions(&profile)?;
        tracing::info!(profile = %profile.name, "adding translation profile");
        self.repository.insert(profile);
        Ok(())
    }

    /// Updates an existing profile.
    ///
    /// Rejects system profiles, unknown names, non-editable modes on
    /// either side, and rules whose actions do not bind against the
    /// registry.
    pub fn update_profile(&self, profile: TranslationProfile) -> EngineResult<()> {
        self.ensure_not_system(&profile.name)?;
        let stored = self
            .repository
            .get(profile.direction, &profile.name)
            .ok_or_else(|| TranslationError::ProfileNotFound(profile.name.clone()))?;
        if !stored.mode.is_editable() || !profile.mode.is_editable() {
            return Err(TranslationError::config(format!(
                "profile '{}' is not editable",
                profile.name
            )));
        }
        validate_actions(&profile)?;
        tracing::info!(profile = %profile.name, "updating translation profile");
        self.repository.insert(profile);
        Ok(())
    }

    /// Removes a profile.
    ///
    /// Rejects system profiles and unknown names.
    pub fn remove_profile(&self, direction: ProfileDirection, name: &str) -> EngineResult<()> {
        self.ensure_not_system(name)?;
        if !self.repository.remove(direction, name) {
            return Err(TranslationError::ProfileNotFound(name.to_string()));
        }
        tracing::info!(profile = %name, "removed translation profile");
        Ok(())
    }

    /// Gets an input profile, system profiles taking precedence.
    #[must_use]
    pub fn get_input_profile(&self, name: &str) -> Option<TranslationProfile> {
        self.lookup(ProfileDirection::Input, name)
    }

    /// Gets an output profile, system profiles taking precedence.
    #[must_use]
    pub fn get_output_profile(&self, name: &str) -> Option<TranslationProfile> {
        self.lookup(ProfileDirection::Output, name)
    }

    /// Lists all input profiles, system profiles included.
    #[must_use]
    pub fn list_input_profiles(&self) -> Vec<TranslationProfile> {
        self.merged_list(ProfileDirection::Input)
    }

    /// Lists all output profiles, system profiles included.
    #[must_use]
    pub fn list_output_profiles(&self) -> Vec<TranslationProfile> {
        self.merged_list(ProfileDirection::Output)
    }

    fn lookup(&self, direction: ProfileDirection, name: &str) -> Option<TranslationProfile> {
        self.system
            .get(&(direction, name.to_string()))
            .cloned()
            .or_else(|| self.repository.get(direction, name))
    }

    fn merged_list(&self, direction: ProfileDirection) -> Vec<TranslationProfile> {
        let mut profiles: Vec<TranslationProfile> = self
            .system
            .values()
            .filter(|p| p.direction == direction)
            .cloned()
            .collect();
        profiles.extend(self.repository.list(direction));
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    fn ensure_not_system(&self, name: &str) -> EngineResult<()> {
        if name.starts_with(SYSTEM_PROFILE_PREFIX)
            || self
                .system
                .keys()
                .any(|(_, system_name)| system_name == name)
        {
            return Err(TranslationError::config(format!(
                "profile '{name}' is a system profile and cannot be modified"
            )));
        }
        Ok(())
    }
}

/// Binds every rule's action against the registry for the profile's
/// direction, surfacing the registry's configuration error.
///
/// This runs at management time only; profiles already stored keep
/// degrading to the blind stopper at translate time when their metadata
/// has since vanished.
fn validate_actions(profile: &TranslationProfile) -> EngineResult<()> {
    for rule in &profile.rules {
        match profile.direction {
            ProfileDirection::Input => {
                InputActionRegistry::new().resolve(&rule.action)?;
            }
            ProfileDirection::Output => {
                OutputActionRegistry::new().resolve(&rule.action)?;
            }
        }
    }
    Ok(())
}

impl ProfileResolver for ProfileManager {
    fn get_profile(&self, direction: ProfileDirection, name: &str) -> Option<TranslationProfile> {
        self.lookup(direction, name)
    }

    fn list_profiles(&self, direction: ProfileDirection) -> Vec<TranslationProfile> {
        self.merged_list(direction)
    }
}
