//! Provenance tags for remotely-sourced data.
//!
//! Every identity, attribute and group membership created by a translation
//! run is stamped with the remote IdP and the profile that produced it.
//! Stale-data reconciliation uses this tag to find data owned by the
//! current run that was not re-asserted.

use serde::{Deserialize, Serialize};

/// The `(remote IdP, translation profile)` tag attached to data created by
/// a translation run.
///
/// Locally-created data carries no tag ([`Provenance::local`]); such data
/// never matches any run's provenance and is never touched by stale-data
/// removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the remote identity provider, if any.
    pub remote_idp: Option<String>,

    /// Name of the translation profile that produced the data, if any.
    pub translation_profile: Option<String>,
}

impl Provenance {
    /// Creates a provenance tag for a remote source.
    #[must_use]
    pub fn remote(idp: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            remote_idp: Some(idp.into()),
            translation_profile: Some(profile.into()),
        }
    }

    /// Creates an empty tag for locally-owned data.
    #[must_use]
    pub fn local() -> Self {
        Self::default()
    }

    /// Checks whether this tag identifies a remote source.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote_idp.is_some() && self.translation_profile.is_some()
    }

    /// Checks whether two tags identify the same remote source.
    ///
    /// An absent component never matches, not even another absent one, so
    /// locally-owned data can never be claimed by a translation run.
    #[must_use]
    pub fn matches(&self, other: &Provenance) -> bool {
        component_matches(&self.remote_idp, &other.remote_idp)
            && component_matches(&self.translation_profile, &other.translation_profile)
    }
}

fn component_matches(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}
