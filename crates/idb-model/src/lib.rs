//! # idb-model
//!
//! Domain model for the idbroker identity federation engine.
//!
//! This crate defines the persistent identity model (entities, identities,
//! attributes, groups) and the serialized translation-profile model
//! (profiles, rules, actions) shared by the storage and translation crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attribute;
pub mod entity;
pub mod group;
pub mod identity;
pub mod profile;
pub mod provenance;

pub use attribute::{Attribute, StoredAttribute};
pub use entity::{Entity, EntityScheduledChange, EntityState, ScheduledOperation};
pub use group::GroupMembership;
pub use identity::{Identity, IdentityParam};
pub use profile::{
    ProfileAction, ProfileDirection, ProfileMode, TranslationProfile, TranslationRule,
    SYSTEM_PROFILE_PREFIX,
};
pub use provenance::Provenance;
