//! # idb-translation
//!
//! Translation profile engine for the idbroker identity federation broker.
//!
//! A translation profile is an ordered, versioned list of conditional
//! rules. When a user authenticates through a remote source, the inbound
//! engine runs the configured profile over the remote data and applies the
//! accumulated mapping to the identity store in one transaction. For
//! outbound requests, the symmetric output engine decides which local data
//! is disclosed to the relying party.
//!
//! ## Components
//!
//! - [`expression`] - the expression-evaluator seam and a small built-in
//!   evaluator
//! - [`actions`] - action registries and action instances per direction
//! - [`profile`] - runtime profiles: rule evaluation order, inclusion,
//!   cycle guard
//! - [`engine`] - inbound apply + stale-data reconciliation
//! - [`output_engine`] - outbound persist + filtering
//! - [`manager`] - profile management surface and system profiles

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod actions;
pub mod context;
pub mod effect;
pub mod engine;
pub mod error;
pub mod expression;
pub mod input;
pub mod manager;
pub mod output;
pub mod output_engine;
pub mod profile;
pub mod result;

pub use context::RuleContext;
pub use effect::{AttributeEffectMode, GroupEffectMode, IdentityEffectMode};
pub use engine::InputTranslationEngine;
pub use error::{EngineResult, TranslationError};
pub use expression::{ExpressionError, ExpressionEvaluator, ExpressionValue, SimpleEvaluator};
pub use input::{RemoteAttribute, RemoteIdentity, RemotelyAuthenticatedInput};
pub use manager::{
    MemoryProfileRepository, NoSystemProfiles, ProfileManager, ProfileRepository,
    StaticSystemProfiles, SystemProfileProvider,
};
pub use output::{DynamicAttribute, TranslationInput, TranslationResult};
pub use output_engine::OutputTranslationEngine;
pub use profile::{InputTranslationProfile, OutputTranslationProfile, ProfileResolver};
pub use result::{
    MappedAttribute, MappedEntityChange, MappedGroup, MappedIdentity, MappingResult,
};
