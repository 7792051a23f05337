//! # idb-storage
//!
//! Storage abstraction for the idbroker identity store.
//!
//! This crate defines the provider interfaces the translation engine
//! drives, plus an in-memory reference implementation.
//!
//! ## Provider Traits
//!
//! - [`EntityProvider`] - entities, identities and scheduled operations
//! - [`GroupProvider`] - groups and memberships
//! - [`AttributeProvider`] - attributes and confirmation state
//! - [`DirectoryStore`] - all of the above plus the transaction boundary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attribute;
pub mod entity;
pub mod error;
pub mod group;
pub mod memory;
pub mod store;

pub use attribute::AttributeProvider;
pub use entity::EntityProvider;
pub use error::{StorageError, StorageResult};
pub use group::GroupProvider;
pub use memory::MemoryStore;
pub use store::DirectoryStore;
