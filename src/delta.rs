//! Delta engine for instance collections.
//!
//! Each instance of a series is written as a list of markers relative to the
//! series' base profile:
//! - Values shared with the base profile are not written at all
//! - Keys the base has but the instance lacks become empty markers
//! - Values left out by the inclusion policy become excluded markers
//!
//! Loaded instances decode lazily, merging the base profile and their markers
//! key by key as callers ask for them.

/// Inclusion policy and emission settings
pub mod settings;
/// Value, empty and excluded markers
pub mod node;
/// Lockstep diff against a base collection
pub mod diff;
/// Series base profile
pub mod base;
/// Eager and deferred instance records
pub mod instance;

pub use base::BaseProfile;
pub use instance::{InstanceMetadata, InstanceRecord, Resolution, DEFAULT_TRANSFER_SYNTAX_UID};
pub use node::{DeltaNode, Payload};
pub use settings::{OutputSettings, TagInclusion};
