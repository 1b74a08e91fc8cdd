//! Attribute model consumed by the codec
//!
//! Ordered attribute collections, their keys, value representations and
//! values, plus the exclusion sets that travel with them.

/// Attribute keys
pub mod tag;
/// Value representations and their capability flags
pub mod vr;
/// Attribute values
pub mod value;
/// Exclusion sets
pub mod exclusion;
/// Attributes and ordered collections
pub mod dataset;
/// Built-in tag dictionary
pub mod dictionary;

// Re-export commonly used types for convenience
pub use tag::Tag;
pub use vr::{ValueKind, Vr};
pub use value::Value;
pub use exclusion::ExclusionSet;
pub use dataset::{Attribute, Dataset};
pub use dictionary::tags;
