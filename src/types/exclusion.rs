//! Exclusion sets
//!
//! An exclusion set records the keys for which a collection intentionally has
//! no value in its serialized form, which is different from the key being
//! absent altogether.

use std::collections::BTreeSet;

use crate::types::Tag;

/// Sorted set of excluded keys owned by one [`Dataset`](crate::types::Dataset).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    tags: BTreeSet<Tag>,
}

impl ExclusionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test without cleanup
    pub fn is_excluded(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Mark a key excluded
    pub fn add(&mut self, tag: Tag) {
        self.tags.insert(tag);
    }

    /// Mark several keys excluded
    pub fn add_all(&mut self, tags: impl IntoIterator<Item = Tag>) {
        self.tags.extend(tags);
    }

    /// Clear the mark for a key
    pub fn remove(&mut self, tag: Tag) -> bool {
        self.tags.remove(&tag)
    }

    /// Number of excluded keys
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if nothing is excluded
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Ascending iteration without cleanup
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tags.iter().copied()
    }

    /// Drop every key for which `has_value` now reports a resolvable value,
    /// then return the remaining keys in ascending order.
    pub fn list(&mut self, mut has_value: impl FnMut(Tag) -> bool) -> Vec<Tag> {
        self.tags.retain(|tag| !has_value(*tag));
        self.tags.iter().copied().collect()
    }
}
