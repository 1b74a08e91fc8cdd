//! Attribute collections
//!
//! A [`Dataset`] is an ordered map from tag to attribute plus the exclusion
//! set that travels with it. Iteration is always ascending by tag.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::{ExclusionSet, Tag, Value, Vr};

/// A tagged, typed value
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute key
    pub tag: Tag,
    /// Value representation
    pub vr: Vr,
    /// Value, possibly empty
    pub value: Value,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(tag: Tag, vr: Vr, value: impl Into<Value>) -> Self {
        Self { tag, vr, value: value.into() }
    }

    /// Create an attribute with no value
    pub fn empty(tag: Tag, vr: Vr) -> Self {
        Self { tag, vr, value: Value::Empty }
    }

    /// Check if the attribute carries no value
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Approximate encoded value length in bytes
    pub fn stream_length(&self) -> u64 {
        self.value.stream_length()
    }
}

/// Ordered attribute collection with its own exclusion set
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    attributes: BTreeMap<Tag, Attribute>,
    excluded: ExclusionSet,
}

impl Dataset {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an attribute, empty or not
    pub fn get(&self, tag: Tag) -> Option<&Attribute> {
        self.attributes.get(&tag)
    }

    /// Get a mutable attribute
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut Attribute> {
        self.attributes.get_mut(&tag)
    }

    /// First string value of an attribute
    pub fn get_string(&self, tag: Tag) -> Option<&str> {
        self.get(tag).and_then(|a| a.value.as_str())
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, attribute: Attribute) {
        self.attributes.insert(attribute.tag, attribute);
    }

    /// Insert or replace a value
    pub fn set(&mut self, tag: Tag, vr: Vr, value: impl Into<Value>) {
        self.insert(Attribute::new(tag, vr, value));
    }

    /// Force an empty value for a key, keeping an existing representation
    pub fn set_empty(&mut self, tag: Tag, vr: Vr) {
        self.attributes
            .entry(tag)
            .and_modify(|a| a.value = Value::Empty)
            .or_insert_with(|| Attribute::empty(tag, vr));
    }

    /// Remove an attribute
    pub fn remove(&mut self, tag: Tag) -> Option<Attribute> {
        self.attributes.remove(&tag)
    }

    /// Present with a non-empty value
    pub fn contains(&self, tag: Tag) -> bool {
        self.get(tag).is_some_and(|a| !a.is_empty())
    }

    /// Present at all, possibly empty
    pub fn has(&self, tag: Tag) -> bool {
        self.attributes.contains_key(&tag)
    }

    /// Number of attributes, empty ones included
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Ascending iteration
    pub fn iter(&self) -> btree_map::Values<'_, Tag, Attribute> {
        self.attributes.values()
    }

    /// Ascending iteration over keys strictly above `after` and up to `upto`
    pub fn range_after(
        &self,
        after: Option<Tag>,
        upto: Tag,
    ) -> impl Iterator<Item = &Attribute> + '_ {
        // BTreeMap::range panics on an inverted range; clamp to an empty one.
        let lower = match after {
            Some(tag) => Bound::Excluded(tag.min(upto)),
            None => Bound::Unbounded,
        };
        self.attributes
            .range((lower, Bound::Included(upto)))
            .map(|(_, a)| a)
    }

    /// Exclusion set, without cleanup
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.excluded
    }

    /// Mutable exclusion set
    pub fn exclusions_mut(&mut self) -> &mut ExclusionSet {
        &mut self.excluded
    }

    /// Check whether a key is intentionally without a value
    pub fn is_excluded(&self, tag: Tag) -> bool {
        self.excluded.is_excluded(tag)
    }

    /// Mark a key excluded and make sure the collection holds it, empty.
    pub fn exclude(&mut self, tag: Tag, vr: Vr) {
        self.set_empty(tag, vr);
        self.excluded.add(tag);
    }

    /// Excluded keys, ascending. Keys that have since gained a value are
    /// dropped from the set first.
    pub fn excluded_tags(&mut self) -> Vec<Tag> {
        let attributes = &self.attributes;
        self.excluded
            .list(|tag| attributes.get(&tag).is_some_and(|a| !a.is_empty()))
    }

    /// Copy without the private tags, unknown-VR tags or explicit keys the
    /// caller wants left out. Exclusions of copied keys are carried over.
    pub fn copy_filtered(&self, include_private: bool, include_unknown: bool, skip: &[Tag]) -> Dataset {
        let mut copy = Dataset::new();
        for attribute in self.iter() {
            if (!include_private && attribute.tag.is_private())
                || (!include_unknown && attribute.vr.is_unknown())
                || skip.contains(&attribute.tag)
            {
                continue;
            }
            copy.insert(attribute.clone());
            if self.is_excluded(attribute.tag) {
                copy.excluded.add(attribute.tag);
            }
        }
        copy
    }

    /// Approximate encoded length of all attributes
    pub fn stream_length(&self) -> u64 {
        self.iter().map(|a| 8 + a.stream_length()).sum()
    }
}

/// Structural equality over the attributes; exclusion bookkeeping is not compared.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Attribute;
    type IntoIter = btree_map::Values<'a, Tag, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Attribute> for Dataset {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for attribute in iter {
            dataset.insert(attribute);
        }
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dictionary::tags;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.set(tags::SERIES_DESCRIPTION, Vr::LO, "Brain");
        ds.set(tags::MODALITY, Vr::CS, "MR");
        ds.set(Tag::new(0x0009_1001), Vr::LO, "private");
        ds.set(Tag::new(0x0011_0001), Vr::UN, Value::Bytes(bytes::Bytes::from_static(b"ab")));
        ds
    }

    #[test]
    fn test_iteration_is_ascending() {
        let ds = sample();
        let order: Vec<Tag> = ds.iter().map(|a| a.tag).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_range_after() {
        let ds = sample();
        let all: Vec<Tag> = ds.range_after(None, Tag::MAX).map(|a| a.tag).collect();
        assert_eq!(all.len(), 4);
        let tail: Vec<Tag> = ds
            .range_after(Some(tags::MODALITY), tags::SERIES_DESCRIPTION)
            .map(|a| a.tag)
            .collect();
        assert_eq!(tail, vec![tags::SERIES_DESCRIPTION]);
        assert_eq!(ds.range_after(Some(tags::SERIES_DESCRIPTION), tags::MODALITY).count(), 0);
    }

    #[test]
    fn test_excluded_tags_self_clean() {
        let mut ds = Dataset::new();
        ds.exclude(tags::PIXEL_DATA, Vr::OW);
        assert!(ds.has(tags::PIXEL_DATA));
        assert!(!ds.contains(tags::PIXEL_DATA));
        assert_eq!(ds.excluded_tags(), vec![tags::PIXEL_DATA]);
        assert_eq!(ds.excluded_tags(), vec![tags::PIXEL_DATA]);

        ds.set(tags::PIXEL_DATA, Vr::OW, vec![1u16, 2]);
        assert!(ds.excluded_tags().is_empty());
        assert!(!ds.is_excluded(tags::PIXEL_DATA));
    }

    #[test]
    fn test_copy_filtered() {
        let ds = sample();
        let copy = ds.copy_filtered(false, false, &[tags::SERIES_DESCRIPTION]);
        assert_eq!(copy.len(), 1);
        assert!(copy.contains(tags::MODALITY));

        let full = ds.copy_filtered(true, true, &[]);
        assert_eq!(full, ds);
    }

    #[test]
    fn test_set_empty_keeps_representation() {
        let mut ds = sample();
        ds.set_empty(tags::MODALITY, Vr::UN);
        assert_eq!(ds.get(tags::MODALITY).unwrap().vr, Vr::CS);
        assert!(ds.get(tags::MODALITY).unwrap().is_empty());
    }
}
