//! Output settings and the inclusion policy
//!
//! Pure configuration: nothing here touches a record. Instance serialization
//! asks [`OutputSettings::decide`] once per attribute that differs from the
//! base profile.

use serde::{Deserialize, Serialize};

use crate::types::Attribute;

/// Default byte threshold above which a value counts as oversized
pub const DEFAULT_MAX_TAG_LENGTH: u64 = 2048;

/// What to do with an attribute value when writing a memento
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagInclusion {
    /// Write the value in full
    #[default]
    Include,
    /// Write an excluded marker and remember the key as excluded
    MarkExcluded,
    /// Write nothing; the value is gone from this memento
    Drop,
}

/// Codec-wide emission settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Policy for private (odd group) tags
    pub include_private: TagInclusion,
    /// Policy for values of unknown representation
    pub include_unknown: TagInclusion,
    /// Policy for values longer than `max_tag_length`
    pub include_large: TagInclusion,
    /// Byte threshold for oversized values
    pub max_tag_length: u64,
    /// Whether instance nodes carry the source file name
    pub include_source_file_name: bool,
    /// Emit instance nodes as pre-rendered fragments
    pub compact: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            include_private: TagInclusion::Drop,
            include_unknown: TagInclusion::Drop,
            include_large: TagInclusion::MarkExcluded,
            max_tag_length: DEFAULT_MAX_TAG_LENGTH,
            include_source_file_name: true,
            compact: false,
        }
    }
}

impl OutputSettings {
    /// Settings that keep every value
    pub fn include_all() -> Self {
        Self {
            include_private: TagInclusion::Include,
            include_unknown: TagInclusion::Include,
            include_large: TagInclusion::Include,
            ..Self::default()
        }
    }

    /// Decide how an attribute is written.
    ///
    /// Sequences are always included unless private, in which case they
    /// follow the private policy alone; their items are judged one by one
    /// when written. Other private
    /// values and unknown-representation values follow their policy unless it
    /// is plain inclusion. Values within the size threshold are included;
    /// oversized bulk values are always marked excluded; anything else
    /// oversized follows the large-value policy.
    pub fn decide(&self, attribute: &Attribute) -> TagInclusion {
        if attribute.vr.is_sequence() {
            return if attribute.tag.is_private() {
                self.include_private
            } else {
                TagInclusion::Include
            };
        }

        if attribute.tag.is_private() && self.include_private != TagInclusion::Include {
            return self.include_private;
        }

        if attribute.vr.is_unknown() && self.include_unknown != TagInclusion::Include {
            return self.include_unknown;
        }

        if self.include_large == TagInclusion::Include {
            return TagInclusion::Include;
        }

        if attribute.stream_length() <= self.max_tag_length {
            return TagInclusion::Include;
        }

        if attribute.vr.is_bulk() {
            return TagInclusion::MarkExcluded;
        }

        self.include_large
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{tags, Dataset, Tag, Value, Vr};

    fn attr(tag: Tag, vr: Vr, value: impl Into<Value>) -> Attribute {
        Attribute::new(tag, vr, value)
    }

    #[test]
    fn test_defaults() {
        let settings = OutputSettings::default();
        assert_eq!(settings.include_private, TagInclusion::Drop);
        assert_eq!(settings.include_unknown, TagInclusion::Drop);
        assert_eq!(settings.include_large, TagInclusion::MarkExcluded);
        assert_eq!(settings.max_tag_length, 2048);
        assert!(settings.include_source_file_name);
        assert!(!settings.compact);
    }

    #[test]
    fn test_private_policy() {
        let settings = OutputSettings::default();
        let private = attr(Tag::new(0x0009_1001), Vr::LO, "vendor");
        assert_eq!(settings.decide(&private), TagInclusion::Drop);

        let marked = OutputSettings { include_private: TagInclusion::MarkExcluded, ..settings.clone() };
        assert_eq!(marked.decide(&private), TagInclusion::MarkExcluded);

        let private_seq = attr(Tag::new(0x0009_1002), Vr::SQ, vec![Dataset::new()]);
        let included = OutputSettings { include_private: TagInclusion::Include, ..settings };
        assert_eq!(included.decide(&private_seq), TagInclusion::Include);
    }

    #[test]
    fn test_public_sequences_are_always_included() {
        let mut item = Dataset::new();
        item.set(tags::REFERENCED_SOP_INSTANCE_UID, Vr::UI, "1.2.3.4.5.6.7.8");
        let seq = attr(tags::SOURCE_IMAGE_SEQUENCE, Vr::SQ, vec![item]);
        let settings = OutputSettings { max_tag_length: 0, ..OutputSettings::default() };
        assert_eq!(settings.decide(&seq), TagInclusion::Include);
    }

    #[test]
    fn test_unknown_policy() {
        let settings = OutputSettings::default();
        let unknown = attr(Tag::new(0x0018_9999), Vr::UN, bytes::Bytes::from_static(b"ab"));
        assert_eq!(settings.decide(&unknown), TagInclusion::Drop);
        assert_eq!(OutputSettings::include_all().decide(&unknown), TagInclusion::Include);
    }

    #[test]
    fn test_oversized_thresholds() {
        let text = attr(tags::IMAGE_COMMENTS, Vr::LT, "x".repeat(64));
        let bulk = attr(tags::PIXEL_DATA, Vr::OW, vec![7u16; 64]);
        let big = attr(tags::IMAGE_COMMENTS, Vr::LT, "y".repeat(1_048_578));

        for threshold in [0u64, 1, 1_048_576] {
            let settings = OutputSettings { max_tag_length: threshold, ..OutputSettings::default() };
            let expected = |a: &Attribute| {
                if a.stream_length() > threshold {
                    TagInclusion::MarkExcluded
                } else {
                    TagInclusion::Include
                }
            };
            assert_eq!(settings.decide(&text), expected(&text), "T={}", threshold);
            assert_eq!(settings.decide(&bulk), expected(&bulk), "T={}", threshold);
            assert_eq!(settings.decide(&big), expected(&big), "T={}", threshold);
        }
    }

    #[test]
    fn test_oversized_bulk_is_excluded_even_when_large_policy_drops() {
        let settings = OutputSettings {
            include_large: TagInclusion::Drop,
            max_tag_length: 4,
            ..OutputSettings::default()
        };
        let bulk = attr(tags::PIXEL_DATA, Vr::OW, vec![1u16; 8]);
        let text = attr(tags::IMAGE_COMMENTS, Vr::LT, "long comment");
        assert_eq!(settings.decide(&bulk), TagInclusion::MarkExcluded);
        assert_eq!(settings.decide(&text), TagInclusion::Drop);
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: OutputSettings =
            toml::from_str("include_large = \"drop\"\nmax_tag_length = 16\n").unwrap();
        assert_eq!(settings.include_large, TagInclusion::Drop);
        assert_eq!(settings.max_tag_length, 16);
        assert_eq!(settings.include_private, TagInclusion::Drop);
    }
}
