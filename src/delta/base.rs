//! Base profile: the values a series' instances share
//!
//! Built once per series from two sample instances and frozen afterwards. The
//! profile is only ever a comparison and merge anchor; no instance stores it
//! as its own value.

use tracing::debug;

use crate::core::DecodeError;
use crate::delta::diff::encode;
use crate::delta::node::{decode_nodes, parse_nodes, DeltaNode};
use crate::delta::settings::OutputSettings;
use crate::format::{names, TreeNode};
use crate::types::{Dataset, Tag};

/// Frozen baseline collection plus its serialized form
#[derive(Clone, Debug, PartialEq)]
pub struct BaseProfile {
    dataset: Dataset,
    nodes: Vec<DeltaNode>,
}

impl BaseProfile {
    /// Build a profile from two sample collections.
    ///
    /// A key enters the profile when both samples hold it with the same
    /// non-empty value. Bulk values held by both samples are marked excluded
    /// instead, as are keys both samples already exclude. The result is then
    /// written once under `settings` and frozen in exactly the form it is
    /// serialized in.
    ///
    /// # Arguments
    ///
    /// * `first` - first sample
    /// * `second` - second sample
    /// * `settings` - inclusion policy applied to the profile's own values
    pub fn build(first: &Dataset, second: &Dataset, settings: &OutputSettings) -> Self {
        let mut profile = Dataset::new();

        for attribute in first {
            if attribute.vr.is_bulk() {
                if second.has(attribute.tag) {
                    profile.exclude(attribute.tag, attribute.vr);
                }
                continue;
            }
            if attribute.is_empty() {
                continue;
            }
            if second.get(attribute.tag).is_some_and(|other| other == attribute) {
                profile.insert(attribute.clone());
            }
        }

        for tag in first.exclusions().iter() {
            if second.is_excluded(tag) {
                if let Some(attribute) = first.get(tag).or_else(|| second.get(tag)) {
                    profile.exclude(tag, attribute.vr);
                }
            }
        }

        let nodes = encode(&mut profile, None, settings);
        debug!(
            shared = profile.len(),
            excluded = profile.exclusions().len(),
            "Built base profile"
        );
        Self::from_nodes(nodes)
    }

    /// Rebuild a profile from its serialized markers
    pub fn from_nodes(nodes: Vec<DeltaNode>) -> Self {
        Self { dataset: decode_nodes(&nodes), nodes }
    }

    /// Parse a `<BaseInstance>` element
    pub fn from_tree(node: &TreeNode) -> Result<Self, DecodeError> {
        Ok(Self::from_nodes(parse_nodes(node)?))
    }

    /// Element form of the profile
    pub fn to_tree(&self) -> TreeNode {
        let mut node = TreeNode::new(names::BASE_INSTANCE);
        for child in &self.nodes {
            node.push(child.to_tree());
        }
        node
    }

    /// The baseline collection
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Serialized markers of the profile
    pub fn nodes(&self) -> &[DeltaNode] {
        &self.nodes
    }

    /// Check if the profile excludes a key
    pub fn is_excluded(&self, tag: Tag) -> bool {
        self.dataset.is_excluded(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{tags, Vr};

    fn sample(description: &str) -> Dataset {
        let mut ds = Dataset::new();
        ds.set(tags::MODALITY, Vr::CS, "MR");
        ds.set(tags::SERIES_DESCRIPTION, Vr::LO, description);
        ds.set(tags::IMAGE_COMMENTS, Vr::LT, "");
        ds.set(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA, Vr::OW, vec![1u16, 2]);
        ds
    }

    #[test]
    fn test_build_keeps_only_equal_values() {
        let profile = BaseProfile::build(&sample("Brain"), &sample("Spine"), &OutputSettings::default());
        let ds = profile.dataset();
        assert_eq!(ds.get_string(tags::MODALITY), Some("MR"));
        assert!(!ds.has(tags::SERIES_DESCRIPTION));
        assert!(!ds.has(tags::IMAGE_COMMENTS));
    }

    #[test]
    fn test_bulk_values_are_excluded_not_shared() {
        let profile = BaseProfile::build(&sample("Brain"), &sample("Brain"), &OutputSettings::default());
        assert!(profile.is_excluded(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA));
        assert!(!profile.dataset().contains(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA));
    }

    #[test]
    fn test_common_exclusions_propagate() {
        let mut a = sample("Brain");
        let mut b = sample("Brain");
        a.exclude(tags::SPECTROSCOPY_DATA, Vr::OF);
        b.exclude(tags::SPECTROSCOPY_DATA, Vr::OF);
        a.exclude(tags::STUDY_DESCRIPTION, Vr::LO);

        let profile = BaseProfile::build(&a, &b, &OutputSettings::default());
        assert!(profile.is_excluded(tags::SPECTROSCOPY_DATA));
        assert!(!profile.is_excluded(tags::STUDY_DESCRIPTION));
    }

    #[test]
    fn test_tree_round_trip() {
        let profile = BaseProfile::build(&sample("Brain"), &sample("Spine"), &OutputSettings::default());
        let tree = profile.to_tree();
        assert_eq!(tree.name, "BaseInstance");
        assert!(tree.attributes.is_empty());
        assert_eq!(BaseProfile::from_tree(&tree).unwrap(), profile);
    }
}
