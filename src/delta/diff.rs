//! Memento production: diff a collection against a base collection
//!
//! Both collections are walked in ascending key order in lockstep. Keys the
//! base holds with a value but the collection lacks become empty markers, keys
//! identical to the base produce nothing, everything else goes through the
//! inclusion policy.

use crate::delta::node::{DeltaNode, Payload};
use crate::delta::settings::{OutputSettings, TagInclusion};
use crate::types::{dictionary, Attribute, Dataset, Tag, Value, Vr};

fn default_vr(tag: Tag) -> Vr {
    dictionary::by_tag(tag).map_or(Vr::UN, |entry| entry.vr)
}

/// Diff `dataset` against `base`, or write it in full when there is no base.
///
/// Keys marked excluded by the policy are recorded in the collection's
/// exclusion set and their values cleared, so the collection agrees with the
/// memento afterwards.
pub fn encode(dataset: &mut Dataset, base: Option<&Dataset>, settings: &OutputSettings) -> Vec<DeltaNode> {
    // Excluded keys of either side must be visited even when this collection
    // has no attribute for them.
    let this_excluded = dataset.excluded_tags();
    let mut seeds: Vec<(Tag, Vr)> = this_excluded.iter().map(|&tag| (tag, default_vr(tag))).collect();
    if let Some(base) = base {
        seeds.extend(
            base.exclusions()
                .iter()
                .map(|tag| (tag, base.get(tag).map_or_else(|| default_vr(tag), |a| a.vr))),
        );
    }
    for (tag, vr) in seeds {
        if !dataset.has(tag) {
            dataset.insert(Attribute::empty(tag, vr));
        }
    }

    let keys: Vec<Tag> = dataset.iter().map(|a| a.tag).collect();
    let mut base_iter = base.map(|b| b.iter().peekable());
    let mut nodes = Vec::new();
    let mut newly_excluded = Vec::new();

    for tag in keys {
        let Some(attribute) = dataset.get(tag) else {
            continue;
        };
        let excluded_here = this_excluded.binary_search(&tag).is_ok();
        let excluded_in_base = base.is_some_and(|b| b.is_excluded(tag));
        let mut in_base = excluded_in_base;
        let mut same = excluded_here && excluded_in_base;

        if let Some(iter) = base_iter.as_mut() {
            while let Some(skipped) = iter.next_if(|b| b.tag < tag) {
                if !skipped.is_empty() {
                    nodes.push(DeltaNode::Empty { tag: skipped.tag, vr: skipped.vr });
                }
            }
            if let Some(base_attribute) = iter.next_if(|b| b.tag == tag) {
                in_base = !base_attribute.is_empty() || excluded_in_base;
                let empty = attribute.is_empty() && !excluded_here;
                let empty_in_base = base_attribute.is_empty() && !excluded_in_base;
                same = (excluded_here && excluded_in_base) || (empty && empty_in_base);

                if !base_attribute.is_empty()
                    && !excluded_in_base
                    && !attribute.vr.is_bulk()
                    && attribute == base_attribute
                {
                    same = true;
                }
            }
        }

        if same {
            continue;
        }

        let vr = attribute.vr;
        if excluded_here {
            nodes.push(DeltaNode::Excluded { tag, vr });
            continue;
        }

        if attribute.is_empty() {
            if in_base {
                nodes.push(DeltaNode::Empty { tag, vr });
            }
            continue;
        }

        match settings.decide(attribute) {
            TagInclusion::MarkExcluded => {
                newly_excluded.push((tag, vr));
                if !excluded_in_base {
                    nodes.push(DeltaNode::Excluded { tag, vr });
                }
            }
            TagInclusion::Drop => {}
            TagInclusion::Include => {
                let text = attribute.value.to_text();
                let payload = match text {
                    Some(text) => Payload::Text(text),
                    None => {
                        let items = match dataset.get_mut(tag).map(|a| &mut a.value) {
                            Some(Value::Sequence(items)) => {
                                items.iter_mut().map(|item| encode(item, None, settings)).collect()
                            }
                            _ => Vec::new(),
                        };
                        Payload::Items(items)
                    }
                };
                nodes.push(DeltaNode::Value { tag, vr, payload });
            }
        }
    }

    if let Some(iter) = base_iter {
        for remaining in iter {
            if !remaining.is_empty() {
                nodes.push(DeltaNode::Empty { tag: remaining.tag, vr: remaining.vr });
            }
        }
    }

    for (tag, vr) in newly_excluded {
        dataset.exclude(tag, vr);
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::node::decode_nodes;
    use crate::types::tags;

    fn base() -> Dataset {
        let mut ds = Dataset::new();
        ds.set(tags::MODALITY, Vr::CS, "MR");
        ds.set(tags::PATIENTS_NAME, Vr::PN, "Doe^John");
        ds.set(tags::STUDY_DESCRIPTION, Vr::LO, "Head");
        ds.exclude(tags::PIXEL_DATA, Vr::OW);
        ds
    }

    #[test]
    fn test_identical_collection_produces_only_base_exclusion_markers() {
        let mut ds = base();
        ds.exclusions_mut().remove(tags::PIXEL_DATA);
        ds.remove(tags::PIXEL_DATA);
        let nodes = encode(&mut ds, Some(&base()), &OutputSettings::default());
        assert_eq!(nodes, vec![DeltaNode::Empty { tag: tags::PIXEL_DATA, vr: Vr::OW }]);
    }

    #[test]
    fn test_shared_exclusion_is_silent() {
        let mut ds = base();
        let nodes = encode(&mut ds, Some(&base()), &OutputSettings::default());
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_differences_and_gaps() {
        let mut ds = Dataset::new();
        ds.set(tags::MODALITY, Vr::CS, "CT");
        ds.set(tags::SERIES_DESCRIPTION, Vr::LO, "Brain");
        ds.exclude(tags::PIXEL_DATA, Vr::OW);

        let nodes = encode(&mut ds, Some(&base()), &OutputSettings::default());
        assert_eq!(
            nodes,
            vec![
                DeltaNode::Value { tag: tags::MODALITY, vr: Vr::CS, payload: Payload::Text("CT".into()) },
                DeltaNode::Empty { tag: tags::STUDY_DESCRIPTION, vr: Vr::LO },
                DeltaNode::Value {
                    tag: tags::SERIES_DESCRIPTION,
                    vr: Vr::LO,
                    payload: Payload::Text("Brain".into())
                },
                DeltaNode::Empty { tag: tags::PATIENTS_NAME, vr: Vr::PN },
            ]
        );
    }

    #[test]
    fn test_policy_exclusion_updates_collection() {
        let mut ds = Dataset::new();
        ds.set(tags::IMAGE_COMMENTS, Vr::LT, "z".repeat(100));
        let settings = OutputSettings { max_tag_length: 10, ..OutputSettings::default() };

        let nodes = encode(&mut ds, None, &settings);
        assert_eq!(nodes, vec![DeltaNode::Excluded { tag: tags::IMAGE_COMMENTS, vr: Vr::LT }]);
        assert!(ds.is_excluded(tags::IMAGE_COMMENTS));
        assert!(!ds.contains(tags::IMAGE_COMMENTS));

        // Already excluded: written as excluded again without consulting the policy.
        let again = encode(&mut ds, None, &OutputSettings::include_all());
        assert_eq!(again, nodes);
    }

    #[test]
    fn test_bulk_values_are_never_shared() {
        let mut shared = Dataset::new();
        shared.set(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA, Vr::OW, vec![1u16, 2, 3]);
        let mut ds = shared.clone();

        let nodes = encode(&mut ds, Some(&shared), &OutputSettings::default());
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], DeltaNode::Value { vr: Vr::OW, .. }));
    }

    #[test]
    fn test_full_encoding_decodes_back() {
        let mut item = Dataset::new();
        item.set(tags::REFERENCED_SOP_INSTANCE_UID, Vr::UI, "1.2.3");
        let mut ds = base();
        ds.set(tags::SOURCE_IMAGE_SEQUENCE, Vr::SQ, vec![item]);
        ds.set(tags::ROWS, Vr::US, Value::Unsigned(vec![512]));

        let original = ds.clone();
        let nodes = encode(&mut ds, None, &OutputSettings::default());
        let decoded = decode_nodes(&nodes);
        assert_eq!(decoded, original);
        assert!(decoded.is_excluded(tags::PIXEL_DATA));
    }
}
