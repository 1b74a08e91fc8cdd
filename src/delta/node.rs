//! Delta markers
//!
//! A record's memento is an ordered list of [`DeltaNode`]s. Each one is a
//! value, an empty marker (suppress the base value) or an excluded marker
//! (value deliberately not recorded). Value text is kept as written and only
//! parsed when the owning record resolves that key.

use tracing::error;

use crate::core::DecodeError;
use crate::format::{names, TreeNode};
use crate::types::{Dataset, Tag, Value, Vr};

/// Payload of a value marker
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Scalar or array value in text form
    Text(String),
    /// Nested item collections, each as its own marker list
    Items(Vec<Vec<DeltaNode>>),
}

/// One marker in a memento
#[derive(Clone, Debug, PartialEq)]
pub enum DeltaNode {
    /// Value recorded for this key
    Value {
        /// Attribute key
        tag: Tag,
        /// Declared value representation
        vr: Vr,
        /// Recorded value
        payload: Payload,
    },
    /// Key is present but empty; suppresses any base value
    Empty {
        /// Attribute key
        tag: Tag,
        /// Declared value representation
        vr: Vr,
    },
    /// Key has a value that was deliberately not recorded
    Excluded {
        /// Attribute key
        tag: Tag,
        /// Declared value representation
        vr: Vr,
    },
}

impl DeltaNode {
    /// Attribute key of the marker
    pub fn tag(&self) -> Tag {
        match self {
            DeltaNode::Value { tag, .. } | DeltaNode::Empty { tag, .. } | DeltaNode::Excluded { tag, .. } => *tag,
        }
    }

    /// Declared value representation of the marker
    pub fn vr(&self) -> Vr {
        match self {
            DeltaNode::Value { vr, .. } | DeltaNode::Empty { vr, .. } | DeltaNode::Excluded { vr, .. } => *vr,
        }
    }

    /// Apply this marker to a collection.
    ///
    /// Values clear any exclusion of the key, empty markers force an empty
    /// value and clear the exclusion, excluded markers force an empty value and
    /// record the exclusion. A value that does not parse as its declared
    /// representation is logged and left empty.
    pub fn apply(&self, dataset: &mut Dataset) {
        match self {
            DeltaNode::Value { tag, vr, payload } => {
                match payload {
                    Payload::Text(text) => match Value::parse(*vr, text) {
                        Ok(value) => dataset.set(*tag, *vr, value),
                        Err(e) => {
                            error!(tag = %tag, error = %e, "Ignoring unparseable attribute value");
                            dataset.set_empty(*tag, *vr);
                        }
                    },
                    Payload::Items(items) => {
                        let items: Vec<Dataset> = items.iter().map(|nodes| decode_nodes(nodes)).collect();
                        dataset.set(*tag, *vr, Value::Sequence(items));
                    }
                }
                dataset.exclusions_mut().remove(*tag);
            }
            DeltaNode::Empty { tag, vr } => {
                dataset.set_empty(*tag, *vr);
                dataset.exclusions_mut().remove(*tag);
            }
            DeltaNode::Excluded { tag, vr } => dataset.exclude(*tag, *vr),
        }
    }

    /// Element form of the marker
    pub fn to_tree(&self) -> TreeNode {
        let name = match self {
            DeltaNode::Value { .. } => names::VALUE,
            DeltaNode::Empty { .. } => names::EMPTY,
            DeltaNode::Excluded { .. } => names::EXCLUDED,
        };
        let mut node = TreeNode::new(name)
            .with_attribute(names::TAG, self.tag().hex())
            .with_attribute(names::VR, self.vr().code());

        if let DeltaNode::Value { payload, .. } = self {
            match payload {
                Payload::Text(text) if !text.is_empty() => node.text = Some(text.clone()),
                Payload::Text(_) => {}
                Payload::Items(items) => {
                    for item in items {
                        let mut item_node = TreeNode::new(names::ITEM);
                        for child in item {
                            item_node.push(child.to_tree());
                        }
                        node.push(item_node);
                    }
                }
            }
        }
        node
    }

    /// Parse a marker element found inside `parent`
    pub fn from_tree(node: &TreeNode, parent: &str) -> Result<Self, DecodeError> {
        let tag = Tag::parse(node.require(names::TAG)?)?;
        let vr: Vr = node.require(names::VR)?.parse()?;

        match node.name.as_str() {
            names::VALUE => {
                let payload = if vr.is_sequence() {
                    let items = node
                        .elements()
                        .map(|item| {
                            if item.name != names::ITEM {
                                return Err(DecodeError::UnexpectedElement {
                                    found: item.name.clone(),
                                    parent: node.name.clone(),
                                });
                            }
                            parse_nodes(item)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Payload::Items(items)
                } else {
                    Payload::Text(node.text.clone().unwrap_or_default())
                };
                Ok(DeltaNode::Value { tag, vr, payload })
            }
            names::EMPTY => Ok(DeltaNode::Empty { tag, vr }),
            names::EXCLUDED => Ok(DeltaNode::Excluded { tag, vr }),
            other => Err(DecodeError::UnexpectedElement {
                found: other.to_string(),
                parent: parent.to_string(),
            }),
        }
    }
}

/// Parse every marker child of an element. Markers must be in strictly
/// ascending tag order; deferred decoding relies on it.
pub fn parse_nodes(node: &TreeNode) -> Result<Vec<DeltaNode>, DecodeError> {
    let mut nodes: Vec<DeltaNode> = Vec::new();
    for child in node.elements() {
        let parsed = DeltaNode::from_tree(child, &node.name)?;
        if let Some(previous) = nodes.last() {
            if parsed.tag() <= previous.tag() {
                return Err(DecodeError::OutOfOrder {
                    element: node.name.clone(),
                    tag: parsed.tag().to_string(),
                    previous: previous.tag().to_string(),
                });
            }
        }
        nodes.push(parsed);
    }
    Ok(nodes)
}

/// Build a collection from a complete marker list with no base
pub fn decode_nodes(nodes: &[DeltaNode]) -> Dataset {
    let mut dataset = Dataset::new();
    for node in nodes {
        node.apply(&mut dataset);
    }
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tags;

    fn sequence_node() -> DeltaNode {
        DeltaNode::Value {
            tag: tags::SOURCE_IMAGE_SEQUENCE,
            vr: Vr::SQ,
            payload: Payload::Items(vec![vec![DeltaNode::Value {
                tag: tags::REFERENCED_SOP_INSTANCE_UID,
                vr: Vr::UI,
                payload: Payload::Text("1.2.3.4".into()),
            }]]),
        }
    }

    #[test]
    fn test_apply_markers() {
        let mut ds = Dataset::new();
        ds.exclude(tags::MODALITY, Vr::CS);

        DeltaNode::Value { tag: tags::MODALITY, vr: Vr::CS, payload: Payload::Text("MR".into()) }.apply(&mut ds);
        assert_eq!(ds.get_string(tags::MODALITY), Some("MR"));
        assert!(!ds.is_excluded(tags::MODALITY));

        DeltaNode::Excluded { tag: tags::IMAGE_COMMENTS, vr: Vr::LT }.apply(&mut ds);
        assert!(ds.is_excluded(tags::IMAGE_COMMENTS));
        assert!(ds.has(tags::IMAGE_COMMENTS));

        DeltaNode::Empty { tag: tags::IMAGE_COMMENTS, vr: Vr::LT }.apply(&mut ds);
        assert!(!ds.is_excluded(tags::IMAGE_COMMENTS));
        assert!(!ds.contains(tags::IMAGE_COMMENTS));
    }

    #[test]
    fn test_unparseable_value_is_left_empty() {
        let mut ds = Dataset::new();
        DeltaNode::Value { tag: tags::ROWS, vr: Vr::US, payload: Payload::Text("many".into()) }.apply(&mut ds);
        assert!(ds.has(tags::ROWS));
        assert!(!ds.contains(tags::ROWS));
    }

    #[test]
    fn test_sequence_items_decode() {
        let mut ds = Dataset::new();
        sequence_node().apply(&mut ds);
        let items = ds.get(tags::SOURCE_IMAGE_SEQUENCE).unwrap().value.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get_string(tags::REFERENCED_SOP_INSTANCE_UID), Some("1.2.3.4"));
    }

    #[test]
    fn test_tree_form_round_trip() {
        let nodes = vec![
            sequence_node(),
            DeltaNode::Empty { tag: tags::SERIES_DESCRIPTION, vr: Vr::LO },
            DeltaNode::Excluded { tag: tags::PIXEL_DATA, vr: Vr::OW },
        ];
        let mut parent = TreeNode::new(names::INSTANCE);
        for node in &nodes {
            parent.push(node.to_tree());
        }
        assert_eq!(parse_nodes(&parent).unwrap(), nodes);
    }

    #[test]
    fn test_markers_must_ascend() {
        let marker = |tag: &str| {
            TreeNode::new(names::EMPTY).with_attribute(names::TAG, tag).with_attribute(names::VR, "LO")
        };
        let mut descending = TreeNode::new(names::INSTANCE);
        descending.push(marker("0008103E"));
        descending.push(marker("00080060"));
        assert!(matches!(parse_nodes(&descending), Err(DecodeError::OutOfOrder { .. })));

        let mut repeated = TreeNode::new(names::INSTANCE);
        repeated.push(marker("00080060"));
        repeated.push(marker("$Modality"));
        assert!(matches!(parse_nodes(&repeated), Err(DecodeError::OutOfOrder { .. })));

        let mut ascending = TreeNode::new(names::INSTANCE);
        ascending.push(marker("00080060"));
        ascending.push(marker("0008103E"));
        assert_eq!(parse_nodes(&ascending).unwrap().len(), 2);
    }

    #[test]
    fn test_named_tags_and_structural_errors() {
        let node = TreeNode::new(names::VALUE)
            .with_attribute(names::TAG, "$Modality")
            .with_attribute(names::VR, "CS");
        assert_eq!(DeltaNode::from_tree(&node, names::INSTANCE).unwrap().tag(), tags::MODALITY);

        let missing_vr = TreeNode::new(names::EMPTY).with_attribute(names::TAG, "00080060");
        assert!(matches!(
            DeltaNode::from_tree(&missing_vr, names::INSTANCE),
            Err(DecodeError::MissingField { field: "VR", .. })
        ));

        let unknown = TreeNode::new(names::EMPTY)
            .with_attribute(names::TAG, "$NoSuchTag")
            .with_attribute(names::VR, "CS");
        assert!(matches!(
            DeltaNode::from_tree(&unknown, names::INSTANCE),
            Err(DecodeError::UnknownTagName(_))
        ));

        let stray = TreeNode::new("Comment")
            .with_attribute(names::TAG, "00080060")
            .with_attribute(names::VR, "CS");
        assert!(matches!(
            DeltaNode::from_tree(&stray, names::INSTANCE),
            Err(DecodeError::UnexpectedElement { .. })
        ));
    }
}
