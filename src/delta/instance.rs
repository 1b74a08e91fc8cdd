//! Instance records
//!
//! An instance either holds its collection outright (freshly added) or holds
//! a memento and the base profile it was written against (freshly loaded or
//! already serialized). In the second form keys are decoded on demand: every
//! access resolves the base profile and the markers up to the requested key
//! and no further. Resolution only ever moves forward.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::core::{DecodeError, Result};
use crate::delta::base::BaseProfile;
use crate::delta::diff::encode;
use crate::delta::node::{parse_nodes, DeltaNode};
use crate::delta::settings::OutputSettings;
use crate::format::{names, TreeNode};
use crate::types::{tags, Attribute, Dataset, Tag};

/// Explicit VR Little Endian, assumed when a memento names no encoding
pub const DEFAULT_TRANSFER_SYNTAX_UID: &str = "1.2.840.10008.1.2.1";

/// Provenance supplied alongside a freshly received instance
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    /// Encoding identifier; defaults to Explicit VR Little Endian
    pub transfer_syntax_uid: Option<String>,
    /// Application entity the instance came from
    pub source_ae_title: Option<String>,
    /// File the instance was read from
    pub source_file_name: Option<String>,
    /// Size of that file in bytes
    pub file_size: u64,
}

/// How far a deferred collection has been decoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing decoded yet
    Unresolved,
    /// Every key up to and including this one is final
    Partial(Tag),
    /// The whole collection is final
    Full,
}

/// Deferred decode state: the base profile and markers being merged, the
/// positions reached in each, and the collection built so far.
#[derive(Clone, Debug)]
struct Deferred {
    base: Option<Arc<BaseProfile>>,
    nodes: Arc<[DeltaNode]>,
    next_node: usize,
    resolution: Resolution,
    result: Dataset,
}

impl Deferred {
    fn new(base: Option<Arc<BaseProfile>>, nodes: Arc<[DeltaNode]>) -> Self {
        Self { base, nodes, next_node: 0, resolution: Resolution::Unresolved, result: Dataset::new() }
    }

    fn resolve_up_to(&mut self, target: Tag) {
        let after = match self.resolution {
            Resolution::Full => return,
            Resolution::Partial(done) if done >= target => return,
            Resolution::Partial(done) => Some(done),
            Resolution::Unresolved => None,
        };

        if let Some(base) = &self.base {
            let profile = base.dataset();
            for attribute in profile.range_after(after, target) {
                self.result.insert(attribute.clone());
                if profile.is_excluded(attribute.tag) {
                    self.result.exclusions_mut().add(attribute.tag);
                }
            }
        }

        while let Some(node) = self.nodes.get(self.next_node) {
            if node.tag() > target {
                break;
            }
            node.apply(&mut self.result);
            self.next_node += 1;
        }

        self.resolution = if target == Tag::MAX { Resolution::Full } else { Resolution::Partial(target) };
    }
}

#[derive(Clone, Debug)]
enum Content {
    Eager(Dataset),
    Deferred(Deferred),
}

/// Serialized markers together with the identity of the base they diff against
#[derive(Clone, Debug)]
struct Memento {
    base: Option<Arc<BaseProfile>>,
    nodes: Arc<[DeltaNode]>,
}

fn same_base(a: &Option<Arc<BaseProfile>>, b: &Option<Arc<BaseProfile>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Lexically normalise a rooted path; relative names are kept as given.
fn normalize_file_name(name: &str) -> String {
    let path = Path::new(name);
    if !path.has_root() {
        return name.to_string();
    }
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized.to_string_lossy().into_owned()
}

/// One instance of a series
#[derive(Clone, Debug)]
pub struct InstanceRecord {
    sop_instance_uid: String,
    sop_class_uid: Option<String>,
    transfer_syntax_uid: String,
    source_ae_title: Option<String>,
    source_file_name: Option<String>,
    file_size: u64,
    base: Option<Arc<BaseProfile>>,
    content: Content,
    memento: Option<Memento>,
}

impl InstanceRecord {
    /// Create an instance holding its collection directly.
    ///
    /// The SOP class is read from the collection when present.
    pub fn new(sop_instance_uid: impl Into<String>, dataset: Dataset, metadata: InstanceMetadata) -> Self {
        let sop_class_uid = dataset.get_string(tags::SOP_CLASS_UID).map(str::to_string);
        Self {
            sop_instance_uid: sop_instance_uid.into(),
            sop_class_uid,
            transfer_syntax_uid: metadata
                .transfer_syntax_uid
                .unwrap_or_else(|| DEFAULT_TRANSFER_SYNTAX_UID.to_string()),
            source_ae_title: metadata.source_ae_title,
            source_file_name: metadata.source_file_name.as_deref().map(normalize_file_name),
            file_size: metadata.file_size,
            base: None,
            content: Content::Eager(dataset),
            memento: None,
        }
    }

    /// Parse an `<Instance>` element written against `base`.
    ///
    /// All markers are checked structurally here; values are only converted
    /// when their keys are read.
    pub fn from_tree(node: &TreeNode, base: Option<Arc<BaseProfile>>) -> Result<Self> {
        let sop_instance_uid = node.require(names::UID)?.to_string();
        let nodes: Arc<[DeltaNode]> = parse_nodes(node)?.into();
        let file_size = node
            .attribute(names::FILE_SIZE)
            .and_then(|size| size.trim().parse().ok())
            .unwrap_or(0);

        Ok(Self {
            sop_instance_uid,
            sop_class_uid: node.attribute(names::SOP_CLASS_UID).map(str::to_string),
            transfer_syntax_uid: node
                .attribute(names::TRANSFER_SYNTAX_UID)
                .unwrap_or(DEFAULT_TRANSFER_SYNTAX_UID)
                .to_string(),
            source_ae_title: node.attribute(names::SOURCE_AE_TITLE).map(str::to_string),
            source_file_name: node.attribute(names::SOURCE_FILE_NAME).map(str::to_string),
            file_size,
            base: base.clone(),
            content: Content::Deferred(Deferred::new(base.clone(), nodes.clone())),
            memento: Some(Memento { base, nodes }),
        })
    }

    /// Instance key
    pub fn sop_instance_uid(&self) -> &str {
        &self.sop_instance_uid
    }

    /// Value-representation class identifier. When the instance node did not
    /// carry one it is read from the collection's SOP Class UID.
    pub fn sop_class_uid(&mut self) -> Option<&str> {
        if self.sop_class_uid.is_none() {
            self.sop_class_uid = self
                .resolved(tags::SOP_CLASS_UID)
                .get_string(tags::SOP_CLASS_UID)
                .map(str::to_string);
        }
        self.sop_class_uid.as_deref()
    }

    /// Encoding identifier
    pub fn transfer_syntax_uid(&self) -> &str {
        &self.transfer_syntax_uid
    }

    /// Source application entity
    pub fn source_ae_title(&self) -> Option<&str> {
        self.source_ae_title.as_deref()
    }

    /// Source file name
    pub fn source_file_name(&self) -> Option<&str> {
        self.source_file_name.as_deref()
    }

    /// Recorded size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// How far the collection has been decoded; `Full` for eager instances
    pub fn resolution(&self) -> Resolution {
        match &self.content {
            Content::Eager(_) => Resolution::Full,
            Content::Deferred(deferred) => deferred.resolution,
        }
    }

    /// Check whether the instance currently holds serialized markers
    pub fn is_deferred(&self) -> bool {
        matches!(self.content, Content::Deferred(_))
    }

    /// Decode everything up to and including `tag`
    pub fn resolve_up_to(&mut self, tag: Tag) {
        if let Content::Deferred(deferred) = &mut self.content {
            deferred.resolve_up_to(tag);
        }
    }

    fn resolved(&mut self, tag: Tag) -> &mut Dataset {
        match &mut self.content {
            Content::Eager(dataset) => dataset,
            Content::Deferred(deferred) => {
                deferred.resolve_up_to(tag);
                &mut deferred.result
            }
        }
    }

    /// Get an attribute, decoding up to its key first
    pub fn get(&mut self, tag: Tag) -> Option<&Attribute> {
        self.resolved(tag).get(tag)
    }

    /// First string value of an attribute
    pub fn get_string(&mut self, tag: Tag) -> Option<&str> {
        self.resolved(tag).get_string(tag)
    }

    /// Check for a non-empty value
    pub fn contains(&mut self, tag: Tag) -> bool {
        self.resolved(tag).contains(tag)
    }

    /// Check whether the key's value was deliberately not recorded
    pub fn is_excluded(&mut self, tag: Tag) -> bool {
        self.resolved(tag).is_excluded(tag)
    }

    /// Whole collection, fully decoded
    pub fn collection(&mut self) -> &Dataset {
        self.resolved(Tag::MAX)
    }

    /// Whole collection for modification. Invalidates the serialized form.
    pub fn collection_mut(&mut self) -> &mut Dataset {
        self.memento = None;
        self.resolved(Tag::MAX)
    }

    /// Excluded keys, ascending
    pub fn excluded_tags(&mut self) -> Vec<Tag> {
        self.resolved(Tag::MAX).excluded_tags()
    }

    /// Base profile this instance is written against
    pub fn base(&self) -> Option<&Arc<BaseProfile>> {
        self.base.as_ref()
    }

    /// Install the base profile for the next serialization. A different
    /// profile makes any cached serialized form stale.
    pub fn set_base(&mut self, base: Option<Arc<BaseProfile>>) {
        self.base = base;
    }

    /// Drop the cached serialized form so the next one is rebuilt under the
    /// settings then in effect.
    pub fn invalidate(&mut self) {
        self.memento = None;
    }

    /// Serialized markers against the installed base profile.
    ///
    /// Reuses the cached form when it was built against the same profile.
    /// Otherwise the collection is fully decoded, diffed, and, when a profile
    /// is installed, released in favour of a deferred view over the new
    /// markers.
    pub fn memento(&mut self, settings: &OutputSettings) -> Arc<[DeltaNode]> {
        if let Some(memento) = &self.memento {
            if same_base(&memento.base, &self.base) {
                debug!(uid = %self.sop_instance_uid, "Reusing cached instance memento");
                return memento.nodes.clone();
            }
        }

        let base = self.base.clone();
        let dataset = self.resolved(Tag::MAX);
        let nodes: Arc<[DeltaNode]> = encode(dataset, base.as_deref().map(BaseProfile::dataset), settings).into();

        if base.is_some() {
            self.content = Content::Deferred(Deferred::new(base.clone(), nodes.clone()));
        }
        self.memento = Some(Memento { base, nodes: nodes.clone() });
        nodes
    }

    /// Element form of the instance
    pub fn to_tree(&mut self, settings: &OutputSettings) -> TreeNode {
        let nodes = self.memento(settings);

        let mut node = TreeNode::new(names::INSTANCE).with_attribute(names::UID, self.sop_instance_uid.as_str());
        if let Some(sop_class) = &self.sop_class_uid {
            node.set_attribute(names::SOP_CLASS_UID, sop_class.as_str());
        }
        node.set_attribute(names::TRANSFER_SYNTAX_UID, self.transfer_syntax_uid.as_str());
        if let Some(ae_title) = &self.source_ae_title {
            node.set_attribute(names::SOURCE_AE_TITLE, ae_title.as_str());
        }
        if let (Some(file_name), true) = (&self.source_file_name, settings.include_source_file_name) {
            node.set_attribute(names::SOURCE_FILE_NAME, file_name.as_str());
        }
        if self.file_size != 0 {
            node.set_attribute(names::FILE_SIZE, self.file_size.to_string());
        }

        for child in nodes.iter() {
            node.push(child.to_tree());
        }
        node
    }

    /// SOP instance UIDs this instance was derived from, per its Source Image
    /// Sequence.
    pub fn source_image_references(&mut self) -> Vec<String> {
        let Some(attribute) = self.get(tags::SOURCE_IMAGE_SEQUENCE) else {
            return Vec::new();
        };
        attribute
            .value
            .items()
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.get_string(tags::REFERENCED_SOP_INSTANCE_UID))
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Check that an element is an instance node before parsing it
pub fn expect_instance(node: &TreeNode, parent: &str) -> std::result::Result<(), DecodeError> {
    if node.name == names::INSTANCE {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedElement { found: node.name.clone(), parent: parent.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::node::Payload;
    use crate::types::{Value, Vr};

    fn sample(description: &str) -> Dataset {
        let mut ds = Dataset::new();
        ds.set(tags::SOP_CLASS_UID, Vr::UI, "1.2.840.10008.5.1.4.1.1.4");
        ds.set(tags::SOP_INSTANCE_UID, Vr::UI, format!("1.2.3.{}", description.len()));
        ds.set(tags::MODALITY, Vr::CS, "MR");
        ds.set(tags::SERIES_DESCRIPTION, Vr::LO, description);
        ds.set(tags::PATIENTS_NAME, Vr::PN, "Doe^Jane");
        ds.set(tags::ROWS, Vr::US, Value::Unsigned(vec![256]));
        ds
    }

    fn profile() -> Arc<BaseProfile> {
        Arc::new(BaseProfile::build(&sample("Brain"), &sample("Spine"), &OutputSettings::default()))
    }

    fn loaded(description: &str, base: &Arc<BaseProfile>) -> InstanceRecord {
        let mut eager = InstanceRecord::new("1.2.3", sample(description), InstanceMetadata::default());
        eager.set_base(Some(base.clone()));
        let tree = eager.to_tree(&OutputSettings::default());
        InstanceRecord::from_tree(&tree, Some(base.clone())).unwrap()
    }

    #[test]
    fn test_only_differences_are_written() {
        let base = profile();
        let mut record = InstanceRecord::new("1.2.3", sample("Brain"), InstanceMetadata::default());
        record.set_base(Some(base));
        let nodes = record.memento(&OutputSettings::default());
        assert_eq!(
            nodes.as_ref(),
            &[DeltaNode::Value {
                tag: tags::SERIES_DESCRIPTION,
                vr: Vr::LO,
                payload: Payload::Text("Brain".into())
            }]
        );
        assert!(record.is_deferred());
        assert_eq!(record.collection(), &sample("Brain"));
    }

    #[test]
    fn test_resolution_is_incremental_and_monotonic() {
        let base = profile();
        let mut record = loaded("Brain", &base);
        assert_eq!(record.resolution(), Resolution::Unresolved);

        assert_eq!(record.get_string(tags::MODALITY), Some("MR"));
        assert_eq!(record.resolution(), Resolution::Partial(tags::MODALITY));

        assert_eq!(record.get_string(tags::SERIES_DESCRIPTION), Some("Brain"));
        record.resolve_up_to(tags::MODALITY);
        assert!(matches!(record.resolution(), Resolution::Partial(t) if t >= tags::SERIES_DESCRIPTION));

        assert_eq!(record.collection(), &sample("Brain"));
        assert_eq!(record.resolution(), Resolution::Full);
    }

    #[test]
    fn test_unresolved_keys_are_not_decoded() {
        let base = profile();
        let mut record = loaded("Brain", &base);
        record.resolve_up_to(tags::MODALITY);
        if let Content::Deferred(deferred) = &record.content {
            assert!(!deferred.result.has(tags::SERIES_DESCRIPTION));
            assert!(!deferred.result.has(tags::PATIENTS_NAME));
        } else {
            panic!("expected deferred content");
        }
    }

    #[test]
    fn test_reserialization_reuses_cache() {
        let base = profile();
        let mut record = loaded("Spine", &base);
        let first = record.memento(&OutputSettings::default());
        let second = record.memento(&OutputSettings::include_all());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(record.resolution(), Resolution::Unresolved);
    }

    #[test]
    fn test_new_base_invalidates_cache() {
        let base = profile();
        let mut record = loaded("Spine", &base);
        let cached = record.memento(&OutputSettings::default());

        record.set_base(None);
        let full = record.memento(&OutputSettings::default());
        assert!(!Arc::ptr_eq(&cached, &full));
        assert!(full.len() > cached.len());
        assert!(!record.is_deferred() || record.resolution() == Resolution::Full);
        assert_eq!(record.collection(), &sample("Spine"));
    }

    #[test]
    fn test_metadata_attributes() {
        let metadata = InstanceMetadata {
            transfer_syntax_uid: None,
            source_ae_title: Some("SCANNER<1>".into()),
            source_file_name: Some("/data/in/../study/./img1.dcm".into()),
            file_size: 4096,
        };
        let mut record = InstanceRecord::new("1.2.3", sample("Brain"), metadata);
        assert_eq!(record.source_file_name(), Some("/data/study/img1.dcm"));

        let tree = record.to_tree(&OutputSettings::default());
        assert_eq!(tree.attribute("SopClassUID"), Some("1.2.840.10008.5.1.4.1.1.4"));
        assert_eq!(tree.attribute("TransferSyntaxUID"), Some(DEFAULT_TRANSFER_SYNTAX_UID));
        assert_eq!(tree.attribute("SourceAETitle"), Some("SCANNER<1>"));
        assert_eq!(tree.attribute("FileSize"), Some("4096"));

        record.invalidate();
        let settings = OutputSettings { include_source_file_name: false, ..OutputSettings::default() };
        assert!(record.to_tree(&settings).attribute("SourceFileName").is_none());

        let parsed = InstanceRecord::from_tree(&tree, None).unwrap();
        assert_eq!(parsed.file_size(), 4096);
        assert_eq!(parsed.source_ae_title(), Some("SCANNER<1>"));
    }

    #[test]
    fn test_malformed_file_size_is_ignored() {
        let node = TreeNode::new("Instance").with_attribute("UID", "9").with_attribute("FileSize", "big");
        let record = InstanceRecord::from_tree(&node, None).unwrap();
        assert_eq!(record.file_size(), 0);
        assert_eq!(record.transfer_syntax_uid(), DEFAULT_TRANSFER_SYNTAX_UID);
    }

    #[test]
    fn test_sop_class_falls_back_to_the_collection() {
        let mut eager = InstanceRecord::new("1.2.3", sample("Brain"), InstanceMetadata::default());
        let mut tree = eager.to_tree(&OutputSettings::default());
        tree.attributes.retain(|(key, _)| key != "SopClassUID");

        let mut record = InstanceRecord::from_tree(&tree, None).unwrap();
        assert_eq!(record.resolution(), Resolution::Unresolved);
        assert_eq!(record.sop_class_uid(), Some("1.2.840.10008.5.1.4.1.1.4"));
        assert_eq!(record.resolution(), Resolution::Partial(tags::SOP_CLASS_UID));
    }

    #[test]
    fn test_missing_uid_is_structural() {
        let err = InstanceRecord::from_tree(&TreeNode::new("Instance"), None).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_source_image_references() {
        let mut item = Dataset::new();
        item.set(tags::REFERENCED_SOP_INSTANCE_UID, Vr::UI, "1.2.3.99");
        let mut ds = sample("Brain");
        ds.set(tags::SOURCE_IMAGE_SEQUENCE, Vr::SQ, vec![item]);

        let mut record = InstanceRecord::new("1.2.3", ds, InstanceMetadata::default());
        assert_eq!(record.source_image_references(), vec!["1.2.3.99".to_string()]);
    }
}
