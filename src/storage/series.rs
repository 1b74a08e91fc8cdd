//! Series record - instances sharing one base profile
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::core::Result;
use crate::delta::instance::expect_instance;
use crate::delta::{BaseProfile, InstanceRecord, OutputSettings};
use crate::format::{names, TreeNode};

/// Series Record - keyed set of instances plus the base profile they diff against
///
/// Instances are kept in insertion order. The base profile is built from the
/// two earliest-inserted instances, so emission is deterministic for a given
/// sequence of additions.
#[derive(Debug)]
pub struct SeriesRecord {
    /// Series instance UID
    series_instance_uid: String,
    /// Instances by SOP instance UID, insertion ordered
    instances: IndexMap<String, InstanceRecord>,
    /// Base profile, built lazily on emission
    base: Option<Arc<BaseProfile>>,
    /// Source reference UID -> SOP instance UID
    source_index: HashMap<String, String>,
    /// Source index must be rebuilt before the next lookup
    index_dirty: bool,
}

impl SeriesRecord {
    /// Create an empty series
    pub fn new(series_instance_uid: impl Into<String>) -> Self {
        Self {
            series_instance_uid: series_instance_uid.into(),
            instances: IndexMap::new(),
            base: None,
            source_index: HashMap::new(),
            index_dirty: true,
        }
    }

    /// Get the series instance UID
    pub fn series_instance_uid(&self) -> &str {
        &self.series_instance_uid
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if the series has no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Check if an instance exists
    pub fn contains(&self, sop_instance_uid: &str) -> bool {
        self.instances.contains_key(sop_instance_uid)
    }

    /// Get an instance
    pub fn get(&self, sop_instance_uid: &str) -> Option<&InstanceRecord> {
        self.instances.get(sop_instance_uid)
    }

    /// Get an instance for reading its attributes
    pub fn get_mut(&mut self, sop_instance_uid: &str) -> Option<&mut InstanceRecord> {
        self.instances.get_mut(sop_instance_uid)
    }

    /// Instances in insertion order
    pub fn instances(&self) -> impl Iterator<Item = &InstanceRecord> + '_ {
        self.instances.values()
    }

    /// Instances in insertion order, for reading their attributes
    pub fn instances_mut(&mut self) -> impl Iterator<Item = &mut InstanceRecord> + '_ {
        self.instances.values_mut()
    }

    /// Current base profile, if one has been built or loaded
    pub fn base_profile(&self) -> Option<&Arc<BaseProfile>> {
        self.base.as_ref()
    }

    /// Insert an instance, replacing one with the same UID in place.
    /// Forces the base profile to be rebuilt on the next emission.
    pub fn insert(&mut self, instance: InstanceRecord) {
        self.instances.insert(instance.sop_instance_uid().to_string(), instance);
        self.mark_dirty();
    }

    /// Remove an instance. Returns false when it was not present.
    pub fn remove(&mut self, sop_instance_uid: &str) -> bool {
        let removed = self.instances.shift_remove(sop_instance_uid).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }

    fn mark_dirty(&mut self) {
        self.base = None;
        self.index_dirty = true;
    }

    /// Build the base profile from the two earliest-inserted instances.
    ///
    /// No-op when a profile already exists or there are fewer than two
    /// instances; a single instance is always written in full.
    pub fn compute_base_profile(&mut self, settings: &OutputSettings) {
        if self.base.is_some() || self.instances.len() < 2 {
            return;
        }
        let mut candidates = self.instances.values_mut();
        if let (Some(first), Some(second)) = (candidates.next(), candidates.next()) {
            let profile = BaseProfile::build(first.collection(), second.collection(), settings);
            debug!(
                series = %self.series_instance_uid,
                first = first.sop_instance_uid(),
                second = second.sop_instance_uid(),
                "Computed base profile"
            );
            self.base = Some(Arc::new(profile));
        }
    }

    /// Write the series: its base profile, if any, then every instance diffed
    /// against it. In compact mode instance nodes are pre-rendered fragments.
    pub fn emit(&mut self, settings: &OutputSettings) -> Result<TreeNode> {
        self.compute_base_profile(settings);

        let mut node = TreeNode::new(names::SERIES).with_attribute(names::UID, self.series_instance_uid.as_str());
        if let Some(base) = &self.base {
            node.push(base.to_tree());
        }

        for instance in self.instances.values_mut() {
            instance.set_base(self.base.clone());
            let child = instance.to_tree(settings);
            if settings.compact {
                node.push_fragment(child.render()?);
            } else {
                node.push(child);
            }
        }
        Ok(node)
    }

    /// Read a `<Series>` element. Every instance shares the loaded base
    /// profile and decodes lazily.
    pub fn ingest(node: &TreeNode) -> Result<Self> {
        let mut series = SeriesRecord::new(node.require(names::UID)?);

        let base = node
            .elements()
            .find(|child| child.name == names::BASE_INSTANCE)
            .map(BaseProfile::from_tree)
            .transpose()?
            .map(Arc::new);

        for child in node.elements().filter(|child| child.name != names::BASE_INSTANCE) {
            expect_instance(child, &node.name)?;
            let instance = InstanceRecord::from_tree(child, base.clone())?;
            series.instances.insert(instance.sop_instance_uid().to_string(), instance);
        }

        series.base = base;
        Ok(series)
    }

    /// Find the instance derived from `sop_instance_uid` according to its
    /// Source Image Sequence.
    pub fn find_by_source_reference(&mut self, sop_instance_uid: &str) -> Option<&mut InstanceRecord> {
        if self.index_dirty {
            self.rebuild_source_index();
        }
        let owner = self.source_index.get(sop_instance_uid)?;
        self.instances.get_mut(owner)
    }

    fn rebuild_source_index(&mut self) {
        self.source_index.clear();
        for (uid, instance) in self.instances.iter_mut() {
            for reference in instance.source_image_references() {
                self.source_index.entry(reference).or_insert_with(|| uid.clone());
            }
        }
        self.index_dirty = false;
        debug!(series = %self.series_instance_uid, entries = self.source_index.len(), "Rebuilt source index");
    }

    /// Drop cached instance mementos so the next emission applies new settings
    pub fn invalidate_mementos(&mut self) {
        for instance in self.instances.values_mut() {
            instance.invalidate();
        }
    }

    /// Sum of the recorded instance sizes
    pub fn size(&self) -> u64 {
        self.instances.values().map(InstanceRecord::file_size).sum()
    }
}
