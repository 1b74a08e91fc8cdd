//! Study record - the root of the memento hierarchy
use std::io::{Read, Write};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::core::{DecodeError, Error, Result};
use crate::delta::{InstanceMetadata, InstanceRecord, OutputSettings, TagInclusion};
use crate::format::{names, read_memento, write_memento, Compression, TreeNode};
use crate::storage::SeriesRecord;
use crate::types::{tags, Dataset, Tag};

/// Study Record - keyed set of series plus study-level aggregates
///
/// A default record has no study UID yet and takes it from the first
/// instance added.
#[derive(Debug, Default)]
pub struct StudyRecord {
    /// Study instance UID
    study_instance_uid: String,
    /// Series by series instance UID, insertion ordered
    series: IndexMap<String, SeriesRecord>,
}

impl StudyRecord {
    /// Create an empty study
    pub fn new(study_instance_uid: impl Into<String>) -> Self {
        Self { study_instance_uid: study_instance_uid.into(), series: IndexMap::new() }
    }

    /// Get the study instance UID
    pub fn study_instance_uid(&self) -> &str {
        &self.study_instance_uid
    }

    /// Add a freshly received instance.
    ///
    /// The collection is copied without pixel data, and without private or
    /// unknown-representation values when the settings drop them. The study,
    /// series and SOP instance UIDs are read from the collection. An instance
    /// of another study is rejected and leaves the study unchanged; an
    /// instance already present is replaced.
    ///
    /// # Arguments
    ///
    /// * `dataset` - the instance's attributes
    /// * `metadata` - provenance recorded alongside
    /// * `settings` - output settings the study will be written with
    ///
    /// # Returns
    ///
    /// * `Ok(())` - the instance was stored
    /// * `Err(Error::StudyMismatch)` - the instance belongs to another study
    /// * `Err(Error::InvalidInput)` - a required UID is missing
    pub fn add_instance(&mut self, dataset: &Dataset, metadata: InstanceMetadata, settings: &OutputSettings) -> Result<()> {
        let study_uid = required_uid(dataset, tags::STUDY_INSTANCE_UID, "study instance UID")?;
        let series_uid = required_uid(dataset, tags::SERIES_INSTANCE_UID, "series instance UID")?.to_string();
        let sop_uid = required_uid(dataset, tags::SOP_INSTANCE_UID, "SOP instance UID")?.to_string();

        if self.study_instance_uid.is_empty() {
            self.study_instance_uid = study_uid.to_string();
        } else if study_uid != self.study_instance_uid {
            warn!(expected = %self.study_instance_uid, actual = %study_uid, "Rejecting instance from another study");
            return Err(Error::StudyMismatch {
                expected: self.study_instance_uid.clone(),
                actual: study_uid.to_string(),
            });
        }

        let copy = dataset.copy_filtered(
            settings.include_private != TagInclusion::Drop,
            settings.include_unknown != TagInclusion::Drop,
            &[tags::PIXEL_DATA],
        );

        debug!(series = %series_uid, sop = %sop_uid, attributes = copy.len(), "Adding instance");
        self.get_or_create_series(&series_uid)
            .insert(InstanceRecord::new(sop_uid, copy, metadata));
        Ok(())
    }

    fn get_or_create_series(&mut self, series_instance_uid: &str) -> &mut SeriesRecord {
        self.series
            .entry(series_instance_uid.to_string())
            .or_insert_with(|| SeriesRecord::new(series_instance_uid))
    }

    /// Remove an instance. Returns false when the series or instance is absent.
    pub fn remove_instance(&mut self, series_instance_uid: &str, sop_instance_uid: &str) -> bool {
        self.series
            .get_mut(series_instance_uid)
            .is_some_and(|series| series.remove(sop_instance_uid))
    }

    /// Remove the instance a collection describes, locating it by the study,
    /// series and SOP instance UIDs it carries. Returns false when the
    /// collection belongs to another study, lacks one of the UIDs, or names
    /// an instance that is not present.
    pub fn remove_dataset(&mut self, dataset: &Dataset) -> bool {
        let uids = (
            required_uid(dataset, tags::STUDY_INSTANCE_UID, "study instance UID"),
            required_uid(dataset, tags::SERIES_INSTANCE_UID, "series instance UID"),
            required_uid(dataset, tags::SOP_INSTANCE_UID, "SOP instance UID"),
        );
        let (Ok(study_uid), Ok(series_uid), Ok(sop_uid)) = uids else {
            return false;
        };
        if study_uid != self.study_instance_uid {
            debug!(expected = %self.study_instance_uid, actual = %study_uid, "Not removing instance from another study");
            return false;
        }
        self.remove_instance(series_uid, sop_uid)
    }

    /// Remove a series. Removing a series that is not there succeeds.
    pub fn remove_series(&mut self, series_instance_uid: &str) -> bool {
        self.series.shift_remove(series_instance_uid);
        true
    }

    /// Get a series
    pub fn series(&self, series_instance_uid: &str) -> Option<&SeriesRecord> {
        self.series.get(series_instance_uid)
    }

    /// Get a series for reading its instances
    pub fn series_mut(&mut self, series_instance_uid: &str) -> Option<&mut SeriesRecord> {
        self.series.get_mut(series_instance_uid)
    }

    /// All series in insertion order
    pub fn iter_series(&self) -> impl Iterator<Item = &SeriesRecord> + '_ {
        self.series.values()
    }

    /// All series in insertion order, for reading their instances
    pub fn iter_series_mut(&mut self) -> impl Iterator<Item = &mut SeriesRecord> + '_ {
        self.series.values_mut()
    }

    /// Check if a series exists
    pub fn contains_series(&self, series_instance_uid: &str) -> bool {
        self.series.contains_key(series_instance_uid)
    }

    /// Check if an instance exists
    pub fn contains_instance(&self, series_instance_uid: &str, sop_instance_uid: &str) -> bool {
        self.series(series_instance_uid)
            .is_some_and(|series| series.contains(sop_instance_uid))
    }

    /// Find an instance for reading its attributes
    pub fn find_instance(&mut self, series_instance_uid: &str, sop_instance_uid: &str) -> Option<&mut InstanceRecord> {
        self.series.get_mut(series_instance_uid)?.get_mut(sop_instance_uid)
    }

    /// Number of series
    pub fn number_of_series(&self) -> usize {
        self.series.len()
    }

    /// Number of instances across all series
    pub fn number_of_instances(&self) -> usize {
        self.series.values().map(SeriesRecord::len).sum()
    }

    /// Sum of all recorded instance sizes
    pub fn study_size(&self) -> u64 {
        self.series.values().map(SeriesRecord::size).sum()
    }

    /// Patient name from the first instance that has one
    pub fn patient_name(&mut self) -> Option<String> {
        self.first_value(tags::PATIENTS_NAME)
    }

    /// Patient ID from the first instance that has one
    pub fn patient_id(&mut self) -> Option<String> {
        self.first_value(tags::PATIENT_ID)
    }

    fn first_value(&mut self, tag: Tag) -> Option<String> {
        self.series
            .values_mut()
            .flat_map(|series| series.instances_mut())
            .find_map(|instance| instance.get_string(tag).map(str::to_string))
    }

    /// Drop every cached instance memento so the next emission applies new
    /// settings to values already held.
    pub fn invalidate_mementos(&mut self) {
        for series in self.series.values_mut() {
            series.invalidate_mementos();
        }
    }

    /// Write the study memento tree
    pub fn emit(&mut self, settings: &OutputSettings) -> Result<TreeNode> {
        let mut study = TreeNode::new(names::STUDY).with_attribute(names::UID, self.study_instance_uid.as_str());
        for series in self.series.values_mut() {
            study.push(series.emit(settings)?);
        }
        let mut root = TreeNode::new(names::ROOT);
        root.push(study);
        Ok(root)
    }

    /// Read a study memento tree. Instances decode lazily on access.
    pub fn ingest(root: &TreeNode) -> Result<Self> {
        if root.name != names::ROOT {
            return Err(DecodeError::MissingRoot(names::ROOT).into());
        }
        let study_node = root
            .elements()
            .find(|child| child.name == names::STUDY)
            .ok_or(DecodeError::MissingRoot(names::STUDY))?;

        let mut study = StudyRecord::new(study_node.require(names::UID)?);
        for child in study_node.elements() {
            if child.name != names::SERIES {
                return Err(DecodeError::UnexpectedElement {
                    found: child.name.clone(),
                    parent: study_node.name.clone(),
                }
                .into());
            }
            let series = SeriesRecord::ingest(child)?;
            study.series.insert(series.series_instance_uid().to_string(), series);
        }

        info!(
            study = %study.study_instance_uid,
            series = study.number_of_series(),
            instances = study.number_of_instances(),
            "Loaded study memento"
        );
        Ok(study)
    }

    /// Emit and write the memento to a sink
    pub fn write_to<W: Write>(&mut self, sink: W, settings: &OutputSettings, compression: Compression) -> Result<()> {
        let root = self.emit(settings)?;
        write_memento(&root, sink, compression)
    }

    /// Read and ingest a memento from a source
    pub fn read_from<R: Read>(source: R, compression: Compression) -> Result<Self> {
        Self::ingest(&read_memento(source, compression)?)
    }
}

fn required_uid<'a>(dataset: &'a Dataset, tag: Tag, what: &str) -> Result<&'a str> {
    dataset
        .get_string(tag)
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| Error::invalid_input(format!("instance has no {}", what)))
}
