//! Built-in tag dictionary
//!
//! Only the standard tags the codec and its callers refer to by name. Tags
//! outside the table are still carried; they just cannot be written as `$Name`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::types::{Tag, Vr};

/// One dictionary row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagEntry {
    /// Attribute key
    pub tag: Tag,
    /// Keyword, used in `$Name` references
    pub name: &'static str,
    /// Default value representation
    pub vr: Vr,
}

/// Well-known tag constants
#[allow(missing_docs)]
pub mod tags {
    use crate::types::Tag;

    pub const SPECIFIC_CHARACTER_SET: Tag = Tag::new(0x0008_0005);
    pub const IMAGE_TYPE: Tag = Tag::new(0x0008_0008);
    pub const INSTANCE_CREATION_DATE: Tag = Tag::new(0x0008_0012);
    pub const INSTANCE_CREATION_TIME: Tag = Tag::new(0x0008_0013);
    pub const SOP_CLASS_UID: Tag = Tag::new(0x0008_0016);
    pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008_0018);
    pub const STUDY_DATE: Tag = Tag::new(0x0008_0020);
    pub const SERIES_DATE: Tag = Tag::new(0x0008_0021);
    pub const STUDY_TIME: Tag = Tag::new(0x0008_0030);
    pub const SERIES_TIME: Tag = Tag::new(0x0008_0031);
    pub const ACCESSION_NUMBER: Tag = Tag::new(0x0008_0050);
    pub const MODALITY: Tag = Tag::new(0x0008_0060);
    pub const MANUFACTURER: Tag = Tag::new(0x0008_0070);
    pub const INSTITUTION_NAME: Tag = Tag::new(0x0008_0080);
    pub const REFERRING_PHYSICIANS_NAME: Tag = Tag::new(0x0008_0090);
    pub const STUDY_DESCRIPTION: Tag = Tag::new(0x0008_1030);
    pub const SERIES_DESCRIPTION: Tag = Tag::new(0x0008_103E);
    pub const MANUFACTURERS_MODEL_NAME: Tag = Tag::new(0x0008_1090);
    pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag::new(0x0008_1155);
    pub const SOURCE_IMAGE_SEQUENCE: Tag = Tag::new(0x0008_2112);
    pub const PATIENTS_NAME: Tag = Tag::new(0x0010_0010);
    pub const PATIENT_ID: Tag = Tag::new(0x0010_0020);
    pub const PATIENTS_BIRTH_DATE: Tag = Tag::new(0x0010_0030);
    pub const PATIENTS_SEX: Tag = Tag::new(0x0010_0040);
    pub const SLICE_THICKNESS: Tag = Tag::new(0x0018_0050);
    pub const STUDY_INSTANCE_UID: Tag = Tag::new(0x0020_000D);
    pub const SERIES_INSTANCE_UID: Tag = Tag::new(0x0020_000E);
    pub const STUDY_ID: Tag = Tag::new(0x0020_0010);
    pub const SERIES_NUMBER: Tag = Tag::new(0x0020_0011);
    pub const INSTANCE_NUMBER: Tag = Tag::new(0x0020_0013);
    pub const IMAGE_POSITION_PATIENT: Tag = Tag::new(0x0020_0032);
    pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag::new(0x0020_0037);
    pub const IMAGE_COMMENTS: Tag = Tag::new(0x0020_4000);
    pub const SAMPLES_PER_PIXEL: Tag = Tag::new(0x0028_0002);
    pub const ROWS: Tag = Tag::new(0x0028_0010);
    pub const COLUMNS: Tag = Tag::new(0x0028_0011);
    pub const PIXEL_SPACING: Tag = Tag::new(0x0028_0030);
    pub const BITS_ALLOCATED: Tag = Tag::new(0x0028_0100);
    pub const RED_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag::new(0x0028_1201);
    pub const GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag::new(0x0028_1202);
    pub const BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag::new(0x0028_1203);
    pub const SPECTROSCOPY_DATA: Tag = Tag::new(0x5600_0020);
    pub const FLOAT_PIXEL_DATA: Tag = Tag::new(0x7FE0_0008);
    pub const DOUBLE_FLOAT_PIXEL_DATA: Tag = Tag::new(0x7FE0_0009);
    pub const PIXEL_DATA: Tag = Tag::new(0x7FE0_0010);
}

macro_rules! entry {
    ($tag:expr, $name:literal, $vr:ident) => {
        TagEntry { tag: $tag, name: $name, vr: Vr::$vr }
    };
}

static ENTRIES: &[TagEntry] = &[
    entry!(tags::SPECIFIC_CHARACTER_SET, "SpecificCharacterSet", CS),
    entry!(tags::IMAGE_TYPE, "ImageType", CS),
    entry!(tags::INSTANCE_CREATION_DATE, "InstanceCreationDate", DA),
    entry!(tags::INSTANCE_CREATION_TIME, "InstanceCreationTime", TM),
    entry!(tags::SOP_CLASS_UID, "SopClassUid", UI),
    entry!(tags::SOP_INSTANCE_UID, "SopInstanceUid", UI),
    entry!(tags::STUDY_DATE, "StudyDate", DA),
    entry!(tags::SERIES_DATE, "SeriesDate", DA),
    entry!(tags::STUDY_TIME, "StudyTime", TM),
    entry!(tags::SERIES_TIME, "SeriesTime", TM),
    entry!(tags::ACCESSION_NUMBER, "AccessionNumber", SH),
    entry!(tags::MODALITY, "Modality", CS),
    entry!(tags::MANUFACTURER, "Manufacturer", LO),
    entry!(tags::INSTITUTION_NAME, "InstitutionName", LO),
    entry!(tags::REFERRING_PHYSICIANS_NAME, "ReferringPhysiciansName", PN),
    entry!(tags::STUDY_DESCRIPTION, "StudyDescription", LO),
    entry!(tags::SERIES_DESCRIPTION, "SeriesDescription", LO),
    entry!(tags::MANUFACTURERS_MODEL_NAME, "ManufacturersModelName", LO),
    entry!(tags::REFERENCED_SOP_INSTANCE_UID, "ReferencedSopInstanceUid", UI),
    entry!(tags::SOURCE_IMAGE_SEQUENCE, "SourceImageSequence", SQ),
    entry!(tags::PATIENTS_NAME, "PatientsName", PN),
    entry!(tags::PATIENT_ID, "PatientId", LO),
    entry!(tags::PATIENTS_BIRTH_DATE, "PatientsBirthDate", DA),
    entry!(tags::PATIENTS_SEX, "PatientsSex", CS),
    entry!(tags::SLICE_THICKNESS, "SliceThickness", DS),
    entry!(tags::STUDY_INSTANCE_UID, "StudyInstanceUid", UI),
    entry!(tags::SERIES_INSTANCE_UID, "SeriesInstanceUid", UI),
    entry!(tags::STUDY_ID, "StudyId", SH),
    entry!(tags::SERIES_NUMBER, "SeriesNumber", IS),
    entry!(tags::INSTANCE_NUMBER, "InstanceNumber", IS),
    entry!(tags::IMAGE_POSITION_PATIENT, "ImagePositionPatient", DS),
    entry!(tags::IMAGE_ORIENTATION_PATIENT, "ImageOrientationPatient", DS),
    entry!(tags::IMAGE_COMMENTS, "ImageComments", LT),
    entry!(tags::SAMPLES_PER_PIXEL, "SamplesPerPixel", US),
    entry!(tags::ROWS, "Rows", US),
    entry!(tags::COLUMNS, "Columns", US),
    entry!(tags::PIXEL_SPACING, "PixelSpacing", DS),
    entry!(tags::BITS_ALLOCATED, "BitsAllocated", US),
    entry!(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA, "RedPaletteColorLookupTableData", OW),
    entry!(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA, "GreenPaletteColorLookupTableData", OW),
    entry!(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA, "BluePaletteColorLookupTableData", OW),
    entry!(tags::SPECTROSCOPY_DATA, "SpectroscopyData", OF),
    entry!(tags::FLOAT_PIXEL_DATA, "FloatPixelData", OF),
    entry!(tags::DOUBLE_FLOAT_PIXEL_DATA, "DoubleFloatPixelData", OD),
    entry!(tags::PIXEL_DATA, "PixelData", OW),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static TagEntry>> =
    Lazy::new(|| ENTRIES.iter().map(|e| (e.name, e)).collect());

static BY_TAG: Lazy<HashMap<Tag, &'static TagEntry>> =
    Lazy::new(|| ENTRIES.iter().map(|e| (e.tag, e)).collect());

/// Look up a keyword
pub fn by_name(name: &str) -> Option<&'static TagEntry> {
    BY_NAME.get(name).copied()
}

/// Look up a tag
pub fn by_tag(tag: Tag) -> Option<&'static TagEntry> {
    BY_TAG.get(&tag).copied()
}

/// Keyword for logging, or the tag's numeric form
pub fn describe(tag: Tag) -> String {
    by_tag(tag).map_or_else(|| tag.to_string(), |e| format!("{} {}", tag, e.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        let entry = by_name("SeriesDescription").unwrap();
        assert_eq!(entry.tag, tags::SERIES_DESCRIPTION);
        assert_eq!(entry.vr, Vr::LO);
        assert_eq!(by_tag(tags::PIXEL_DATA).unwrap().name, "PixelData");
        assert!(by_name("Nope").is_none());
    }

    #[test]
    fn test_entries_are_sorted_and_unique() {
        for pair in ENTRIES.windows(2) {
            assert!(pair[0].tag < pair[1].tag, "{} out of order", pair[1].name);
        }
    }
}
