//! Serialized memento format
//!
//! The escape layer, the generic element tree with its XML text form, and the
//! compressed stream boundary.

/// Reversible text escaping
pub mod escape;
/// Element tree and XML reader/writer
pub mod tree;
/// Compression filters and file helpers
pub mod stream;

pub use escape::{escape, escape_attribute, unescape};
pub use tree::{TreeChild, TreeNode};
pub use stream::{load_from_path, read_memento, save_to_path, write_memento, Compression};

/// Element and attribute names used in the memento tree
pub mod names {
    /// Document root
    pub const ROOT: &str = "StudyMemento";
    /// Study element
    pub const STUDY: &str = "Study";
    /// Series element
    pub const SERIES: &str = "Series";
    /// Base profile element
    pub const BASE_INSTANCE: &str = "BaseInstance";
    /// Instance element
    pub const INSTANCE: &str = "Instance";
    /// Sequence item element
    pub const ITEM: &str = "Item";
    /// Value marker
    pub const VALUE: &str = "Attribute";
    /// Empty marker
    pub const EMPTY: &str = "EmptyAttribute";
    /// Excluded marker
    pub const EXCLUDED: &str = "ExcludedAttribute";

    /// Record key
    pub const UID: &str = "UID";
    /// Value-representation class of an instance
    pub const SOP_CLASS_UID: &str = "SopClassUID";
    /// Encoding identifier of an instance
    pub const TRANSFER_SYNTAX_UID: &str = "TransferSyntaxUID";
    /// Source application entity
    pub const SOURCE_AE_TITLE: &str = "SourceAETitle";
    /// Source file name
    pub const SOURCE_FILE_NAME: &str = "SourceFileName";
    /// Recorded byte size
    pub const FILE_SIZE: &str = "FileSize";
    /// Marker key
    pub const TAG: &str = "Tag";
    /// Marker value representation
    pub const VR: &str = "VR";
}
