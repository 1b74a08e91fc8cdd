//! Error types and handling for the study delta codec
//!
//! This module defines all error types used throughout the crate. Structural
//! decode failures abort the enclosing series, value-conversion failures are
//! kept separate because they are only ever logged.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the study delta codec
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structural errors found while decoding a memento tree
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An instance belongs to a different study than the record it was added to
    #[error("Study UID mismatch: expected {expected}, got {actual}")]
    StudyMismatch {
        /// Study UID held by the record
        expected: String,
        /// Study UID found in the rejected instance
        actual: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// XML reader/writer errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Structural errors in a serialized memento
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required XML attribute is missing from an element
    #[error("<{element}> is missing required field '{field}'")]
    MissingField {
        /// Element name
        element: String,
        /// Attribute name
        field: &'static str,
    },

    /// A `$Name` tag reference is not in the dictionary
    #[error("Unknown tag name: {0}")]
    UnknownTagName(String),

    /// A hexadecimal tag could not be parsed
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// A value representation code is not recognised
    #[error("Unknown value representation: {0}")]
    UnknownVr(String),

    /// An element appeared where it is not allowed
    #[error("Unexpected element <{found}> inside <{parent}>")]
    UnexpectedElement {
        /// Element that was found
        found: String,
        /// Enclosing element
        parent: String,
    },

    /// Markers of one element are not in strictly ascending tag order
    #[error("<{element}> lists tag {tag} after {previous}")]
    OutOfOrder {
        /// Element holding the markers
        element: String,
        /// Offending tag
        tag: String,
        /// Tag written before it
        previous: String,
    },

    /// The document has no root element of the expected name
    #[error("Missing root element <{0}>")]
    MissingRoot(&'static str),
}

/// Failure converting a marker's text into its declared value representation.
///
/// Recovered locally: the attribute is left without a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse '{text}' as {vr}: {reason}")]
pub struct ValueError {
    /// Declared value representation code
    pub vr: &'static str,
    /// Offending text
    pub text: String,
    /// Parser message
    pub reason: String,
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this is a structural decode failure
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Xml(_))
    }

    /// Check if the caller supplied something the codec rejects
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::StudyMismatch { .. } | Error::Config(_)
        )
    }
}
