//! Attribute keys

use std::fmt;

use crate::core::DecodeError;
use crate::types::dictionary;

/// Numeric attribute key: group in the high 16 bits, element in the low 16.
///
/// Collections are always ordered by ascending tag, and the merge engine
/// depends on that ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Tag(u32);

impl Tag {
    /// Largest possible key; resolving up to it resolves everything.
    pub const MAX: Tag = Tag(u32::MAX);

    /// Create from a raw 32-bit value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Create from group and element numbers
    pub const fn from_parts(group: u16, element: u16) -> Self {
        Self(((group as u32) << 16) | element as u32)
    }

    /// Raw 32-bit value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Group number
    pub const fn group(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Element number
    pub const fn element(self) -> u16 {
        self.0 as u16
    }

    /// Private tags live in odd-numbered groups
    pub const fn is_private(self) -> bool {
        self.group() & 1 == 1
    }

    /// Eight upper-case hex digits, the form written into mementos
    pub fn hex(self) -> String {
        format!("{:08X}", self.0)
    }

    /// Parse a tag reference as written in a memento: eight hex digits, or a
    /// dictionary keyword prefixed with `$`.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        if let Some(name) = text.strip_prefix('$') {
            return dictionary::by_name(name)
                .map(|entry| entry.tag)
                .ok_or_else(|| DecodeError::UnknownTagName(name.to_string()));
        }
        u32::from_str_radix(text, 16)
            .map(Tag)
            .map_err(|_| DecodeError::InvalidTag(text.to_string()))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:04X},{:04X})", self.group(), self.element())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group(), self.element())
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
