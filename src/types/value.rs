//! Attribute values
//!
//! Values know how to render themselves into the memento text form and how to
//! be parsed back from it for a declared value representation.

use bytes::Bytes;
use std::fmt::Display;
use std::str::FromStr;

use crate::core::ValueError;
use crate::types::{Dataset, ValueKind, Vr};

/// Multi-value separator in the text form
pub const VALUE_SEPARATOR: char = '\\';

/// Attribute value
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value (present but empty)
    #[default]
    Empty,
    /// Character strings, one per value multiplicity
    Strings(Vec<String>),
    /// Unsigned integers
    Unsigned(Vec<u32>),
    /// Signed integers
    Signed(Vec<i32>),
    /// 32-bit floats
    Floats(Vec<f32>),
    /// 64-bit floats
    Doubles(Vec<f64>),
    /// Raw bytes
    Bytes(Bytes),
    /// 16-bit words
    Words(Vec<u16>),
    /// Nested item collections
    Sequence(Vec<Dataset>),
}

impl Value {
    /// Check if the value carries nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Strings(v) => v.iter().all(|s| s.is_empty()),
            Value::Unsigned(v) => v.is_empty(),
            Value::Signed(v) => v.is_empty(),
            Value::Floats(v) => v.is_empty(),
            Value::Doubles(v) => v.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Words(v) => v.is_empty(),
            Value::Sequence(items) => items.is_empty(),
        }
    }

    /// First string value, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Strings(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// Sequence items, if this is a sequence value
    pub fn items(&self) -> Option<&[Dataset]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Approximate encoded length in bytes, padded to even like the wire format.
    pub fn stream_length(&self) -> u64 {
        let raw: usize = match self {
            Value::Empty => 0,
            Value::Strings(v) => {
                let chars: usize = v.iter().map(String::len).sum();
                chars + v.len().saturating_sub(1)
            }
            Value::Unsigned(v) => v.len() * 4,
            Value::Signed(v) => v.len() * 4,
            Value::Floats(v) => v.len() * 4,
            Value::Doubles(v) => v.len() * 8,
            Value::Bytes(b) => b.len(),
            Value::Words(v) => v.len() * 2,
            Value::Sequence(items) => {
                return items.iter().map(|item| 8 + item.stream_length()).sum();
            }
        };
        let raw = raw as u64;
        raw + (raw & 1)
    }

    /// Render into the memento text form; sequences have none.
    pub fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Empty => String::new(),
            Value::Strings(v) => v.join("\\"),
            Value::Unsigned(v) => join(v),
            Value::Signed(v) => join(v),
            Value::Floats(v) => join(v),
            Value::Doubles(v) => join(v),
            Value::Bytes(b) => join(b.as_ref()),
            Value::Words(v) => join(v),
            Value::Sequence(_) => return None,
        })
    }

    /// Parse the memento text form for a declared value representation.
    pub fn parse(vr: Vr, text: &str) -> Result<Value, ValueError> {
        if text.is_empty() {
            return Ok(Value::Empty);
        }
        let fail = |reason: String| ValueError { vr: vr.code(), text: text.to_string(), reason };
        match vr.kind() {
            ValueKind::Text => Ok(Value::Strings(
                text.split(VALUE_SEPARATOR).map(str::to_string).collect(),
            )),
            ValueKind::Unsigned => {
                let values: Vec<u32> = split_parse(text).map_err(fail)?;
                if vr.element_size() == Some(2) && values.iter().any(|v| *v > u16::MAX as u32) {
                    return Err(ValueError {
                        vr: vr.code(),
                        text: text.to_string(),
                        reason: "value exceeds 16 bits".to_string(),
                    });
                }
                Ok(Value::Unsigned(values))
            }
            ValueKind::Signed => {
                let values: Vec<i32> = split_parse(text).map_err(fail)?;
                if vr.element_size() == Some(2)
                    && values.iter().any(|v| *v > i16::MAX as i32 || *v < i16::MIN as i32)
                {
                    return Err(ValueError {
                        vr: vr.code(),
                        text: text.to_string(),
                        reason: "value exceeds 16 bits".to_string(),
                    });
                }
                Ok(Value::Signed(values))
            }
            ValueKind::Float => split_parse(text).map(Value::Floats).map_err(fail),
            ValueKind::Double => split_parse(text).map(Value::Doubles).map_err(fail),
            ValueKind::Bytes => split_parse::<u8>(text)
                .map(|b| Value::Bytes(Bytes::from(b)))
                .map_err(fail),
            ValueKind::Words => split_parse(text).map(Value::Words).map_err(fail),
            ValueKind::Sequence => Err(fail("sequence values are written as items".to_string())),
        }
    }
}

fn join<T: Display>(values: &[T]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(VALUE_SEPARATOR);
        }
        out.push_str(&v.to_string());
    }
    out
}

fn split_parse<T>(text: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    text.split(VALUE_SEPARATOR)
        .map(|part| part.trim().parse::<T>().map_err(|e| format!("'{}': {}", part, e)))
        .collect()
}

// Convenient constructors
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Value::Empty
        } else {
            Value::Strings(s.split(VALUE_SEPARATOR).map(str::to_string).collect())
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from(s.as_str())
    }
}

impl From<Vec<u16>> for Value {
    fn from(v: Vec<u16>) -> Self {
        Value::Words(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Floats(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Doubles(v)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Dataset>> for Value {
    fn from(items: Vec<Dataset>) -> Self {
        Value::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(Value::Empty.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::Strings(vec![String::new()]).is_empty());
        assert!(!Value::from("MR").is_empty());
        assert!(Value::Sequence(vec![]).is_empty());
        assert!(!Value::Words(vec![0]).is_empty());
    }

    #[test]
    fn test_text_form() {
        assert_eq!(Value::from("ORIGINAL\\PRIMARY").to_text().unwrap(), "ORIGINAL\\PRIMARY");
        assert_eq!(Value::Words(vec![1, 2, 300]).to_text().unwrap(), "1\\2\\300");
        assert_eq!(Value::Doubles(vec![0.1, -2.5]).to_text().unwrap(), "0.1\\-2.5");
        assert!(Value::Sequence(vec![]).to_text().is_none());
    }

    #[test]
    fn test_parse_declared_representation() {
        assert_eq!(Value::parse(Vr::US, "512").unwrap(), Value::Unsigned(vec![512]));
        assert_eq!(Value::parse(Vr::OF, "1.5\\2").unwrap(), Value::Floats(vec![1.5, 2.0]));
        assert_eq!(Value::parse(Vr::OB, "0\\255").unwrap(), Value::Bytes(Bytes::from_static(&[0, 255])));
        assert_eq!(Value::parse(Vr::CS, "").unwrap(), Value::Empty);
        let floats = Value::Floats(vec![0.1, 1e-7, 3.4028235e38]);
        assert_eq!(Value::parse(Vr::FL, &floats.to_text().unwrap()).unwrap(), floats);
    }

    #[test]
    fn test_parse_failures() {
        let err = Value::parse(Vr::US, "70000").unwrap_err();
        assert_eq!(err.vr, "US");
        assert!(Value::parse(Vr::SL, "abc").is_err());
        assert!(Value::parse(Vr::OB, "256").is_err());
        assert!(Value::parse(Vr::SQ, "x").is_err());
    }

    #[test]
    fn test_stream_length_is_even() {
        assert_eq!(Value::from("MR").stream_length(), 2);
        assert_eq!(Value::from("CT1").stream_length(), 4);
        assert_eq!(Value::Words(vec![0; 256]).stream_length(), 512);
        assert_eq!(Value::Empty.stream_length(), 0);
    }
}
