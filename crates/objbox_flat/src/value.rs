//! Field values stored in a flat object.

use ciborium::Value as Cbor;

/// A single field value.
///
/// Flat objects are rows of scalar fields; nested structures are out of
/// scope and must be flattened by the entity binding.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Returns the boolean if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an int.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float if this is a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte slice if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn to_cbor(&self) -> Cbor {
        match self {
            FieldValue::Null => Cbor::Null,
            FieldValue::Bool(b) => Cbor::Bool(*b),
            FieldValue::Int(n) => Cbor::Integer((*n).into()),
            FieldValue::Float(f) => Cbor::Float(*f),
            FieldValue::Text(s) => Cbor::Text(s.clone()),
            FieldValue::Bytes(b) => Cbor::Bytes(b.clone()),
        }
    }

    pub(crate) fn from_cbor(value: Cbor) -> Option<Self> {
        match value {
            Cbor::Null => Some(FieldValue::Null),
            Cbor::Bool(b) => Some(FieldValue::Bool(b)),
            Cbor::Integer(n) => i64::try_from(n).ok().map(FieldValue::Int),
            Cbor::Float(f) => Some(FieldValue::Float(f)),
            Cbor::Text(s) => Some(FieldValue::Text(s)),
            Cbor::Bytes(b) => Some(FieldValue::Bytes(b)),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(b: &[u8]) -> Self {
        FieldValue::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
