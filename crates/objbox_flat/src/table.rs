//! Read access to finished objects.

use crate::error::{FlatError, FlatResult};
use crate::value::FieldValue;
use ciborium::Value as Cbor;
use std::collections::BTreeMap;

/// A decoded flat object: its ID plus fields keyed by slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    id: u64,
    fields: BTreeMap<u16, FieldValue>,
}

impl FlatTable {
    /// Parses the bytes produced by [`crate::FlatBuilder::finish`].
    pub fn parse(bytes: &[u8]) -> FlatResult<Self> {
        let value: Cbor = ciborium::de::from_reader(bytes)
            .map_err(|e| FlatError::decoding_failed(e.to_string()))?;

        let mut parts = match value {
            Cbor::Array(parts) if parts.len() == 2 => parts.into_iter(),
            _ => return Err(FlatError::invalid_structure("expected [id, fields]")),
        };

        let id = match parts.next() {
            Some(Cbor::Integer(n)) => u64::try_from(n)
                .map_err(|_| FlatError::invalid_structure("object ID out of range"))?,
            _ => return Err(FlatError::invalid_structure("object ID must be an integer")),
        };

        let entries = match parts.next() {
            Some(Cbor::Map(entries)) => entries,
            _ => return Err(FlatError::invalid_structure("fields must be a map")),
        };

        let mut fields = BTreeMap::new();
        for (key, value) in entries {
            let slot = match key {
                Cbor::Integer(n) => u16::try_from(n)
                    .map_err(|_| FlatError::invalid_structure("field slot out of range"))?,
                _ => return Err(FlatError::invalid_structure("field slot must be an integer")),
            };
            let value = FieldValue::from_cbor(value).ok_or_else(|| {
                FlatError::invalid_structure(format!("unsupported value in slot {slot}"))
            })?;
            if fields.insert(slot, value).is_some() {
                return Err(FlatError::DuplicateSlot { slot });
            }
        }

        Ok(Self { id, fields })
    }

    /// Returns the object ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, slot: u16) -> Option<&FieldValue> {
        self.fields.get(&slot)
    }

    fn require(&self, slot: u16) -> FlatResult<&FieldValue> {
        self.field(slot).ok_or(FlatError::MissingField { slot })
    }

    /// Reads a text field.
    pub fn get_text(&self, slot: u16) -> FlatResult<&str> {
        self.require(slot)?
            .as_text()
            .ok_or(FlatError::TypeMismatch {
                slot,
                expected: "text",
            })
    }

    /// Reads an integer field.
    pub fn get_i64(&self, slot: u16) -> FlatResult<i64> {
        self.require(slot)?
            .as_i64()
            .ok_or(FlatError::TypeMismatch {
                slot,
                expected: "int",
            })
    }

    /// Reads a boolean field.
    pub fn get_bool(&self, slot: u16) -> FlatResult<bool> {
        self.require(slot)?
            .as_bool()
            .ok_or(FlatError::TypeMismatch {
                slot,
                expected: "bool",
            })
    }

    /// Reads a float field.
    pub fn get_f64(&self, slot: u16) -> FlatResult<f64> {
        self.require(slot)?
            .as_f64()
            .ok_or(FlatError::TypeMismatch {
                slot,
                expected: "float",
            })
    }

    /// Reads a byte string field.
    pub fn get_bytes(&self, slot: u16) -> FlatResult<&[u8]> {
        self.require(slot)?
            .as_bytes()
            .ok_or(FlatError::TypeMismatch {
                slot,
                expected: "bytes",
            })
    }
}
