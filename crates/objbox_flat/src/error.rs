//! Error types for the flat crate.

use thiserror::Error;

/// Result type for builder and reader operations.
pub type FlatResult<T> = Result<T, FlatError>;

/// Errors raised while building or reading a flat object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlatError {
    /// The builder was used out of order.
    #[error("invalid builder state: {message}")]
    InvalidState {
        /// What the caller attempted.
        message: String,
    },

    /// A field slot was written twice for the same object.
    #[error("field slot {slot} written twice")]
    DuplicateSlot {
        /// The repeated slot.
        slot: u16,
    },

    /// Failed to encode the finished object.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode bytes into a table.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The decoded bytes do not have the shape of a flat object.
    #[error("invalid object structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// A requested field is absent.
    #[error("missing field in slot {slot}")]
    MissingField {
        /// The requested slot.
        slot: u16,
    },

    /// A field holds a value of another type than requested.
    #[error("field in slot {slot} is not {expected}")]
    TypeMismatch {
        /// The requested slot.
        slot: u16,
        /// Name of the requested type.
        expected: &'static str,
    },
}

impl FlatError {
    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Creates a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}
