//! Error types for the ObjBox binding.

use objbox_engine::{obx_last_error_code, obx_last_error_message, ObxStatus};
use objbox_flat::FlatError;
use std::ffi::CStr;
use thiserror::Error;

/// Result type for binding operations.
pub type ObxResult<T> = Result<T, ObxError>;

/// Errors returned by boxes and the store.
#[derive(Debug, Error)]
pub enum ObxError {
    /// Engine failure without a more specific variant.
    #[error("engine error {code}: {message}")]
    Engine {
        /// Engine status code.
        code: i32,
        /// Engine message.
        message: String,
    },

    /// The object does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Engine message.
        message: String,
    },

    /// The engine rejected an argument, e.g. a reserved ID.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Engine message.
        message: String,
    },

    /// The async put queue stayed full for the whole enqueue timeout.
    #[error("async queue full: {message}")]
    AsyncBackpressure {
        /// Engine message.
        message: String,
    },

    /// The box or store was used after close.
    #[error("closed: {message}")]
    Closed {
        /// What was closed.
        message: String,
    },

    /// Builder misuse or malformed object bytes.
    #[error("codec error: {0}")]
    Codec(#[from] FlatError),

    /// An entity binding failed to flatten or load an object.
    #[error("binding error: {message}")]
    Binding {
        /// Description of the failure.
        message: String,
    },
}

impl ObxError {
    /// Creates a binding error.
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Creates a closed error.
    pub fn closed(message: impl Into<String>) -> Self {
        Self::Closed {
            message: message.into(),
        }
    }

    /// Maps an engine status code and message to the matching variant.
    pub fn from_engine(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match ObxStatus::from(code) {
            ObxStatus::NotFound => Self::NotFound { message },
            ObxStatus::IllegalArgument => Self::InvalidArgument { message },
            ObxStatus::AsyncQueueFull => Self::AsyncBackpressure { message },
            ObxStatus::Closed => Self::Closed { message },
            _ => Self::Engine { code, message },
        }
    }

    /// Returns true for [`ObxError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`ObxError::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Translates the engine's last error on this thread into an [`ObxError`].
///
/// Must run right after the failing engine call: the next call on the same
/// thread clears the engine's last error. `status` is used when the engine
/// left no error code behind.
pub(crate) fn last_error(status: ObxStatus) -> ObxError {
    let code = match obx_last_error_code() {
        0 => status.code(),
        code => code,
    };
    let ptr = obx_last_error_message();
    let message = if ptr.is_null() {
        format!("engine call failed with status {status:?}")
    } else {
        // SAFETY: the engine keeps the message alive until its next call on
        // this thread; it is copied out before that happens.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    };
    ObxError::from_engine(code, message)
}

/// Converts an engine status into a result.
pub(crate) fn check(status: ObxStatus) -> ObxResult<()> {
    if status.is_ok() {
        Ok(())
    } else {
        Err(last_error(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_codes_map_to_variants() {
        assert!(ObxError::from_engine(ObxStatus::NotFound.code(), "x").is_not_found());
        assert!(ObxError::from_engine(ObxStatus::Closed.code(), "x").is_closed());
        assert!(matches!(
            ObxError::from_engine(ObxStatus::IllegalArgument.code(), "x"),
            ObxError::InvalidArgument { .. }
        ));
        assert!(matches!(
            ObxError::from_engine(ObxStatus::AsyncQueueFull.code(), "x"),
            ObxError::AsyncBackpressure { .. }
        ));
        assert!(matches!(
            ObxError::from_engine(ObxStatus::IllegalState.code(), "x"),
            ObxError::Engine { code: 4, .. }
        ));
    }

    #[test]
    fn check_success() {
        assert!(check(ObxStatus::Success).is_ok());
    }

    #[test]
    fn last_error_captures_engine_message() {
        // Null out-pointer makes the engine fail and record a last error.
        let status = unsafe { objbox_engine::obx_store_open(std::ptr::null(), std::ptr::null_mut()) };
        let err = check(status).unwrap_err();
        match err {
            ObxError::Engine { code, message } => {
                assert_eq!(code, ObxStatus::NullPointer.code());
                assert!(message.contains("null pointer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_last_error_falls_back_to_status() {
        objbox_engine::obx_last_error_clear();
        let err = last_error(ObxStatus::NotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn display() {
        let err = ObxError::binding("missing field 1");
        assert_eq!(err.to_string(), "binding error: missing field 1");
    }
}
