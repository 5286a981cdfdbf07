//! Status codes, engine errors and the thread-local last error.

use std::cell::RefCell;
use std::ffi::{c_char, CString};
use thiserror::Error;

/// Status code returned by every engine function.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObxStatus {
    /// Operation succeeded.
    Success = 0,
    /// Generic error.
    Error = 1,
    /// Invalid argument (unknown type, reserved ID, empty payload).
    IllegalArgument = 2,
    /// Object not found.
    NotFound = 3,
    /// Operation not valid in the current state.
    IllegalState = 4,
    /// Store or handle already closed.
    Closed = 5,
    /// Null pointer argument.
    NullPointer = 6,
    /// Write attempted in a read-only transaction.
    ReadOnly = 7,
    /// The async put queue stayed full for the whole enqueue timeout.
    AsyncQueueFull = 8,
}

impl ObxStatus {
    /// Returns true if the status indicates success.
    pub fn is_ok(self) -> bool {
        self == ObxStatus::Success
    }

    /// Returns true if the status indicates an error.
    pub fn is_err(self) -> bool {
        self != ObxStatus::Success
    }

    /// Returns the numeric code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<i32> for ObxStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => ObxStatus::Success,
            2 => ObxStatus::IllegalArgument,
            3 => ObxStatus::NotFound,
            4 => ObxStatus::IllegalState,
            5 => ObxStatus::Closed,
            6 => ObxStatus::NullPointer,
            7 => ObxStatus::ReadOnly,
            8 => ObxStatus::AsyncQueueFull,
            _ => ObxStatus::Error,
        }
    }
}

/// Result type for internal engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// An engine failure: the status reported across the C ABI plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status:?})")]
pub struct EngineError {
    /// Status reported to the caller.
    pub status: ObxStatus,
    /// Diagnostic message stored as the last error.
    pub message: String,
}

impl EngineError {
    /// Creates an error with the given status.
    pub fn new(status: ObxStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates an illegal argument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(ObxStatus::IllegalArgument, message)
    }

    /// Creates an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ObxStatus::IllegalState, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ObxStatus::NotFound, message)
    }

    /// Creates a closed error.
    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(ObxStatus::Closed, message)
    }

    /// Creates a read-only violation error.
    pub fn read_only() -> Self {
        Self::new(
            ObxStatus::ReadOnly,
            "cannot write in a read-only transaction",
        )
    }

    /// Creates an async queue full error.
    pub fn queue_full(message: impl Into<String>) -> Self {
        Self::new(ObxStatus::AsyncQueueFull, message)
    }

    /// Creates a null pointer error.
    pub fn null_pointer() -> Self {
        Self::new(ObxStatus::NullPointer, "null pointer argument")
    }
}

struct LastError {
    status: ObxStatus,
    message: CString,
}

// Thread-local storage for last error
thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Sets the last error for the calling thread.
pub(crate) fn set_last_error(status: ObxStatus, message: impl Into<String>) {
    let message = message.into().replace('\0', " ");
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message).ok().map(|message| LastError { status, message });
    });
}

/// Clears the last error for the calling thread.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its status.
pub(crate) fn report(err: EngineError) -> ObxStatus {
    let status = err.status;
    set_last_error(status, err.message);
    status
}

/// Maps an internal result to the status returned across the C ABI.
pub(crate) fn to_status(result: EngineResult<()>) -> ObxStatus {
    match result {
        Ok(()) => ObxStatus::Success,
        Err(e) => report(e),
    }
}

/// Gets the last error code for this thread, or `0` if none is set.
#[no_mangle]
pub extern "C" fn obx_last_error_code() -> i32 {
    LAST_ERROR.with(|e| e.borrow().as_ref().map_or(0, |last| last.status.code()))
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next engine call on this thread;
/// callers must copy the message out before calling the engine again.
#[no_mangle]
pub extern "C" fn obx_last_error_message() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(last) => last.message.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error.
#[no_mangle]
pub extern "C" fn obx_last_error_clear() {
    clear_last_error();
}
