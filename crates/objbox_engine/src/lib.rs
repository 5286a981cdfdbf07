//! # ObjBox Engine
//!
//! Reference in-memory object store exposed through a stable C ABI.
//!
//! The binding crate treats this engine as a black box and only talks to it
//! through the `obx_*` functions exported here. The engine provides:
//! - Per-type boxes with ID sequences (`obx_box_id_for_put`)
//! - Single-writer transactions with snapshot readers
//! - Cursors bound to one entity type inside a transaction
//! - A bounded async put queue drained by a background worker
//! - A thread-local last error (`obx_last_error_code` / `obx_last_error_message`)
//!
//! ## Conventions
//!
//! Every function returns an [`ObxStatus`]; `Success` is `0`. On failure the
//! thread-local last error holds a code and message until the next engine
//! call on the same thread. Handles returned through out-pointers are owned
//! by the caller and must be released with the matching `close`, `commit`
//! or `abort` function. Buffers handed out by the engine are released with
//! [`obx_bytes_free`] / [`obx_bytes_array_free`].

#![warn(missing_docs)]

mod boxes;
mod buffer;
mod engine;
mod error;
mod queue;
mod store;
mod transaction;
mod types;

pub use boxes::{obx_box_close, obx_box_id_for_put, obx_box_open, obx_box_put_async};
pub use buffer::{obx_bytes_array_free, obx_bytes_free, ObxBytes, ObxBytesArray};
pub use error::{
    obx_last_error_clear, obx_last_error_code, obx_last_error_message, EngineError,
    EngineResult, ObxStatus,
};
pub use store::{
    obx_store_await_async_completion, obx_store_close, obx_store_open,
    obx_store_options_default, obx_store_register_entity,
};
pub use transaction::{
    obx_cursor_close, obx_cursor_contains, obx_cursor_count, obx_cursor_get,
    obx_cursor_get_all, obx_cursor_id_for_put, obx_cursor_open, obx_cursor_put,
    obx_cursor_remove, obx_cursor_remove_all, obx_txn_abort, obx_txn_begin, obx_txn_commit,
};
pub use types::{ObxBox, ObxCursor, ObxStore, ObxStoreOptions, ObxTxn};

/// Highest ID the engine hands out or accepts; `u64::MAX` is reserved.
pub const MAX_OBJECT_ID: u64 = u64::MAX - 1;
