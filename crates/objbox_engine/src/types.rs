//! Type definitions for the C ABI.

use std::time::Duration;

/// An opaque store handle.
///
/// Never dereference or modify directly.
#[repr(C)]
pub struct ObxStore {
    _private: [u8; 0],
}

/// An opaque per-type box handle.
#[repr(C)]
pub struct ObxBox {
    _private: [u8; 0],
}

/// An opaque transaction handle.
#[repr(C)]
pub struct ObxTxn {
    _private: [u8; 0],
}

/// An opaque cursor handle, valid only inside its transaction.
#[repr(C)]
pub struct ObxCursor {
    _private: [u8; 0],
}

/// Options for opening a store.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObxStoreOptions {
    /// Maximum number of queued async puts.
    pub async_queue_capacity: usize,
    /// Maximum number of async puts committed in one transaction.
    pub async_max_batch: usize,
    /// How long an async put may wait for queue space before failing.
    pub async_enqueue_timeout_ms: u64,
}

impl Default for ObxStoreOptions {
    fn default() -> Self {
        Self {
            async_queue_capacity: 1024,
            async_max_batch: 256,
            async_enqueue_timeout_ms: 1000,
        }
    }
}

impl ObxStoreOptions {
    /// Returns the enqueue timeout as a duration.
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.async_enqueue_timeout_ms)
    }

    /// Replaces zero values with usable minimums.
    pub(crate) fn normalized(mut self) -> Self {
        self.async_queue_capacity = self.async_queue_capacity.max(1);
        self.async_max_batch = self.async_max_batch.max(1);
        self
    }
}
