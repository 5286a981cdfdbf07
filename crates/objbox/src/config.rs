//! Store configuration.

use objbox_engine::ObxStoreOptions;
use std::time::Duration;

/// Configuration for opening an [`ObjectBox`](crate::ObjectBox).
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of async puts waiting in the engine queue.
    pub async_queue_capacity: usize,

    /// Maximum number of async puts committed in one batch.
    pub async_max_batch: usize,

    /// How long `put_async` may wait for queue space before failing with
    /// [`ObxError::AsyncBackpressure`](crate::ObxError::AsyncBackpressure).
    pub async_enqueue_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_queue_capacity: 1024,
            async_max_batch: 256,
            async_enqueue_timeout: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the async queue capacity.
    #[must_use]
    pub const fn async_queue_capacity(mut self, capacity: usize) -> Self {
        self.async_queue_capacity = capacity;
        self
    }

    /// Sets the maximum async batch size.
    #[must_use]
    pub const fn async_max_batch(mut self, max_batch: usize) -> Self {
        self.async_max_batch = max_batch;
        self
    }

    /// Sets the async enqueue timeout.
    #[must_use]
    pub const fn async_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.async_enqueue_timeout = timeout;
        self
    }

    pub(crate) fn to_store_options(&self) -> ObxStoreOptions {
        ObxStoreOptions {
            async_queue_capacity: self.async_queue_capacity,
            async_max_batch: self.async_max_batch,
            async_enqueue_timeout_ms: u64::try_from(self.async_enqueue_timeout.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}
