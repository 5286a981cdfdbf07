//! Bounded queue feeding the async put worker.

use crate::error::{EngineError, EngineResult};
use crate::types::ObxStoreOptions;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// One queued async put.
#[derive(Debug, Clone)]
pub(crate) struct AsyncPut {
    pub(crate) type_id: u32,
    pub(crate) id: u64,
    pub(crate) data: Bytes,
    pub(crate) check_previous: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<AsyncPut>,
    /// Items taken by the worker and not yet committed.
    in_flight: usize,
    shutdown: bool,
}

/// Multi-producer, single-consumer queue with a bounded enqueue wait.
///
/// Producers that find the queue full are throttled until space frees up or
/// the enqueue timeout elapses, in which case the put fails with
/// `AsyncQueueFull`. Items are never dropped silently.
pub(crate) struct AsyncQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    idle: Condvar,
    capacity: usize,
    max_batch: usize,
    enqueue_timeout: Duration,
}

impl AsyncQueue {
    pub(crate) fn new(options: &ObxStoreOptions) -> Self {
        let options = options.normalized();
        Self {
            state: Mutex::new(QueueState::default()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            idle: Condvar::new(),
            capacity: options.async_queue_capacity,
            max_batch: options.async_max_batch,
            enqueue_timeout: options.enqueue_timeout(),
        }
    }

    /// Enqueues an item, waiting at most the enqueue timeout for space.
    pub(crate) fn push(&self, item: AsyncPut) -> EngineResult<()> {
        let mut state = self.state.lock();

        if state.items.len() >= self.capacity && !state.shutdown {
            trace!(capacity = self.capacity, "async queue full, throttling producer");
            let deadline = Instant::now() + self.enqueue_timeout;
            while state.items.len() >= self.capacity && !state.shutdown {
                if self.not_full.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
        }

        if state.shutdown {
            return Err(EngineError::closed("store is closing, async queue no longer accepts puts"));
        }
        if state.items.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                timeout_ms = self.enqueue_timeout.as_millis() as u64,
                "async queue still full after enqueue timeout"
            );
            return Err(EngineError::queue_full(format!(
                "async queue full ({} items) after waiting {:?}",
                self.capacity, self.enqueue_timeout
            )));
        }

        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until items are available and takes up to one batch.
    ///
    /// Returns `None` once the queue is shut down and drained.
    pub(crate) fn next_batch(&self) -> Option<Vec<AsyncPut>> {
        let mut state = self.state.lock();
        loop {
            if !state.items.is_empty() {
                let n = state.items.len().min(self.max_batch);
                let batch: Vec<AsyncPut> = state.items.drain(..n).collect();
                state.in_flight = batch.len();
                drop(state);
                self.not_full.notify_all();
                return Some(batch);
            }
            if state.shutdown {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Marks the batch returned by the last `next_batch` as committed.
    pub(crate) fn batch_done(&self) {
        let mut state = self.state.lock();
        state.in_flight = 0;
        if state.items.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Blocks until every enqueued item has been committed.
    pub(crate) fn wait_idle(&self) {
        let mut state = self.state.lock();
        while !state.items.is_empty() || state.in_flight > 0 {
            self.idle.wait(&mut state);
        }
    }

    /// Stops accepting new items; the worker drains what is left.
    pub(crate) fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Returns the number of queued items.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObxStatus;
    use std::sync::Arc;
    use std::thread;

    fn item(id: u64) -> AsyncPut {
        AsyncPut {
            type_id: 1,
            id,
            data: Bytes::from_static(b"x"),
            check_previous: false,
        }
    }

    fn queue(capacity: usize, max_batch: usize, timeout_ms: u64) -> AsyncQueue {
        AsyncQueue::new(&ObxStoreOptions {
            async_queue_capacity: capacity,
            async_max_batch: max_batch,
            async_enqueue_timeout_ms: timeout_ms,
        })
    }

    #[test]
    fn batches_respect_max_batch_and_order() {
        let queue = queue(10, 2, 0);
        for id in 1..=5 {
            queue.push(item(id)).unwrap();
        }

        let first: Vec<u64> = queue.next_batch().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(first, vec![1, 2]);
        queue.batch_done();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn full_queue_times_out() {
        let queue = queue(2, 10, 10);
        queue.push(item(1)).unwrap();
        queue.push(item(2)).unwrap();

        let err = queue.push(item(3)).unwrap_err();
        assert_eq!(err.status, ObxStatus::AsyncQueueFull);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn throttled_producer_proceeds_when_space_frees() {
        let queue = Arc::new(queue(1, 1, 5_000));
        queue.push(item(1)).unwrap();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let batch = queue.next_batch().unwrap();
                queue.batch_done();
                batch.len()
            })
        };

        queue.push(item(2)).unwrap();
        assert_eq!(consumer.join().unwrap(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn shutdown_drains_then_stops() {
        let queue = queue(4, 4, 0);
        queue.push(item(1)).unwrap();
        queue.shutdown();

        assert_eq!(queue.push(item(2)).unwrap_err().status, ObxStatus::Closed);
        assert_eq!(queue.next_batch().unwrap().len(), 1);
        queue.batch_done();
        assert!(queue.next_batch().is_none());
    }

    #[test]
    fn wait_idle_returns_after_batch_done() {
        let queue = Arc::new(queue(4, 4, 0));
        queue.push(item(1)).unwrap();

        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let _batch = queue.next_batch().unwrap();
                queue.batch_done();
            })
        };

        queue.wait_idle();
        worker.join().unwrap();
        assert_eq!(queue.len(), 0);
    }
}
