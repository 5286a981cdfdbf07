//! In-memory store state shared by every handle of one store.

use crate::error::{EngineError, EngineResult, ObxStatus};
use crate::queue::{AsyncPut, AsyncQueue};
use crate::types::ObxStoreOptions;
use crate::MAX_OBJECT_ID;
use bytes::Bytes;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Objects of one entity type, keyed by ID.
pub(crate) type Table = BTreeMap<u64, Bytes>;

/// An immutable view of all committed objects.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    tables: HashMap<u32, Arc<Table>>,
}

impl Snapshot {
    pub(crate) fn table(&self, type_id: u32) -> Option<&Table> {
        self.tables.get(&type_id).map(AsRef::as_ref)
    }
}

#[derive(Debug)]
struct EntityType {
    name: String,
    last_id: AtomicU64,
}

/// Pending changes of the single active writer.
///
/// Holding a `WriteSet` means holding the store's writer lock. Tables are
/// copied from the base snapshot on first modification.
pub(crate) struct WriteSet {
    guard: ArcMutexGuard<RawMutex, ()>,
    base: Arc<Snapshot>,
    touched: HashMap<u32, Table>,
}

impl WriteSet {
    /// Returns the current table for `type_id`, including pending changes.
    pub(crate) fn table(&self, type_id: u32) -> Option<&Table> {
        self.touched
            .get(&type_id)
            .or_else(|| self.base.table(type_id))
    }

    fn table_mut(&mut self, type_id: u32) -> &mut Table {
        let base = &self.base;
        self.touched
            .entry(type_id)
            .or_insert_with(|| base.table(type_id).cloned().unwrap_or_default())
    }

    /// Stores `data` under `id`.
    ///
    /// A put without the previous-value check claims to be an insert; it is
    /// rejected if the ID is already taken.
    pub(crate) fn put(
        &mut self,
        type_id: u32,
        id: u64,
        data: Bytes,
        check_previous: bool,
    ) -> EngineResult<()> {
        if id == 0 || id > MAX_OBJECT_ID {
            return Err(EngineError::illegal_argument(format!("invalid object ID {id}")));
        }
        if data.is_empty() {
            return Err(EngineError::illegal_argument("object data must not be empty"));
        }

        let table = self.table_mut(type_id);
        if !check_previous && table.contains_key(&id) {
            return Err(EngineError::illegal_state(format!(
                "object {id} already exists but was put without previous-value check"
            )));
        }
        table.insert(id, data);
        Ok(())
    }

    /// Removes one object; absent IDs are an error.
    pub(crate) fn remove(&mut self, type_id: u32, id: u64) -> EngineResult<()> {
        let exists = self
            .table(type_id)
            .is_some_and(|table| table.contains_key(&id));
        if !exists {
            return Err(EngineError::not_found(format!(
                "object {id} of type {type_id} not found"
            )));
        }
        self.table_mut(type_id).remove(&id);
        Ok(())
    }

    /// Removes every object of the type, returning how many were removed.
    pub(crate) fn remove_all(&mut self, type_id: u32) -> u64 {
        let count = self.table(type_id).map_or(0, |table| table.len() as u64);
        self.touched.insert(type_id, Table::new());
        count
    }
}

/// Shared state of one open store.
pub(crate) struct Engine {
    types: RwLock<HashMap<u32, Arc<EntityType>>>,
    committed: RwLock<Arc<Snapshot>>,
    /// Single-writer lock, held by a `WriteSet` for its whole lifetime.
    writer: Arc<Mutex<()>>,
    queue: AsyncQueue,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Engine {
    /// Opens a store and starts its async worker.
    pub(crate) fn open(options: ObxStoreOptions) -> EngineResult<Arc<Self>> {
        let options = options.normalized();
        let engine = Arc::new(Self {
            types: RwLock::new(HashMap::new()),
            committed: RwLock::new(Arc::new(Snapshot::default())),
            writer: Arc::new(Mutex::new(())),
            queue: AsyncQueue::new(&options),
            worker: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let worker_engine = Arc::clone(&engine);
        let handle = thread::Builder::new()
            .name("objbox-async".into())
            .spawn(move || worker_engine.run_async_worker())
            .map_err(|e| {
                EngineError::new(ObxStatus::Error, format!("failed to start async worker: {e}"))
            })?;
        *engine.worker.lock() = Some(handle);

        debug!(
            queue_capacity = options.async_queue_capacity,
            max_batch = options.async_max_batch,
            "store opened"
        );
        Ok(engine)
    }

    pub(crate) fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(EngineError::closed("store is closed"))
        } else {
            Ok(())
        }
    }

    /// Registers an entity type. Re-registering with the same name is a no-op.
    pub(crate) fn register(&self, type_id: u32, name: &str) -> EngineResult<()> {
        self.ensure_open()?;
        if type_id == 0 {
            return Err(EngineError::illegal_argument("entity type ID 0 is reserved"));
        }
        if name.is_empty() {
            return Err(EngineError::illegal_argument("entity name must not be empty"));
        }

        let mut types = self.types.write();
        match types.get(&type_id) {
            Some(existing) if existing.name == name => Ok(()),
            Some(existing) => Err(EngineError::illegal_argument(format!(
                "entity type {type_id} is already registered as {}",
                existing.name
            ))),
            None => {
                types.insert(
                    type_id,
                    Arc::new(EntityType {
                        name: name.to_string(),
                        last_id: AtomicU64::new(0),
                    }),
                );
                debug!(type_id, name, "entity type registered");
                Ok(())
            }
        }
    }

    fn entity_type(&self, type_id: u32) -> EngineResult<Arc<EntityType>> {
        self.types.read().get(&type_id).cloned().ok_or_else(|| {
            EngineError::illegal_argument(format!("entity type {type_id} is not registered"))
        })
    }

    /// Fails unless `type_id` is registered on an open store.
    pub(crate) fn check_type(&self, type_id: u32) -> EngineResult<()> {
        self.ensure_open()?;
        self.entity_type(type_id).map(|_| ())
    }

    /// Validates a caller-supplied ID or mints a new one when `candidate` is 0.
    pub(crate) fn id_for_put(&self, type_id: u32, candidate: u64) -> EngineResult<u64> {
        self.ensure_open()?;
        let entity_type = self.entity_type(type_id)?;

        if candidate == 0 {
            return entity_type
                .last_id
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                    (last < MAX_OBJECT_ID).then_some(last + 1)
                })
                .map(|last| last + 1)
                .map_err(|_| {
                    EngineError::illegal_state(format!(
                        "ID space of {} is exhausted",
                        entity_type.name
                    ))
                });
        }

        if candidate > MAX_OBJECT_ID {
            return Err(EngineError::illegal_argument(format!(
                "ID {candidate} is reserved and cannot be used for {}",
                entity_type.name
            )));
        }
        entity_type.last_id.fetch_max(candidate, Ordering::SeqCst);
        Ok(candidate)
    }

    /// Returns the latest committed snapshot.
    pub(crate) fn snapshot(&self) -> EngineResult<Arc<Snapshot>> {
        self.ensure_open()?;
        Ok(Arc::clone(&self.committed.read()))
    }

    /// Starts a write; blocks while another writer is active.
    pub(crate) fn begin_write(&self) -> EngineResult<WriteSet> {
        self.ensure_open()?;
        Ok(self.write_set())
    }

    fn write_set(&self) -> WriteSet {
        let guard = self.writer.lock_arc();
        let base = Arc::clone(&self.committed.read());
        WriteSet {
            guard,
            base,
            touched: HashMap::new(),
        }
    }

    /// Publishes the changes of a write set.
    pub(crate) fn commit(&self, write_set: WriteSet) -> EngineResult<()> {
        self.ensure_open()?;
        self.publish(write_set);
        Ok(())
    }

    fn publish(&self, write_set: WriteSet) {
        let WriteSet { guard, touched, .. } = write_set;
        if !touched.is_empty() {
            let mut committed = self.committed.write();
            let mut next = Snapshot::clone(&committed);
            for (type_id, table) in touched {
                next.tables.insert(type_id, Arc::new(table));
            }
            *committed = Arc::new(next);
        }
        drop(guard);
    }

    /// Enqueues an async put.
    pub(crate) fn put_async(
        &self,
        type_id: u32,
        id: u64,
        data: Bytes,
        check_previous: bool,
    ) -> EngineResult<()> {
        self.ensure_open()?;
        if id == 0 || id > MAX_OBJECT_ID {
            return Err(EngineError::illegal_argument(format!("invalid object ID {id}")));
        }
        if data.is_empty() {
            return Err(EngineError::illegal_argument("object data must not be empty"));
        }
        self.queue.push(AsyncPut {
            type_id,
            id,
            data,
            check_previous,
        })
    }

    /// Blocks until all queued async puts are committed.
    pub(crate) fn await_async_completion(&self) -> EngineResult<()> {
        self.ensure_open()?;
        self.queue.wait_idle();
        Ok(())
    }

    fn run_async_worker(&self) {
        debug!("async worker started");
        while let Some(batch) = self.queue.next_batch() {
            self.apply_async_batch(batch);
            self.queue.batch_done();
        }
        debug!("async worker stopped");
    }

    fn apply_async_batch(&self, batch: Vec<AsyncPut>) {
        let total = batch.len();
        let mut failed = 0usize;
        let mut write_set = self.write_set();
        for item in batch {
            if let Err(e) = write_set.put(item.type_id, item.id, item.data, item.check_previous) {
                warn!(type_id = item.type_id, id = item.id, error = %e, "async put rejected");
                failed += 1;
            }
        }
        self.publish(write_set);
        debug!(total, failed, "async batch committed");
    }

    /// Closes the store: drains the async queue, stops the worker and
    /// rejects every later operation.
    pub(crate) fn close(&self) -> EngineResult<()> {
        self.ensure_open()?;

        let pending = self.queue.len();
        self.queue.shutdown();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("async worker panicked");
            }
        }

        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(EngineError::closed("store is closed"));
        }
        debug!(drained = pending, "store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Arc<Engine> {
        let engine = Engine::open(ObxStoreOptions::default()).unwrap();
        engine.register(1, "Note").unwrap();
        engine
    }

    fn put(engine: &Engine, id: u64, data: &'static [u8]) {
        let mut ws = engine.begin_write().unwrap();
        ws.put(1, id, Bytes::from_static(data), true).unwrap();
        engine.commit(ws).unwrap();
    }

    #[test]
    fn ids_are_sequential_and_respect_supplied_ids() {
        let engine = open();
        assert_eq!(engine.id_for_put(1, 0).unwrap(), 1);
        assert_eq!(engine.id_for_put(1, 0).unwrap(), 2);
        assert_eq!(engine.id_for_put(1, 10).unwrap(), 10);
        assert_eq!(engine.id_for_put(1, 0).unwrap(), 11);
        assert_eq!(engine.id_for_put(1, 5).unwrap(), 5);
        assert_eq!(engine.id_for_put(1, 0).unwrap(), 12);
    }

    #[test]
    fn reserved_id_rejected() {
        let engine = open();
        let err = engine.id_for_put(1, u64::MAX).unwrap_err();
        assert_eq!(err.status, ObxStatus::IllegalArgument);
    }

    #[test]
    fn unregistered_type_rejected() {
        let engine = open();
        let err = engine.id_for_put(2, 0).unwrap_err();
        assert_eq!(err.status, ObxStatus::IllegalArgument);
        assert!(engine.check_type(2).is_err());
    }

    #[test]
    fn register_conflicting_name() {
        let engine = open();
        engine.register(1, "Note").unwrap();
        assert!(engine.register(1, "Other").is_err());
        assert!(engine.register(0, "Zero").is_err());
    }

    #[test]
    fn insert_without_check_rejects_existing_id() {
        let engine = open();
        put(&engine, 1, b"a");

        let mut ws = engine.begin_write().unwrap();
        let err = ws.put(1, 1, Bytes::from_static(b"b"), false).unwrap_err();
        assert_eq!(err.status, ObxStatus::IllegalState);
        ws.put(1, 1, Bytes::from_static(b"b"), true).unwrap();
        engine.commit(ws).unwrap();

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.table(1).unwrap()[&1], Bytes::from_static(b"b"));
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let engine = open();
        put(&engine, 1, b"a");
        let before = engine.snapshot().unwrap();

        put(&engine, 2, b"b");
        assert_eq!(before.table(1).unwrap().len(), 1);
        assert_eq!(engine.snapshot().unwrap().table(1).unwrap().len(), 2);
    }

    #[test]
    fn dropped_write_set_discards_changes() {
        let engine = open();
        {
            let mut ws = engine.begin_write().unwrap();
            ws.put(1, 1, Bytes::from_static(b"a"), false).unwrap();
        }
        assert!(engine.snapshot().unwrap().table(1).is_none());
    }

    #[test]
    fn remove_and_remove_all() {
        let engine = open();
        put(&engine, 1, b"a");
        put(&engine, 2, b"b");

        let mut ws = engine.begin_write().unwrap();
        assert_eq!(ws.remove(1, 9).unwrap_err().status, ObxStatus::NotFound);
        ws.remove(1, 1).unwrap();
        assert_eq!(ws.table(1).unwrap().len(), 1);
        assert_eq!(ws.remove_all(1), 1);
        engine.commit(ws).unwrap();

        assert!(engine.snapshot().unwrap().table(1).unwrap().is_empty());
    }

    #[test]
    fn async_puts_are_committed() {
        let engine = open();
        for id in 1..=50 {
            engine
                .put_async(1, id, Bytes::from_static(b"async"), false)
                .unwrap();
        }
        engine.await_async_completion().unwrap();
        assert_eq!(engine.snapshot().unwrap().table(1).unwrap().len(), 50);
    }

    #[test]
    fn async_queue_backpressure_while_writer_busy() {
        let engine = Engine::open(ObxStoreOptions {
            async_queue_capacity: 1,
            async_max_batch: 1,
            async_enqueue_timeout_ms: 200,
        })
        .unwrap();
        engine.register(1, "Note").unwrap();

        // The worker blocks on the writer lock while we hold it.
        let ws = engine.begin_write().unwrap();
        engine.put_async(1, 1, Bytes::from_static(b"a"), false).unwrap();
        engine.put_async(1, 2, Bytes::from_static(b"b"), false).unwrap();
        let err = engine
            .put_async(1, 3, Bytes::from_static(b"c"), false)
            .unwrap_err();
        assert_eq!(err.status, ObxStatus::AsyncQueueFull);

        drop(ws);
        engine.await_async_completion().unwrap();
        let snapshot = engine.snapshot().unwrap();
        let table = snapshot.table(1).unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn close_drains_queue_and_rejects_later_calls() {
        let engine = open();
        for id in 1..=20 {
            engine
                .put_async(1, id, Bytes::from_static(b"x"), false)
                .unwrap();
        }

        engine.close().unwrap();
        assert_eq!(engine.committed.read().table(1).unwrap().len(), 20);
        assert_eq!(engine.snapshot().unwrap_err().status, ObxStatus::Closed);
        assert_eq!(engine.close().unwrap_err().status, ObxStatus::Closed);
        assert_eq!(
            engine.id_for_put(1, 0).unwrap_err().status,
            ObxStatus::Closed
        );
    }
}
