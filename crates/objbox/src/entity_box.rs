//! Typed CRUD facade for one entity type.

use crate::binding::EntityBinding;
use crate::builder_pool::SharedBuilder;
use crate::cursor::Cursor;
use crate::error::{check, last_error, ObxError, ObxResult};
use crate::store::StoreCore;
use crate::transaction::run_with_cursor;
use crate::types::EntityTypeId;
use objbox_engine::{
    obx_box_close, obx_box_id_for_put, obx_box_open, obx_box_put_async, ObxBox, ObxStatus,
};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owned engine box handle.
struct BoxHandle(NonNull<ObxBox>);

// SAFETY: engine box handles may be used from any thread; the handle is only
// freed under the write lock of `BoxCore::handle`.
unsafe impl Send for BoxHandle {}
unsafe impl Sync for BoxHandle {}

/// State shared by every [`EntityBox`] of one entity type.
pub(crate) struct BoxCore {
    handle: RwLock<Option<BoxHandle>>,
    builder: SharedBuilder,
    type_id: EntityTypeId,
}

impl BoxCore {
    pub(crate) fn open(store: &StoreCore, type_id: EntityTypeId) -> ObxResult<Self> {
        let store_handle = store.open_handle()?;
        let mut raw: *mut ObxBox = std::ptr::null_mut();
        check(unsafe { obx_box_open(store_handle.as_ptr(), type_id.as_u32(), &mut raw) })?;
        let handle = NonNull::new(raw)
            .ok_or_else(|| ObxError::binding("engine returned a null box handle"))?;
        Ok(Self {
            handle: RwLock::new(Some(BoxHandle(handle))),
            builder: SharedBuilder::new(),
            type_id,
        })
    }

    pub(crate) fn type_id(&self) -> EntityTypeId {
        self.type_id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.read().is_none()
    }

    /// Returns the open handle, held for the duration of one operation.
    fn open_handle(&self) -> ObxResult<MappedRwLockReadGuard<'_, BoxHandle>> {
        RwLockReadGuard::try_map(self.handle.read(), Option::as_ref)
            .map_err(|_| ObxError::closed(format!("box for {} is closed", self.type_id)))
    }

    pub(crate) fn close(&self) -> ObxResult<()> {
        let handle = self
            .handle
            .write()
            .take()
            .ok_or_else(|| ObxError::closed(format!("box for {} is already closed", self.type_id)))?;
        check(unsafe { obx_box_close(handle.0.as_ptr()) })?;
        debug!(type_id = %self.type_id, "box closed");
        Ok(())
    }
}

impl Drop for BoxCore {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            let status = unsafe { obx_box_close(handle.0.as_ptr()) };
            if status.is_err() {
                warn!(type_id = %self.type_id, ?status, "box close on drop failed");
            }
        }
    }
}

/// A box: CRUD access to the objects of entity type `T`.
///
/// Obtained from [`ObjectBox::box_for`](crate::ObjectBox::box_for). Cloning
/// is cheap and clones share the same engine handle. Every synchronous
/// operation runs in its own transaction; [`put_async`](Self::put_async)
/// hands the object to the engine's async queue instead.
///
/// After [`close`](Self::close), every operation (including a second
/// `close`) fails with [`ObxError::Closed`].
pub struct EntityBox<T: EntityBinding> {
    store: Arc<StoreCore>,
    core: Arc<BoxCore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntityBinding> EntityBox<T> {
    pub(crate) fn new(store: Arc<StoreCore>, core: Arc<BoxCore>) -> Self {
        Self {
            store,
            core,
            _marker: PhantomData,
        }
    }

    /// Returns the entity type this box stores.
    pub fn type_id(&self) -> EntityTypeId {
        self.core.type_id
    }

    fn run<R>(
        &self,
        read_only: bool,
        work: impl FnOnce(&mut Cursor<'_>) -> ObxResult<R>,
    ) -> ObxResult<R> {
        let _open = self.core.open_handle()?;
        run_with_cursor(&self.store, self.core.type_id, read_only, work)
    }

    /// Puts an object and returns its ID.
    ///
    /// An object with ID 0 is inserted under a newly assigned ID, which is
    /// written back into the object. Any other ID replaces the stored object
    /// with that ID, or inserts it if there is none.
    pub fn put(&self, object: &mut T) -> ObxResult<u64> {
        let id = self.run(false, |cursor| cursor.put(&*object))?;
        object.set_id(id);
        Ok(id)
    }

    /// Puts all objects in one transaction and returns their IDs in order.
    ///
    /// Either every object is stored or none is. IDs are written back into
    /// the objects only after the transaction commits. An empty slice does
    /// not touch the engine.
    pub fn put_all(&self, objects: &mut [T]) -> ObxResult<Vec<u64>> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.run(false, |cursor| {
            objects
                .iter()
                .map(|object| cursor.put(object))
                .collect::<ObxResult<Vec<u64>>>()
        })?;

        for (object, id) in objects.iter_mut().zip(&ids) {
            object.set_id(*id);
        }
        Ok(ids)
    }

    /// Puts an object through the engine's async queue and returns its ID.
    ///
    /// Returns once the object is queued; it becomes visible to reads after
    /// the engine commits the batch containing it, which
    /// [`ObjectBox::await_async_completion`](crate::ObjectBox::await_async_completion)
    /// waits for. If the queue stays full for the configured enqueue timeout
    /// the put fails with [`ObxError::AsyncBackpressure`].
    pub fn put_async(&self, object: &mut T) -> ObxResult<u64> {
        let handle = self.core.open_handle()?;
        let current = object.id()?;
        let id = match unsafe { obx_box_id_for_put(handle.0.as_ptr(), current) } {
            0 => return Err(last_error(ObxStatus::Error)),
            id => id,
        };

        let mut builder = self.core.builder.acquire();
        object.flatten(&mut builder, id)?;
        let root = builder.end_object()?;
        builder.finish(root)?;
        let bytes = builder.finished_bytes()?;
        check(unsafe {
            obx_box_put_async(handle.0.as_ptr(), id, bytes.as_ptr(), bytes.len(), current != 0)
        })?;
        drop(builder);

        object.set_id(id);
        Ok(id)
    }

    /// Gets an object by ID; `None` if it does not exist.
    pub fn get(&self, id: u64) -> ObxResult<Option<T>> {
        self.run(true, |cursor| cursor.get(id))
    }

    /// Gets all objects of this type.
    pub fn get_all(&self) -> ObxResult<Vec<T>> {
        self.run(true, |cursor| cursor.get_all())
    }

    /// Checks whether an object with this ID exists.
    pub fn contains(&self, id: u64) -> ObxResult<bool> {
        self.run(true, |cursor| cursor.contains(id))
    }

    /// Returns the number of stored objects.
    pub fn count(&self) -> ObxResult<u64> {
        self.run(true, |cursor| cursor.count())
    }

    /// Removes an object; fails with [`ObxError::NotFound`] if absent.
    pub fn remove(&self, id: u64) -> ObxResult<()> {
        self.run(false, |cursor| cursor.remove(id))
    }

    /// Removes all objects of this type.
    pub fn remove_all(&self) -> ObxResult<()> {
        let removed = self.run(false, |cursor| cursor.remove_all())?;
        debug!(type_id = %self.core.type_id, removed, "removed all objects");
        Ok(())
    }

    /// Closes the box, releasing its engine handle.
    ///
    /// Closes every clone of this box. [`ObjectBox::box_for`](crate::ObjectBox::box_for)
    /// opens a fresh one afterwards.
    pub fn close(&self) -> ObxResult<()> {
        self.core.close()
    }

    /// Returns true once the box is closed.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl<T: EntityBinding> Clone for EntityBox<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.store), Arc::clone(&self.core))
    }
}

impl<T: EntityBinding> fmt::Debug for EntityBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBox")
            .field("entity", &T::ENTITY_NAME)
            .field("type_id", &self.core.type_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
