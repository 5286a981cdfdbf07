//! The store owner.

use crate::binding::EntityBinding;
use crate::config::Config;
use crate::entity_box::{BoxCore, EntityBox};
use crate::error::{check, ObxError, ObxResult};
use crate::types::EntityTypeId;
use objbox_engine::{
    obx_store_await_async_completion, obx_store_close, obx_store_open,
    obx_store_register_entity, ObxStore,
};
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owned engine store handle.
pub(crate) struct StoreHandle(NonNull<ObxStore>);

// SAFETY: the engine store is internally synchronized; the handle is only
// freed under the write lock of `StoreCore::handle`.
unsafe impl Send for StoreHandle {}
unsafe impl Sync for StoreHandle {}

impl StoreHandle {
    pub(crate) fn as_ptr(&self) -> *mut ObxStore {
        self.0.as_ptr()
    }
}

/// The engine store shared by the owner and every box.
///
/// Engine calls hold a read guard on `handle`; closing takes the write guard,
/// so the handle is never freed under an in-flight call.
pub(crate) struct StoreCore {
    handle: RwLock<Option<StoreHandle>>,
}

impl StoreCore {
    pub(crate) fn open(config: &Config) -> ObxResult<Self> {
        let options = config.to_store_options();
        let mut raw: *mut ObxStore = std::ptr::null_mut();
        check(unsafe { obx_store_open(&options, &mut raw) })?;
        let handle = NonNull::new(raw)
            .ok_or_else(|| ObxError::binding("engine returned a null store handle"))?;
        Ok(Self {
            handle: RwLock::new(Some(StoreHandle(handle))),
        })
    }

    pub(crate) fn open_handle(&self) -> ObxResult<MappedRwLockReadGuard<'_, StoreHandle>> {
        RwLockReadGuard::try_map(self.handle.read(), Option::as_ref)
            .map_err(|_| ObxError::closed("store is closed"))
    }

    pub(crate) fn register(&self, type_id: EntityTypeId, name: &str) -> ObxResult<()> {
        let name = CString::new(name)
            .map_err(|_| ObxError::binding(format!("entity name {name:?} contains a NUL byte")))?;
        let handle = self.open_handle()?;
        check(unsafe { obx_store_register_entity(handle.as_ptr(), type_id.as_u32(), name.as_ptr()) })
    }

    pub(crate) fn await_async_completion(&self) -> ObxResult<()> {
        let handle = self.open_handle()?;
        check(unsafe { obx_store_await_async_completion(handle.as_ptr()) })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.read().is_none()
    }

    /// Closes the engine store; pending async puts are committed first.
    pub(crate) fn close(&self) -> ObxResult<()> {
        let handle = self
            .handle
            .write()
            .take()
            .ok_or_else(|| ObxError::closed("store is already closed"))?;
        check(unsafe { obx_store_close(handle.as_ptr()) })
    }
}

impl Drop for StoreCore {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            let status = unsafe { obx_store_close(handle.as_ptr()) };
            if status.is_err() {
                warn!(?status, "store close on drop failed");
            }
        }
    }
}

/// An open object store: registers entity types and hands out their boxes.
///
/// # Example
///
/// ```rust,ignore
/// let ob = ObjectBox::builder()
///     .register::<Note>()
///     .config(Config::new().async_queue_capacity(4096))
///     .build()?;
///
/// let notes = ob.box_for::<Note>()?;
/// let id = notes.put(&mut Note::new("hello"))?;
/// assert!(notes.get(id)?.is_some());
///
/// ob.close()?;
/// ```
pub struct ObjectBox {
    core: Arc<StoreCore>,
    boxes: Mutex<HashMap<EntityTypeId, Arc<BoxCore>>>,
}

impl ObjectBox {
    /// Starts building a store.
    pub fn builder() -> ObjectBoxBuilder {
        ObjectBoxBuilder::default()
    }

    /// Returns the box for `T`.
    ///
    /// Boxes are cached per entity type; a box that was closed by the caller
    /// is reopened.
    pub fn box_for<T: EntityBinding>(&self) -> ObxResult<EntityBox<T>> {
        let mut boxes = self.boxes.lock();
        if let Some(core) = boxes.get(&T::ENTITY_TYPE_ID) {
            if !core.is_closed() {
                return Ok(EntityBox::new(Arc::clone(&self.core), Arc::clone(core)));
            }
        }

        let core = Arc::new(BoxCore::open(&self.core, T::ENTITY_TYPE_ID)?);
        boxes.insert(T::ENTITY_TYPE_ID, Arc::clone(&core));
        debug!(type_id = %T::ENTITY_TYPE_ID, name = T::ENTITY_NAME, "box opened");
        Ok(EntityBox::new(Arc::clone(&self.core), core))
    }

    /// Blocks until every async put issued so far has been committed.
    pub fn await_async_completion(&self) -> ObxResult<()> {
        self.core.await_async_completion()
    }

    /// Returns true once the store is closed.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Closes every box opened through this store, then the store itself.
    ///
    /// Pending async puts are committed before the store closes. Boxes still
    /// held by the caller report [`ObxError::Closed`] afterwards.
    pub fn close(&self) -> ObxResult<()> {
        // Held until the store is closed so `box_for` cannot open a box
        // that outlives shutdown.
        let mut boxes = self.boxes.lock();
        if self.core.is_closed() {
            return Err(ObxError::closed("store is already closed"));
        }

        for (_, core) in boxes.drain() {
            if let Err(e) = core.close() {
                if !e.is_closed() {
                    warn!(type_id = %core.type_id(), error = %e, "box close failed");
                }
            }
        }

        self.core.close()?;
        debug!("store closed");
        Ok(())
    }
}

impl Drop for ObjectBox {
    fn drop(&mut self) {
        if !self.core.is_closed() {
            if let Err(e) = self.close() {
                warn!(error = %e, "store close on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for ObjectBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBox")
            .field("closed", &self.is_closed())
            .field("boxes", &self.boxes.lock().len())
            .finish()
    }
}

/// Builder for [`ObjectBox`].
#[derive(Debug, Default)]
pub struct ObjectBoxBuilder {
    config: Config,
    entities: Vec<(EntityTypeId, &'static str)>,
}

impl ObjectBoxBuilder {
    /// Registers entity type `T` with the store.
    #[must_use]
    pub fn register<T: EntityBinding>(mut self) -> Self {
        self.entities.push((T::ENTITY_TYPE_ID, T::ENTITY_NAME));
        self
    }

    /// Sets the store configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Opens the store and registers every entity type.
    pub fn build(self) -> ObxResult<ObjectBox> {
        let core = StoreCore::open(&self.config)?;
        for (type_id, name) in &self.entities {
            core.register(*type_id, name)?;
        }
        debug!(
            entities = self.entities.len(),
            queue_capacity = self.config.async_queue_capacity,
            "store opened"
        );
        Ok(ObjectBox {
            core: Arc::new(core),
            boxes: Mutex::new(HashMap::new()),
        })
    }
}
