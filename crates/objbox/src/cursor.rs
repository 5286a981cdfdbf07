//! Cursor bound to one entity type inside a transaction.

use crate::binding::EntityBinding;
use crate::error::{check, last_error, ObxError, ObxResult};
use crate::transaction::Transaction;
use crate::types::EntityTypeId;
use objbox_engine::{
    obx_bytes_array_free, obx_bytes_free, obx_cursor_close, obx_cursor_contains,
    obx_cursor_count, obx_cursor_get, obx_cursor_get_all, obx_cursor_id_for_put,
    obx_cursor_open, obx_cursor_put, obx_cursor_remove, obx_cursor_remove_all, ObxBytes,
    ObxBytesArray, ObxCursor, ObxStatus,
};
use objbox_flat::{FlatBuilder, DEFAULT_CAPACITY};
use std::marker::PhantomData;
use std::ptr::NonNull;
use tracing::warn;

/// Low-level access to one entity type's objects within a transaction.
///
/// The cursor borrows its transaction, so it is always closed before the
/// transaction commits or aborts.
pub(crate) struct Cursor<'txn> {
    handle: NonNull<ObxCursor>,
    type_id: EntityTypeId,
    builder: FlatBuilder,
    _txn: PhantomData<&'txn ()>,
}

impl<'txn> Cursor<'txn> {
    pub(crate) fn open(txn: &'txn Transaction<'_>, type_id: EntityTypeId) -> ObxResult<Self> {
        let mut raw: *mut ObxCursor = std::ptr::null_mut();
        check(unsafe { obx_cursor_open(txn.as_ptr(), type_id.as_u32(), &mut raw) })?;
        let handle = NonNull::new(raw)
            .ok_or_else(|| ObxError::binding("engine returned a null cursor handle"))?;
        Ok(Self {
            handle,
            type_id,
            builder: FlatBuilder::with_capacity(DEFAULT_CAPACITY),
            _txn: PhantomData,
        })
    }

    /// Returns the ID to store an object under; `candidate == 0` mints one.
    pub(crate) fn id_for_put(&mut self, candidate: u64) -> ObxResult<u64> {
        match unsafe { obx_cursor_id_for_put(self.handle.as_ptr(), candidate) } {
            0 => Err(last_error(ObxStatus::Error)),
            id => Ok(id),
        }
    }

    /// Puts an object and returns its ID.
    ///
    /// An object with ID 0 is inserted under a new ID; any other ID is an
    /// upsert.
    pub(crate) fn put<T: EntityBinding>(&mut self, object: &T) -> ObxResult<u64> {
        let current = object.id()?;
        let id = self.id_for_put(current)?;
        let result = self.put_flattened(object, id, current != 0);
        self.builder.reset();
        result.map(|()| id)
    }

    fn put_flattened<T: EntityBinding>(
        &mut self,
        object: &T,
        id: u64,
        check_previous: bool,
    ) -> ObxResult<()> {
        object.flatten(&mut self.builder, id)?;
        let root = self.builder.end_object()?;
        self.builder.finish(root)?;

        let handle = self.handle.as_ptr();
        let bytes = self.builder.finished_bytes()?;
        check(unsafe { obx_cursor_put(handle, id, bytes.as_ptr(), bytes.len(), check_previous) })
    }

    /// Reads one object; `None` if absent.
    pub(crate) fn get<T: EntityBinding>(&mut self, id: u64) -> ObxResult<Option<T>> {
        let mut out = ObxBytes::empty();
        let status = unsafe { obx_cursor_get(self.handle.as_ptr(), id, &mut out) };
        if status == ObxStatus::NotFound {
            return Ok(None);
        }
        check(status)?;

        let object = T::load(unsafe { out.as_slice() });
        unsafe { obx_bytes_free(out) };
        object.map(Some)
    }

    /// Reads every object of this cursor's type.
    pub(crate) fn get_all<T: EntityBinding>(&mut self) -> ObxResult<Vec<T>> {
        let mut out = ObxBytesArray::empty();
        check(unsafe { obx_cursor_get_all(self.handle.as_ptr(), &mut out) })?;

        let objects = unsafe { out.as_slice() }
            .iter()
            .map(|bytes| T::load(unsafe { bytes.as_slice() }))
            .collect();
        unsafe { obx_bytes_array_free(out) };
        objects
    }

    pub(crate) fn contains(&mut self, id: u64) -> ObxResult<bool> {
        let mut contains = false;
        check(unsafe { obx_cursor_contains(self.handle.as_ptr(), id, &mut contains) })?;
        Ok(contains)
    }

    /// Removes one object; absent IDs are [`ObxError::NotFound`](crate::ObxError::NotFound).
    pub(crate) fn remove(&mut self, id: u64) -> ObxResult<()> {
        check(unsafe { obx_cursor_remove(self.handle.as_ptr(), id) })
    }

    /// Removes every object of this cursor's type; returns how many.
    pub(crate) fn remove_all(&mut self) -> ObxResult<u64> {
        let mut removed = 0;
        check(unsafe { obx_cursor_remove_all(self.handle.as_ptr(), &mut removed) })?;
        Ok(removed)
    }

    pub(crate) fn count(&mut self) -> ObxResult<u64> {
        let mut count = 0;
        check(unsafe { obx_cursor_count(self.handle.as_ptr(), &mut count) })?;
        Ok(count)
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        let status = unsafe { obx_cursor_close(self.handle.as_ptr()) };
        if status.is_err() {
            warn!(type_id = %self.type_id, ?status, "cursor close failed");
        }
    }
}
