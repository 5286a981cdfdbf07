//! Per-type box FFI functions.

use crate::engine::Engine;
use crate::error::{clear_last_error, report, to_status, EngineError, EngineResult, ObxStatus};
use crate::store::store_ref;
use crate::types::{ObxBox, ObxStore};
use bytes::Bytes;
use std::sync::Arc;

/// What an `ObxBox` pointer actually points to.
struct BoxHandle {
    engine: Arc<Engine>,
    type_id: u32,
}

unsafe fn box_ref<'a>(boxed: *mut ObxBox) -> EngineResult<&'a BoxHandle> {
    if boxed.is_null() {
        return Err(EngineError::closed("box handle is null (already closed?)"));
    }
    Ok(&*(boxed as *const BoxHandle))
}

/// Opens the box for a registered entity type.
///
/// # Safety
///
/// - `store` must be a valid store handle
/// - `out_box` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn obx_box_open(
    store: *mut ObxStore,
    type_id: u32,
    out_box: *mut *mut ObxBox,
) -> ObxStatus {
    clear_last_error();

    if out_box.is_null() {
        return report(EngineError::null_pointer());
    }
    let store = match store_ref(store) {
        Ok(store) => store,
        Err(e) => return report(e),
    };
    if let Err(e) = store.engine.check_type(type_id) {
        return report(e);
    }

    let handle = Box::new(BoxHandle {
        engine: Arc::clone(&store.engine),
        type_id,
    });
    *out_box = Box::into_raw(handle) as *mut ObxBox;
    ObxStatus::Success
}

/// Closes a box handle.
///
/// # Safety
///
/// The handle must have been returned by `obx_box_open` and must not be
/// used after this call. A null handle is reported as `Closed`.
#[no_mangle]
pub unsafe extern "C" fn obx_box_close(boxed: *mut ObxBox) -> ObxStatus {
    clear_last_error();

    if boxed.is_null() {
        return report(EngineError::closed("box handle is null (already closed?)"));
    }
    drop(Box::from_raw(boxed as *mut BoxHandle));
    ObxStatus::Success
}

/// Returns the ID to use for a put.
///
/// Passing `0` mints a new ID; a non-zero candidate is validated and
/// returned unchanged. Returns `0` on failure; see the last error.
///
/// # Safety
///
/// `boxed` must be a valid box handle.
#[no_mangle]
pub unsafe extern "C" fn obx_box_id_for_put(boxed: *mut ObxBox, candidate: u64) -> u64 {
    clear_last_error();

    let result = box_ref(boxed).and_then(|b| b.engine.id_for_put(b.type_id, candidate));
    match result {
        Ok(id) => id,
        Err(e) => {
            report(e);
            0
        }
    }
}

/// Enqueues a put for the async worker.
///
/// Returns once the item is queued, not once it is committed. If the queue
/// stays full for the configured enqueue timeout, returns `AsyncQueueFull`
/// and the item is not queued.
///
/// # Safety
///
/// - `boxed` must be a valid box handle
/// - `data` must be valid for `len` bytes
#[no_mangle]
pub unsafe extern "C" fn obx_box_put_async(
    boxed: *mut ObxBox,
    id: u64,
    data: *const u8,
    len: usize,
    check_previous: bool,
) -> ObxStatus {
    clear_last_error();

    let handle = match box_ref(boxed) {
        Ok(handle) => handle,
        Err(e) => return report(e),
    };
    if data.is_null() {
        return report(EngineError::null_pointer());
    }

    let payload = Bytes::copy_from_slice(std::slice::from_raw_parts(data, len));
    to_status(
        handle
            .engine
            .put_async(handle.type_id, id, payload, check_previous),
    )
}
