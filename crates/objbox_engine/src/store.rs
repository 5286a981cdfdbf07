//! Store FFI functions.

use crate::engine::Engine;
use crate::error::{clear_last_error, report, to_status, EngineError, EngineResult, ObxStatus};
use crate::types::{ObxStore, ObxStoreOptions};
use std::ffi::{c_char, CStr};
use std::sync::Arc;

/// What an `ObxStore` pointer actually points to.
pub(crate) struct StoreHandle {
    pub(crate) engine: Arc<Engine>,
}

/// Reborrows a store handle.
///
/// # Safety
///
/// `store` must be null or a live handle returned by `obx_store_open`.
pub(crate) unsafe fn store_ref<'a>(store: *mut ObxStore) -> EngineResult<&'a StoreHandle> {
    if store.is_null() {
        return Err(EngineError::null_pointer());
    }
    Ok(&*(store as *const StoreHandle))
}

/// Returns the default store options.
#[no_mangle]
pub extern "C" fn obx_store_options_default() -> ObxStoreOptions {
    ObxStoreOptions::default()
}

/// Opens a store.
///
/// # Arguments
///
/// * `options` - Store options, or null for defaults
/// * `out_store` - Output pointer for the store handle
///
/// # Safety
///
/// - `options` must be null or point to valid options
/// - `out_store` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn obx_store_open(
    options: *const ObxStoreOptions,
    out_store: *mut *mut ObxStore,
) -> ObxStatus {
    clear_last_error();

    if out_store.is_null() {
        return report(EngineError::null_pointer());
    }

    let options = if options.is_null() {
        ObxStoreOptions::default()
    } else {
        *options
    };

    match Engine::open(options) {
        Ok(engine) => {
            let handle = Box::new(StoreHandle { engine });
            *out_store = Box::into_raw(handle) as *mut ObxStore;
            ObxStatus::Success
        }
        Err(e) => report(e),
    }
}

/// Closes a store, draining pending async puts first.
///
/// Box handles opened from this store stay valid to close but every other
/// operation on them fails with `Closed`.
///
/// # Safety
///
/// The handle must have been returned by `obx_store_open` and must not be
/// used after this call.
#[no_mangle]
pub unsafe extern "C" fn obx_store_close(store: *mut ObxStore) -> ObxStatus {
    clear_last_error();

    if store.is_null() {
        return report(EngineError::null_pointer());
    }

    let handle = Box::from_raw(store as *mut StoreHandle);
    to_status(handle.engine.close())
}

/// Registers an entity type with the store.
///
/// # Safety
///
/// - `store` must be a valid store handle
/// - `name` must be a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn obx_store_register_entity(
    store: *mut ObxStore,
    type_id: u32,
    name: *const c_char,
) -> ObxStatus {
    clear_last_error();

    let handle = match store_ref(store) {
        Ok(handle) => handle,
        Err(e) => return report(e),
    };
    if name.is_null() {
        return report(EngineError::null_pointer());
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return report(EngineError::illegal_argument("invalid UTF-8 in entity name"));
    };

    to_status(handle.engine.register(type_id, name))
}

/// Blocks until every async put enqueued so far has been committed.
///
/// # Safety
///
/// `store` must be a valid store handle.
#[no_mangle]
pub unsafe extern "C" fn obx_store_await_async_completion(store: *mut ObxStore) -> ObxStatus {
    clear_last_error();

    match store_ref(store) {
        Ok(handle) => to_status(handle.engine.await_async_completion()),
        Err(e) => report(e),
    }
}
