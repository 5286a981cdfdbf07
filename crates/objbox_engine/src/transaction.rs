//! Transaction and cursor FFI functions.

use crate::buffer::{ObxBytes, ObxBytesArray};
use crate::engine::{Engine, Snapshot, Table, WriteSet};
use crate::error::{clear_last_error, report, to_status, EngineError, EngineResult, ObxStatus};
use crate::store::store_ref;
use crate::types::{ObxCursor, ObxStore, ObxTxn};
use bytes::Bytes;
use std::ptr::NonNull;
use std::sync::Arc;

enum TxnMode {
    Read(Arc<Snapshot>),
    Write(WriteSet),
}

/// What an `ObxTxn` pointer actually points to.
struct TxnHandle {
    engine: Arc<Engine>,
    mode: TxnMode,
}

impl TxnHandle {
    fn table(&self, type_id: u32) -> Option<&Table> {
        match &self.mode {
            TxnMode::Read(snapshot) => snapshot.table(type_id),
            TxnMode::Write(write_set) => write_set.table(type_id),
        }
    }

    fn write_set(&mut self) -> EngineResult<&mut WriteSet> {
        match &mut self.mode {
            TxnMode::Read(_) => Err(EngineError::read_only()),
            TxnMode::Write(write_set) => Ok(write_set),
        }
    }
}

/// What an `ObxCursor` pointer actually points to.
struct CursorHandle {
    txn: NonNull<TxnHandle>,
    type_id: u32,
}

unsafe fn cursor_parts<'a>(cursor: *mut ObxCursor) -> EngineResult<(&'a mut TxnHandle, u32)> {
    if cursor.is_null() {
        return Err(EngineError::null_pointer());
    }
    let cursor = &*(cursor as *const CursorHandle);
    Ok((&mut *cursor.txn.as_ptr(), cursor.type_id))
}

unsafe fn write_out<T>(out: *mut T, value: T) -> EngineResult<()> {
    if out.is_null() {
        return Err(EngineError::null_pointer());
    }
    *out = value;
    Ok(())
}

/// Begins a transaction.
///
/// Write transactions are exclusive: this call blocks while another write
/// transaction (or an async batch) is in progress. Read transactions see a
/// snapshot of the data committed when they began.
///
/// # Safety
///
/// - `store` must be a valid store handle
/// - `out_txn` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn obx_txn_begin(
    store: *mut ObxStore,
    read_only: bool,
    out_txn: *mut *mut ObxTxn,
) -> ObxStatus {
    clear_last_error();

    if out_txn.is_null() {
        return report(EngineError::null_pointer());
    }
    let store = match store_ref(store) {
        Ok(store) => store,
        Err(e) => return report(e),
    };

    let mode = if read_only {
        store.engine.snapshot().map(TxnMode::Read)
    } else {
        store.engine.begin_write().map(TxnMode::Write)
    };

    match mode {
        Ok(mode) => {
            let txn = Box::new(TxnHandle {
                engine: Arc::clone(&store.engine),
                mode,
            });
            *out_txn = Box::into_raw(txn) as *mut ObxTxn;
            ObxStatus::Success
        }
        Err(e) => report(e),
    }
}

/// Commits a transaction. Read transactions are simply released.
///
/// # Safety
///
/// - `txn` must be a valid transaction handle whose cursors are closed
/// - `txn` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn obx_txn_commit(txn: *mut ObxTxn) -> ObxStatus {
    clear_last_error();

    if txn.is_null() {
        return report(EngineError::null_pointer());
    }

    let txn = Box::from_raw(txn as *mut TxnHandle);
    let TxnHandle { engine, mode } = *txn;
    match mode {
        TxnMode::Read(_) => ObxStatus::Success,
        TxnMode::Write(write_set) => to_status(engine.commit(write_set)),
    }
}

/// Aborts a transaction, discarding its changes.
///
/// # Safety
///
/// - `txn` must be a valid transaction handle whose cursors are closed
/// - `txn` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn obx_txn_abort(txn: *mut ObxTxn) -> ObxStatus {
    clear_last_error();

    if txn.is_null() {
        return report(EngineError::null_pointer());
    }

    drop(Box::from_raw(txn as *mut TxnHandle));
    ObxStatus::Success
}

/// Opens a cursor for one entity type inside a transaction.
///
/// # Safety
///
/// - `txn` must be a valid transaction handle
/// - `out_cursor` must be a valid pointer
/// - the cursor must be closed before the transaction ends
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_open(
    txn: *mut ObxTxn,
    type_id: u32,
    out_cursor: *mut *mut ObxCursor,
) -> ObxStatus {
    clear_last_error();

    if out_cursor.is_null() {
        return report(EngineError::null_pointer());
    }
    let Some(txn) = NonNull::new(txn as *mut TxnHandle) else {
        return report(EngineError::null_pointer());
    };
    if let Err(e) = txn.as_ref().engine.check_type(type_id) {
        return report(e);
    }

    let cursor = Box::new(CursorHandle { txn, type_id });
    *out_cursor = Box::into_raw(cursor) as *mut ObxCursor;
    ObxStatus::Success
}

/// Closes a cursor.
///
/// # Safety
///
/// `cursor` must be a valid cursor handle and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_close(cursor: *mut ObxCursor) -> ObxStatus {
    clear_last_error();

    if cursor.is_null() {
        return report(EngineError::null_pointer());
    }
    drop(Box::from_raw(cursor as *mut CursorHandle));
    ObxStatus::Success
}

/// Returns the ID to use for a put in this cursor's type; `0` on failure.
///
/// # Safety
///
/// `cursor` must be a valid cursor handle.
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_id_for_put(cursor: *mut ObxCursor, candidate: u64) -> u64 {
    clear_last_error();

    let result = cursor_parts(cursor)
        .and_then(|(txn, type_id)| txn.engine.id_for_put(type_id, candidate));
    match result {
        Ok(id) => id,
        Err(e) => {
            report(e);
            0
        }
    }
}

/// Puts an object.
///
/// `check_previous` must be true when the object may already exist; a put
/// without the check on an existing ID fails with `IllegalState`.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle of a write transaction
/// - `data` must be valid for `len` bytes
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_put(
    cursor: *mut ObxCursor,
    id: u64,
    data: *const u8,
    len: usize,
    check_previous: bool,
) -> ObxStatus {
    clear_last_error();

    if data.is_null() {
        return report(EngineError::null_pointer());
    }
    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        let payload = Bytes::copy_from_slice(std::slice::from_raw_parts(data, len));
        txn.write_set()?.put(type_id, id, payload, check_previous)
    });
    to_status(result)
}

/// Reads one object into `out_bytes`.
///
/// Returns `NotFound` if no object has this ID.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle
/// - `out_bytes` must be a valid pointer; free the result with `obx_bytes_free`
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_get(
    cursor: *mut ObxCursor,
    id: u64,
    out_bytes: *mut ObxBytes,
) -> ObxStatus {
    clear_last_error();

    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        let data = txn
            .table(type_id)
            .and_then(|table| table.get(&id))
            .ok_or_else(|| EngineError::not_found(format!("object {id} not found")))?;
        write_out(out_bytes, ObxBytes::from_vec(data.to_vec()))
    });
    to_status(result)
}

/// Reads all objects of the cursor's type, in ascending ID order.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle
/// - `out_array` must be a valid pointer; free the result with
///   `obx_bytes_array_free`
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_get_all(
    cursor: *mut ObxCursor,
    out_array: *mut ObxBytesArray,
) -> ObxStatus {
    clear_last_error();

    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        if out_array.is_null() {
            return Err(EngineError::null_pointer());
        }
        let items: Vec<Vec<u8>> = txn
            .table(type_id)
            .map(|table| table.values().map(|data| data.to_vec()).collect())
            .unwrap_or_default();
        write_out(out_array, ObxBytesArray::from_vecs(items))
    });
    to_status(result)
}

/// Checks whether an object with this ID exists.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle
/// - `out_contains` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_contains(
    cursor: *mut ObxCursor,
    id: u64,
    out_contains: *mut bool,
) -> ObxStatus {
    clear_last_error();

    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        let contains = txn
            .table(type_id)
            .is_some_and(|table| table.contains_key(&id));
        write_out(out_contains, contains)
    });
    to_status(result)
}

/// Counts the objects of the cursor's type.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle
/// - `out_count` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_count(cursor: *mut ObxCursor, out_count: *mut u64) -> ObxStatus {
    clear_last_error();

    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        let count = txn.table(type_id).map_or(0, |table| table.len() as u64);
        write_out(out_count, count)
    });
    to_status(result)
}

/// Removes one object; returns `NotFound` if absent.
///
/// # Safety
///
/// `cursor` must be a valid cursor handle of a write transaction.
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_remove(cursor: *mut ObxCursor, id: u64) -> ObxStatus {
    clear_last_error();

    let result =
        cursor_parts(cursor).and_then(|(txn, type_id)| txn.write_set()?.remove(type_id, id));
    to_status(result)
}

/// Removes every object of the cursor's type in one operation.
///
/// # Safety
///
/// - `cursor` must be a valid cursor handle of a write transaction
/// - `out_count` must be null or a valid pointer receiving the removed count
#[no_mangle]
pub unsafe extern "C" fn obx_cursor_remove_all(
    cursor: *mut ObxCursor,
    out_count: *mut u64,
) -> ObxStatus {
    clear_last_error();

    let result = cursor_parts(cursor).and_then(|(txn, type_id)| {
        let removed = txn.write_set()?.remove_all(type_id);
        if !out_count.is_null() {
            *out_count = removed;
        }
        Ok(())
    });
    to_status(result)
}
