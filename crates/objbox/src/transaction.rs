//! Transactions and the cursor runner.

use crate::cursor::Cursor;
use crate::error::{check, ObxError, ObxResult};
use crate::store::{StoreCore, StoreHandle};
use crate::types::EntityTypeId;
use objbox_engine::{obx_txn_abort, obx_txn_begin, obx_txn_commit, ObxTxn};
use parking_lot::MappedRwLockReadGuard;
use std::ptr::NonNull;
use tracing::warn;

/// An engine transaction.
///
/// Holds the store open for its whole lifetime. Dropping a transaction that
/// was not committed aborts it.
pub(crate) struct Transaction<'s> {
    _store: MappedRwLockReadGuard<'s, StoreHandle>,
    handle: Option<NonNull<ObxTxn>>,
}

impl<'s> Transaction<'s> {
    /// Begins a transaction; write transactions wait for the single writer slot.
    pub(crate) fn begin(store: &'s StoreCore, read_only: bool) -> ObxResult<Self> {
        let guard = store.open_handle()?;
        let mut raw: *mut ObxTxn = std::ptr::null_mut();
        check(unsafe { obx_txn_begin(guard.as_ptr(), read_only, &mut raw) })?;
        let handle = NonNull::new(raw)
            .ok_or_else(|| ObxError::binding("engine returned a null transaction handle"))?;
        Ok(Self {
            _store: guard,
            handle: Some(handle),
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut ObxTxn {
        self.handle.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Commits the transaction. Read transactions are just released.
    pub(crate) fn commit(mut self) -> ObxResult<()> {
        match self.handle.take() {
            Some(handle) => check(unsafe { obx_txn_commit(handle.as_ptr()) }),
            None => Ok(()),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let status = unsafe { obx_txn_abort(handle.as_ptr()) };
            if status.is_err() {
                warn!(?status, "transaction abort failed");
            }
        }
    }
}

/// Runs `work` with a cursor for `type_id` inside a fresh transaction.
///
/// Commits when `work` succeeds and returns its value. Aborts and returns the
/// error unchanged when it fails. If the transaction or cursor cannot be
/// opened, `work` is never called.
pub(crate) fn run_with_cursor<R>(
    store: &StoreCore,
    type_id: EntityTypeId,
    read_only: bool,
    work: impl FnOnce(&mut Cursor<'_>) -> ObxResult<R>,
) -> ObxResult<R> {
    let txn = Transaction::begin(store, read_only)?;
    let result = {
        let mut cursor = Cursor::open(&txn, type_id)?;
        work(&mut cursor)
    };
    match result {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(e) => {
            drop(txn);
            Err(e)
        }
    }
}
