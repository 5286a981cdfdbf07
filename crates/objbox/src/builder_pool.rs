//! A pool of one reusable builder.
//!
//! Each box owns one [`SharedBuilder`] for its async put path. Claiming it
//! never waits: a caller that loses the race gets a transient builder
//! instead, used once and dropped.

use objbox_flat::{FlatBuilder, DEFAULT_CAPACITY};
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

pub(crate) struct SharedBuilder {
    builder: UnsafeCell<FlatBuilder>,
    in_use: AtomicBool,
}

// SAFETY: the builder is only reachable through a `BuilderLease::Shared`,
// and at most one exists at a time because it is handed out only after a
// successful compare-exchange of `in_use` from false to true.
unsafe impl Sync for SharedBuilder {}

impl SharedBuilder {
    pub(crate) fn new() -> Self {
        Self {
            builder: UnsafeCell::new(FlatBuilder::with_capacity(DEFAULT_CAPACITY)),
            in_use: AtomicBool::new(false),
        }
    }

    /// Claims the shared builder, or allocates a transient one if it is taken.
    pub(crate) fn acquire(&self) -> BuilderLease<'_> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            BuilderLease::Shared(self)
        } else {
            trace!("shared builder in use, allocating a transient one");
            BuilderLease::Transient(FlatBuilder::with_capacity(DEFAULT_CAPACITY))
        }
    }

    #[cfg(test)]
    fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

/// A builder borrowed for one put.
///
/// Dropping a shared lease resets the builder and releases the claim, so
/// every exit path of the put leaves the shared builder clean.
pub(crate) enum BuilderLease<'a> {
    Shared(&'a SharedBuilder),
    Transient(FlatBuilder),
}

impl BuilderLease<'_> {
    #[cfg(test)]
    fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl Deref for BuilderLease<'_> {
    type Target = FlatBuilder;

    fn deref(&self) -> &FlatBuilder {
        match self {
            // SAFETY: this lease holds the claim, see `SharedBuilder`.
            Self::Shared(shared) => unsafe { &*shared.builder.get() },
            Self::Transient(builder) => builder,
        }
    }
}

impl DerefMut for BuilderLease<'_> {
    fn deref_mut(&mut self) -> &mut FlatBuilder {
        match self {
            // SAFETY: this lease holds the claim, see `SharedBuilder`.
            Self::Shared(shared) => unsafe { &mut *shared.builder.get() },
            Self::Transient(builder) => builder,
        }
    }
}

impl Drop for BuilderLease<'_> {
    fn drop(&mut self) {
        if let Self::Shared(shared) = self {
            // SAFETY: the claim is still held until the store below.
            unsafe { (*shared.builder.get()).reset() };
            shared.in_use.store(false, Ordering::Release);
        }
    }
}
