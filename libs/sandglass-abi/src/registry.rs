// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Typed arenas backing the opaque handle tokens, and the per-thread
//! status cells attached to every arena entry.
//!
//! A handle is an index into one of these arenas, handed to callers as a
//! bare `u64` newtype with `0` reserved for null. Tokens are never reused
//! within a process run, so a destroyed handle stays detectably dead
//! instead of silently aliasing a newer object.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::status::{self, Status};

/// Client callback context, moved onto a producer thread as-is.
///
/// The pointer is opaque to this crate: never dereferenced, only handed
/// back to the client's own callback.
// Safety: cross-thread validity of the pointee is the registering
// caller's obligation, stated on every callback-registration function.
#[derive(Clone, Copy)]
pub(crate) struct SendPtr(pub(crate) *mut std::ffi::c_void);

unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

/// Last-status slot per calling thread.
///
/// Reading takes the calling thread's entry and resets it to [`OKAY`];
/// entries belonging to other threads are never observed or cleared. A
/// thread that never touched the object reads [`OKAY`].
///
/// [`OKAY`]: crate::status::OKAY
pub struct StatusCell {
    slots: Mutex<HashMap<ThreadId, Status>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Store `status` as the calling thread's last status and hand it
    /// back, for the record-and-return shape every operation uses.
    pub fn record(&self, status: Status) -> Status {
        self.slots.lock().insert(thread::current().id(), status);
        status
    }

    /// The side-effecting read behind `*_get_status`.
    pub fn take(&self) -> Status {
        self.slots
            .lock()
            .remove(&thread::current().id())
            .unwrap_or(status::OKAY)
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// One arena entry: the object plus its status cell.
pub struct Slot<T> {
    pub object: T,
    pub status: StatusCell,
}

/// A typed arena of live entries.
pub struct HandleMap<T> {
    slots: Mutex<HashMap<u64, Arc<Slot<T>>>>,
    next: AtomicU64,
}

impl<T> HandleMap<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            // Zero is the null token.
            next: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, object: T) -> u64 {
        let token = self.next.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().insert(
            token,
            Arc::new(Slot {
                object,
                status: StatusCell::new(),
            }),
        );
        token
    }

    /// Fetch a live entry. The arena lock is released before the entry is
    /// used, so a long-running operation (a blocking poll, a client
    /// callback) never stalls other handles.
    pub fn get(&self, token: u64) -> Option<Arc<Slot<T>>> {
        self.slots.lock().get(&token).cloned()
    }

    pub fn remove(&self, token: u64) -> Option<Arc<Slot<T>>> {
        self.slots.lock().remove(&token)
    }

    /// The `*_get_status` read: the calling thread's last status for this
    /// entry, cleared on read; [`status::NULL_OBJECT`] for a dead or null
    /// token.
    pub fn take_status(&self, token: u64) -> Status {
        match self.get(token) {
            Some(slot) => slot.status.take(),
            None => status::NULL_OBJECT,
        }
    }

    /// The shape of every non-destroy operation: run `f` against a live
    /// entry behind the failure boundary, record the resulting status in
    /// the calling thread's cell, and return it. A dead or null token
    /// reports [`status::NULL_OBJECT`] without recording — there is no
    /// cell left to record into.
    pub fn with_entry(&self, token: u64, f: impl FnOnce(&T) -> Status) -> Status {
        let Some(slot) = self.get(token) else {
            return status::NULL_OBJECT;
        };
        let status = crate::guarded(|| f(&slot.object));
        slot.status.record(status)
    }

    /// The destroy half of a handle pair. Dropping the entry tears the
    /// object down; a second destroy finds the token gone and reports it.
    pub fn destroy(&self, token: u64) -> Status {
        match self.remove(token) {
            Some(slot) => teardown(move || drop(slot)),
            None => status::DELETE_OF_NULL_HANDLE,
        }
    }
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a teardown action, reporting a panic during it as
/// [`status::DELETION_FAILED`] rather than [`status::INTERNAL_PANIC`]:
/// the object is already out of the arena either way.
pub(crate) fn teardown(f: impl FnOnce()) -> Status {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(()) => status::OKAY,
        Err(_) => {
            tracing::error!("panic during handle teardown, converted to status");
            status::DELETION_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cells_are_partitioned_per_thread() {
        let cell = Arc::new(StatusCell::new());
        cell.record(status::BAD_PARAMETER);

        let other = Arc::clone(&cell);
        std::thread::spawn(move || {
            // A thread that never recorded reads OKAY, and its read must
            // not clear the first thread's entry.
            assert_eq!(other.take(), status::OKAY);
            other.record(status::TIMEOUT);
        })
        .join()
        .expect("status thread");

        assert_eq!(cell.take(), status::BAD_PARAMETER);
        assert_eq!(cell.take(), status::OKAY);
    }

    #[test]
    fn tokens_are_never_reused() {
        let map = HandleMap::new();
        let first = map.insert("a");
        assert_eq!(map.destroy(first), status::OKAY);
        let second = map.insert("b");
        assert_ne!(first, second);
        assert!(map.get(first).is_none());
    }

    #[test]
    fn double_destroy_is_reported_not_fatal() {
        let map = HandleMap::new();
        let token = map.insert(());
        assert_eq!(map.destroy(token), status::OKAY);
        assert_eq!(map.destroy(token), status::DELETE_OF_NULL_HANDLE);
        assert_eq!(map.destroy(0), status::DELETE_OF_NULL_HANDLE);
    }

    #[test]
    fn with_entry_records_and_returns() {
        let map = HandleMap::new();
        let token = map.insert(5u32);
        assert_eq!(
            map.with_entry(token, |n| {
                assert_eq!(*n, 5);
                status::TIMEOUT
            }),
            status::TIMEOUT
        );
        assert_eq!(map.take_status(token), status::TIMEOUT);
        assert_eq!(map.take_status(token), status::OKAY);
    }

    #[test]
    fn operations_on_dead_tokens_report_null_object() {
        let map = HandleMap::<u32>::new();
        assert_eq!(map.with_entry(99, |_| status::OKAY), status::NULL_OBJECT);
        assert_eq!(map.take_status(99), status::NULL_OBJECT);
    }

    #[test]
    fn panics_inside_operations_become_statuses() {
        let map = HandleMap::new();
        let token = map.insert(());
        assert_eq!(
            map.with_entry(token, |_| panic!("implementation bug")),
            status::INTERNAL_PANIC
        );
        // The converted status is still recorded for the calling thread.
        assert_eq!(map.take_status(token), status::INTERNAL_PANIC);
    }
}
