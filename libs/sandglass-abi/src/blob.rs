// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handle pair, foreign-buffer wrapping, and the release contract for
//! data blob records.
//!
//! A blob record is cheap to copy: copies share one payload lineage and
//! only the first release across the whole lineage runs the deleter.
//! Destroying a record does NOT release its payload; the two operations
//! are deliberately decoupled so records can be handed between layers
//! while exactly one release happens.

use std::ffi::c_void;
use std::sync::LazyLock;

use parking_lot::Mutex;

use sandglass::blob::{BlobBacking, DataBlob};
use sandglass::time::Timestamp;

use crate::registry::HandleMap;
use crate::status::{self, Status};

/// Opaque token for one blob record. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct BlobHandle(pub u64);

impl BlobHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Producer-supplied cleanup for a foreign payload buffer. Runs at most
/// once per lineage, on whichever thread performs the winning release.
pub type BlobDeleter = extern "C" fn(user_data: *mut c_void, data: *const u8);

pub(crate) static BLOBS: LazyLock<HandleMap<Mutex<DataBlob>>> = LazyLock::new(HandleMap::new);

/// A borrowed `{pointer, length, deleter}` tuple from the far side of the
/// boundary, adapted to the typed payload contract. The bytes are never
/// copied; dropping the backing runs the deleter.
struct ForeignBacking {
    data: *const u8,
    len: u32,
    deleter: Option<BlobDeleter>,
    user_data: *mut c_void,
}

// Safety: the blob_set_data contract requires the buffer and deleter to
// be usable from whichever thread ends up holding the last record of the
// lineage.
unsafe impl Send for ForeignBacking {}

impl BlobBacking for ForeignBacking {
    fn bytes(&self) -> &[u8] {
        if self.data.is_null() || self.len == 0 {
            return &[];
        }
        // Safety: blob_set_data's contract keeps `data..data+len`
        // readable until the deleter runs, and release clears the backing
        // before that happens.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }
}

impl Drop for ForeignBacking {
    fn drop(&mut self) {
        if let Some(deleter) = self.deleter {
            deleter(self.user_data, self.data);
        }
    }
}

pub fn blob_create(out_blob: &mut BlobHandle) -> Status {
    crate::guarded(|| {
        *out_blob = BlobHandle(BLOBS.insert(Mutex::new(DataBlob::empty())));
        status::OKAY
    })
}

/// Copy a record. The copy shares the original's payload lineage — the
/// bytes are not duplicated, and one release anywhere in the lineage
/// disarms every other copy's deleter reference.
pub fn blob_copy(out_blob: &mut BlobHandle, blob: BlobHandle) -> Status {
    crate::guarded(|| {
        let Some(slot) = BLOBS.get(blob.0) else {
            return status::BAD_PARAMETER;
        };
        let copy = slot.object.lock().clone();
        *out_blob = BlobHandle(BLOBS.insert(Mutex::new(copy)));
        status::OKAY
    })
}

/// Destroy the record only. Any live payload stays live for the rest of
/// its lineage; pair with [`blob_release_data`] to free it.
pub fn blob_destroy(blob: BlobHandle) -> Status {
    BLOBS.destroy(blob.0)
}

pub fn blob_get_status(blob: BlobHandle) -> Status {
    BLOBS.take_status(blob.0)
}

pub fn blob_get_time(blob: BlobHandle, out_time: &mut Timestamp) -> Status {
    BLOBS.with_entry(blob.0, |rec| {
        *out_time = rec.lock().time();
        status::OKAY
    })
}

pub fn blob_set_time(blob: BlobHandle, time: Timestamp) -> Status {
    BLOBS.with_entry(blob.0, |rec| {
        rec.lock().set_time(time);
        status::OKAY
    })
}

/// Read the payload view: base pointer and byte length.
///
/// The pointer stays valid until the lineage is released; after release
/// it comes back null (the length still reports the produced size).
pub fn blob_get_data(blob: BlobHandle, out_data: &mut *const u8, out_len: &mut u32) -> Status {
    BLOBS.with_entry(blob.0, |rec| {
        let record = rec.lock();
        *out_len = record.len();
        *out_data = match record.data() {
            Some(view) => view.as_ptr(),
            None => std::ptr::null(),
        };
        status::OKAY
    })
}

/// Hand a foreign buffer to this record, starting a fresh payload
/// lineage. The bytes are referenced, never copied.
///
/// # Safety
///
/// `data..data+len` must stay readable, from any thread, until `deleter`
/// runs (or forever, if no deleter is supplied). `deleter` and
/// `user_data` must likewise be callable/valid from whichever thread
/// performs the winning release.
pub unsafe fn blob_set_data(
    blob: BlobHandle,
    data: *const u8,
    len: u32,
    deleter: Option<BlobDeleter>,
    user_data: *mut c_void,
) -> Status {
    BLOBS.with_entry(blob.0, |rec| {
        rec.lock().set_backing(
            Box::new(ForeignBacking {
                data,
                len,
                deleter,
                user_data,
            }),
            len,
        );
        status::OKAY
    })
}

/// Free the payload. The first call across the record's whole lineage
/// runs the deleter; every later call, on this record or any copy, is a
/// no-op rather than an error.
pub fn blob_release_data(blob: BlobHandle) -> Status {
    BLOBS.with_entry(blob.0, |rec| {
        rec.lock().release();
        status::OKAY
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DELETER_RUNS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn counting_deleter(user_data: *mut c_void, _data: *const u8) {
        assert!(user_data.is_null());
        DELETER_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    #[serial_test::serial(blob_deleter)]
    fn release_runs_the_deleter_exactly_once() {
        DELETER_RUNS.store(0, Ordering::SeqCst);
        let payload = [7u8; 16];

        let mut blob = BlobHandle::NULL;
        assert_eq!(blob_create(&mut blob), status::OKAY);
        let set = unsafe {
            blob_set_data(
                blob,
                payload.as_ptr(),
                payload.len() as u32,
                Some(counting_deleter),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(set, status::OKAY);

        let mut data = std::ptr::null();
        let mut len = 0;
        assert_eq!(blob_get_data(blob, &mut data, &mut len), status::OKAY);
        assert_eq!(len, 16);
        assert_eq!(data, payload.as_ptr());

        assert_eq!(blob_release_data(blob), status::OKAY);
        assert_eq!(blob_release_data(blob), status::OKAY);
        assert_eq!(DELETER_RUNS.load(Ordering::SeqCst), 1);

        // After release the view is gone but the produced length remains.
        assert_eq!(blob_get_data(blob, &mut data, &mut len), status::OKAY);
        assert!(data.is_null());
        assert_eq!(len, 16);

        assert_eq!(blob_destroy(blob), status::OKAY);
    }

    #[test]
    #[serial_test::serial(blob_deleter)]
    fn copies_share_one_lineage() {
        DELETER_RUNS.store(0, Ordering::SeqCst);
        let payload = [1u8, 2, 3, 4];

        let mut original = BlobHandle::NULL;
        blob_create(&mut original);
        unsafe {
            blob_set_data(
                original,
                payload.as_ptr(),
                payload.len() as u32,
                Some(counting_deleter),
                std::ptr::null_mut(),
            );
        }

        let mut copy = BlobHandle::NULL;
        assert_eq!(blob_copy(&mut copy, original), status::OKAY);

        // Destroying one record leaves the payload live for the other.
        assert_eq!(blob_destroy(original), status::OKAY);
        assert_eq!(DELETER_RUNS.load(Ordering::SeqCst), 0);

        let mut data = std::ptr::null();
        let mut len = 0;
        assert_eq!(blob_get_data(copy, &mut data, &mut len), status::OKAY);
        assert_eq!(data, payload.as_ptr());

        assert_eq!(blob_release_data(copy), status::OKAY);
        assert_eq!(DELETER_RUNS.load(Ordering::SeqCst), 1);
        assert_eq!(blob_destroy(copy), status::OKAY);
    }

    #[test]
    fn record_destruction_never_releases() {
        // A record destroyed with a live, deleter-less payload simply
        // drops its lineage reference.
        let payload = [9u8; 2];
        let mut blob = BlobHandle::NULL;
        blob_create(&mut blob);
        unsafe {
            blob_set_data(blob, payload.as_ptr(), 2, None, std::ptr::null_mut());
        }
        assert_eq!(blob_destroy(blob), status::OKAY);
        assert_eq!(blob_destroy(blob), status::DELETE_OF_NULL_HANDLE);
    }

    #[test]
    fn dead_handles_report_null_object() {
        let mut time = Timestamp::default();
        assert_eq!(blob_get_time(BlobHandle::NULL, &mut time), status::NULL_OBJECT);
        assert_eq!(blob_release_data(BlobHandle(987654)), status::NULL_OBJECT);
    }
}
