// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Large binary payloads transferred by reference.
//!
//! Blobs are big enough that copying their bytes between layers would be a
//! real cost, so a [`DataBlob`] carries a *shared lineage*: cloning the
//! record clones a reference to the backing buffer, never the bytes. The
//! buffer is freed by the first [`DataBlob::release`] call made on any
//! record of the lineage; every later call is a no-op. After release the
//! bytes are simply gone — [`DataBlob::data`] returns `None` instead of a
//! dangling view.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::time::Timestamp;

/// Storage behind a blob.
///
/// The reference backend uses plain owned buffers; the ABI layer wraps
/// foreign pointer/deleter tuples. Dropping the backing is the release:
/// whatever cleanup the producer wired up runs in `Drop`.
pub trait BlobBacking: Send {
    fn bytes(&self) -> &[u8];
}

impl BlobBacking for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

struct Payload {
    len: u32,
    backing: Mutex<Option<Box<dyn BlobBacking>>>,
}

/// A binary payload record: byte view, creation time, release control.
///
/// The creation time is per record (copied on clone, settable per copy);
/// the byte buffer is per lineage (shared by all clones).
#[derive(Clone)]
pub struct DataBlob {
    time: Timestamp,
    payload: Arc<Payload>,
}

/// Locked view of a blob's bytes, returned by [`DataBlob::data`].
///
/// Holding the view keeps the buffer alive: a concurrent `release` blocks
/// until the view is dropped.
pub struct BlobData<'a> {
    guard: MutexGuard<'a, Option<Box<dyn BlobBacking>>>,
}

impl Deref for BlobData<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self.guard.as_ref() {
            Some(backing) => backing.bytes(),
            None => &[],
        }
    }
}

impl DataBlob {
    /// A blob with no payload, as handed out for "no data yet" paths.
    pub fn empty() -> Self {
        Self {
            time: Timestamp::default(),
            payload: Arc::new(Payload {
                len: 0,
                backing: Mutex::new(None),
            }),
        }
    }

    /// Wrap a producer-supplied backing. `len` must describe the backing's
    /// byte view.
    pub fn from_backing(backing: Box<dyn BlobBacking>, len: u32, time: Timestamp) -> Self {
        Self {
            time,
            payload: Arc::new(Payload {
                len,
                backing: Mutex::new(Some(backing)),
            }),
        }
    }

    /// Take ownership of a buffer; the release step frees it.
    pub fn from_vec(bytes: Vec<u8>, time: Timestamp) -> Self {
        let len = bytes.len() as u32;
        Self::from_backing(Box::new(bytes), len, time)
    }

    /// Creation time in UTC, stamped by the producer.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }

    /// Byte length of the payload as produced. Stable across release.
    pub fn len(&self) -> u32 {
        self.payload.len
    }

    pub fn is_empty(&self) -> bool {
        self.payload.len == 0
    }

    /// View of the payload bytes, or `None` once the lineage was released
    /// (or the blob never had a payload).
    pub fn data(&self) -> Option<BlobData<'_>> {
        let guard = self.payload.backing.lock();
        if guard.is_some() {
            Some(BlobData { guard })
        } else {
            None
        }
    }

    /// Free the underlying buffer.
    ///
    /// The first call on any record of the lineage takes the backing out
    /// and drops it, running the producer's cleanup exactly once. Every
    /// later call — on this record or any clone — finds nothing left and
    /// returns without effect.
    pub fn release(&self) {
        drop(self.payload.backing.lock().take());
    }

    /// Whether the lineage still holds its buffer.
    pub fn is_released(&self) -> bool {
        self.payload.backing.lock().is_none()
    }

    /// Replace this record's payload with a fresh lineage, leaving any
    /// clones attached to the old one.
    pub fn set_backing(&mut self, backing: Box<dyn BlobBacking>, len: u32) {
        self.payload = Arc::new(Payload {
            len,
            backing: Mutex::new(Some(backing)),
        });
    }
}

impl std::fmt::Debug for DataBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBlob")
            .field("len", &self.payload.len)
            .field("time", &self.time)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backing that counts how many times it was dropped.
    struct CountingBacking {
        bytes: Vec<u8>,
        drops: Arc<AtomicUsize>,
    }

    impl BlobBacking for CountingBacking {
        fn bytes(&self) -> &[u8] {
            &self.bytes
        }
    }

    impl Drop for CountingBacking {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted_blob(drops: &Arc<AtomicUsize>) -> DataBlob {
        DataBlob::from_backing(
            Box::new(CountingBacking {
                bytes: vec![1, 2, 3, 4],
                drops: Arc::clone(drops),
            }),
            4,
            Timestamp::new(7, 0),
        )
    }

    #[test]
    fn release_is_idempotent() {
        let drops = Arc::new(AtomicUsize::new(0));
        let blob = counted_blob(&drops);
        blob.release();
        blob.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_one_lineage() {
        let drops = Arc::new(AtomicUsize::new(0));
        let blob = counted_blob(&drops);
        let copy = blob.clone();

        assert_eq!(&copy.data().expect("live payload")[..], &[1, 2, 3, 4]);

        copy.release();
        assert!(blob.is_released());
        assert!(blob.data().is_none());

        blob.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn length_survives_release() {
        let blob = DataBlob::from_vec(vec![0; 256], Timestamp::new(1, 0));
        blob.release();
        assert_eq!(blob.len(), 256);
        assert!(blob.data().is_none());
    }

    #[test]
    fn set_backing_starts_a_new_lineage() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut blob = counted_blob(&drops);
        let old_copy = blob.clone();

        blob.set_backing(Box::new(vec![9u8, 9]), 2);
        assert_eq!(&blob.data().expect("live payload")[..], &[9, 9]);

        // The clone still owns the original lineage.
        assert_eq!(&old_copy.data().expect("live payload")[..], &[1, 2, 3, 4]);
        old_copy.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!blob.is_released());
    }

    #[test]
    fn empty_blob_has_no_data() {
        let blob = DataBlob::empty();
        assert!(blob.is_empty());
        assert!(blob.data().is_none());
        blob.release();
    }

    #[test]
    fn per_record_time_is_independent() {
        let mut a = DataBlob::from_vec(vec![1], Timestamp::new(1, 0));
        let b = a.clone();
        a.set_time(Timestamp::new(2, 0));
        assert_eq!(b.time(), Timestamp::new(1, 0));
        assert_eq!(a.time(), Timestamp::new(2, 0));
    }
}
