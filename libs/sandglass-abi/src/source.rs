// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handle pairs and flattened operations for blob sources: stream
//! property bundles, source construction parameters, and the stream
//! itself with its two consumption paths.

use std::ffi::c_void;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use parking_lot::Mutex;

use sandglass::blob::DataBlob;
use sandglass::source::{BlobSource, StreamProperties};

use crate::api::{APIS, ApiHandle, SOURCE_INFOS, SourceInfoHandle, SourceInfoRec};
use crate::blob::{BLOBS, BlobHandle};
use crate::registry::{HandleMap, SendPtr};
use crate::status::{self, Status};

/// Opaque token for a stream property bundle. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct StreamPropsHandle(pub u64);

impl StreamPropsHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque token for a bundle of source construction parameters. Zero is
/// the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SourceParamsHandle(pub u64);

impl SourceParamsHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque token for an opened blob source. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SourceHandle(pub u64);

impl SourceHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The C callback shape for blob delivery. The blob handle is owned by
/// the callback: release and destroy it exactly as one returned by
/// [`source_get_next_blob`].
pub type BlobCallback = extern "C" fn(blob: BlobHandle, user_data: *mut c_void);

#[derive(Default)]
struct SourceParamsRec {
    api: ApiHandle,
    props: StreamPropsHandle,
    name: String,
}

pub(crate) struct SourceRec {
    source: BlobSource,
    /// Token for the description handed out by `source_get_info`, created
    /// on first use and reused after; dies with the source.
    info: Mutex<Option<SourceInfoHandle>>,
}

pub(crate) static STREAM_PROPS: LazyLock<HandleMap<Mutex<StreamProperties>>> =
    LazyLock::new(HandleMap::new);
static SOURCE_PARAMS: LazyLock<HandleMap<Mutex<SourceParamsRec>>> = LazyLock::new(HandleMap::new);
pub(crate) static SOURCES: LazyLock<HandleMap<SourceRec>> = LazyLock::new(HandleMap::new);

//----------------------------------------------------------------------
// Stream property bundle.

pub fn stream_props_create(out_props: &mut StreamPropsHandle) -> Status {
    crate::guarded(|| {
        *out_props = StreamPropsHandle(STREAM_PROPS.insert(Mutex::new(StreamProperties::default())));
        status::OKAY
    })
}

pub fn stream_props_destroy(props: StreamPropsHandle) -> Status {
    STREAM_PROPS.destroy(props.0)
}

pub fn stream_props_get_status(props: StreamPropsHandle) -> Status {
    STREAM_PROPS.take_status(props.0)
}

pub fn stream_props_get_rate(props: StreamPropsHandle, out_rate: &mut f64) -> Status {
    STREAM_PROPS.with_entry(props.0, |rec| {
        *out_rate = rec.lock().rate();
        status::OKAY
    })
}

pub fn stream_props_set_rate(props: StreamPropsHandle, rate: f64) -> Status {
    STREAM_PROPS.with_entry(props.0, |rec| {
        rec.lock().set_rate(rate);
        status::OKAY
    })
}

//----------------------------------------------------------------------
// Source construction parameter bundle.

pub fn source_params_create(out_params: &mut SourceParamsHandle) -> Status {
    crate::guarded(|| {
        *out_params =
            SourceParamsHandle(SOURCE_PARAMS.insert(Mutex::new(SourceParamsRec::default())));
        status::OKAY
    })
}

pub fn source_params_destroy(params: SourceParamsHandle) -> Status {
    SOURCE_PARAMS.destroy(params.0)
}

pub fn source_params_get_status(params: SourceParamsHandle) -> Status {
    SOURCE_PARAMS.take_status(params.0)
}

pub fn source_params_set_api(params: SourceParamsHandle, api: ApiHandle) -> Status {
    SOURCE_PARAMS.with_entry(params.0, |rec| {
        rec.lock().api = api;
        status::OKAY
    })
}

pub fn source_params_set_stream_properties(
    params: SourceParamsHandle,
    props: StreamPropsHandle,
) -> Status {
    SOURCE_PARAMS.with_entry(params.0, |rec| {
        rec.lock().props = props;
        status::OKAY
    })
}

/// An empty name selects the backend's first advertised source.
pub fn source_params_set_name(params: SourceParamsHandle, name: &str) -> Status {
    SOURCE_PARAMS.with_entry(params.0, |rec| {
        rec.lock().name = name.to_string();
        status::OKAY
    })
}

//----------------------------------------------------------------------
// The source object.

/// Open a stream from a parameter bundle. The bundle must carry a live
/// API handle; an unset property bundle falls back to the defaults. A
/// name that matches no advertised source fails with
/// [`status::BAD_PARAMETER`] and leaves the out handle untouched.
pub fn source_create(out_source: &mut SourceHandle, params: SourceParamsHandle) -> Status {
    crate::guarded(|| {
        let Some(params_slot) = SOURCE_PARAMS.get(params.0) else {
            return status::BAD_PARAMETER;
        };
        let (api, props_handle, name) = {
            let rec = params_slot.object.lock();
            (rec.api, rec.props, rec.name.clone())
        };
        let Some(api_slot) = APIS.get(api.0) else {
            return status::BAD_PARAMETER;
        };
        let props = match STREAM_PROPS.get(props_handle.0) {
            Some(slot) => *slot.object.lock(),
            None => StreamProperties::default(),
        };

        let requested = if name.is_empty() {
            None
        } else {
            Some(name.as_str())
        };
        match api_slot.object.api.open_source(requested, props) {
            Ok(source) => {
                *out_source = SourceHandle(SOURCES.insert(SourceRec {
                    source,
                    info: Mutex::new(None),
                }));
                status::OKAY
            }
            Err(err) => status::from_error(&err),
        }
    })
}

/// Tear down a stream, stopping and joining its producer thread.
pub fn source_destroy(source: SourceHandle) -> Status {
    match SOURCES.remove(source.0) {
        Some(slot) => crate::registry::teardown(move || {
            if let Some(info) = *slot.object.info.lock() {
                SOURCE_INFOS.remove(info.0);
            }
            drop(slot);
        }),
        None => status::DELETE_OF_NULL_HANDLE,
    }
}

pub fn source_get_status(source: SourceHandle) -> Status {
    SOURCES.take_status(source.0)
}

pub fn source_set_streaming_state(source: SourceHandle, running: bool) -> Status {
    SOURCES.with_entry(source.0, |rec| {
        rec.source.set_streaming(running);
        status::OKAY
    })
}

/// Register (or with `None`, clear) the C-side blob callback. Either
/// switch discards blobs queued for polling before it.
///
/// # Safety
///
/// `user_data` is handed, unexamined, to `handler` on the producer
/// thread. The caller must keep whatever it points at valid and safe to
/// use from that thread until the callback is cleared or the source
/// destroyed.
pub unsafe fn source_set_stream_callback(
    source: SourceHandle,
    handler: Option<BlobCallback>,
    user_data: *mut c_void,
) -> Status {
    SOURCES.with_entry(source.0, |rec| {
        match handler {
            None => rec.source.set_callback(None),
            Some(callback) => {
                let user_data = SendPtr(user_data);
                rec.source.set_callback(Some(Arc::new(move |blob: DataBlob| {
                    // Capture the whole `SendPtr` (Send + Sync), not just its
                    // `*mut c_void` field, under edition 2024's disjoint
                    // closure captures.
                    let user_data = &user_data;
                    // Each delivery becomes its own record so the client
                    // releases and destroys it exactly like a polled one.
                    let token = BLOBS.insert(Mutex::new(blob));
                    callback(BlobHandle(token), user_data.0);
                })));
            }
        }
        status::OKAY
    })
}

/// Wait up to the given timeout for the next blob in poll mode.
///
/// On success the out handle owns the blob record. On expiry the status
/// is [`status::TIMEOUT`] and the out handle owns an empty record —
/// destroy it either way. A zero timeout returns immediately.
pub fn source_get_next_blob(
    source: SourceHandle,
    out_blob: &mut BlobHandle,
    timeout_seconds: u64,
    timeout_microseconds: u32,
) -> Status {
    SOURCES.with_entry(source.0, |rec| {
        let timeout = Duration::new(timeout_seconds, timeout_microseconds.saturating_mul(1_000));
        match rec.source.next_blob(timeout) {
            Some(blob) => {
                *out_blob = BlobHandle(BLOBS.insert(Mutex::new(blob)));
                status::OKAY
            }
            None => {
                *out_blob = BlobHandle(BLOBS.insert(Mutex::new(DataBlob::empty())));
                status::TIMEOUT
            }
        }
    })
}

/// Description of the source this stream was opened against. The handle
/// is owned by the stream and stays valid until the stream is destroyed.
pub fn source_get_info(source: SourceHandle, out_info: &mut SourceInfoHandle) -> Status {
    SOURCES.with_entry(source.0, |rec| {
        let mut info = rec.info.lock();
        let handle = match *info {
            Some(existing) if SOURCE_INFOS.get(existing.0).is_some() => existing,
            _ => {
                let description = rec.source.info();
                let token = SOURCE_INFOS.insert(SourceInfoRec {
                    name: description.name().to_string(),
                });
                let fresh = SourceInfoHandle(token);
                *info = Some(fresh);
                fresh
            }
        };
        *out_info = handle;
        status::OKAY
    })
}
