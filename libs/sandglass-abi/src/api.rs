// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handle pairs and flattened operations for the top-level API: creation
//! parameters, connection, version/time/verbosity, the per-thread source
//! enumeration latch, and the log message channel.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use sandglass::api::{Api, ApiParams};
use sandglass::backend::Backend;
use sandglass::message::{LogMessage, MessageLevel};
use sandglass::time::{Timestamp, Version};

use crate::message::{MESSAGES, MessageHandle};
use crate::registry::{HandleMap, SendPtr};
use crate::status::{self, Status};

/// Opaque token for a bundle of API creation parameters. Zero is the null
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ApiParamsHandle(pub u64);

impl ApiParamsHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque token for a live API connection. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ApiHandle(pub u64);

impl ApiHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque token for one latched source description. Created by the latch
/// (or by `source_get_info`), never by the caller; dies with the next
/// latch from the same thread or with its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SourceInfoHandle(pub u64);

impl SourceInfoHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The C callback shape for log delivery. The message handle is owned by
/// the callback: destroy it exactly as one returned by
/// [`api_get_next_log_message`].
pub type MessageCallback = extern "C" fn(message: MessageHandle, user_data: *mut c_void);

pub(crate) struct ApiRec {
    pub(crate) api: Api,
    /// Per-thread enumeration snapshots (the latch). Each calling thread
    /// owns one slot; re-latching replaces only that thread's handles.
    latched: Mutex<HashMap<ThreadId, Vec<SourceInfoHandle>>>,
}

pub(crate) struct SourceInfoRec {
    pub(crate) name: String,
}

pub(crate) static API_PARAMS: LazyLock<HandleMap<Mutex<ApiParams>>> = LazyLock::new(HandleMap::new);
pub(crate) static APIS: LazyLock<HandleMap<ApiRec>> = LazyLock::new(HandleMap::new);
pub(crate) static SOURCE_INFOS: LazyLock<HandleMap<SourceInfoRec>> = LazyLock::new(HandleMap::new);

//----------------------------------------------------------------------
// Creation parameter bundle.

pub fn api_params_create(out_params: &mut ApiParamsHandle) -> Status {
    crate::guarded(|| {
        *out_params = ApiParamsHandle(API_PARAMS.insert(Mutex::new(ApiParams::default())));
        status::OKAY
    })
}

pub fn api_params_destroy(params: ApiParamsHandle) -> Status {
    API_PARAMS.destroy(params.0)
}

pub fn api_params_get_status(params: ApiParamsHandle) -> Status {
    API_PARAMS.take_status(params.0)
}

pub fn api_params_get_user(params: ApiParamsHandle, out_user: &mut String) -> Status {
    API_PARAMS.with_entry(params.0, |rec| {
        out_user.clear();
        out_user.push_str(rec.lock().user());
        status::OKAY
    })
}

pub fn api_params_set_user(params: ApiParamsHandle, user: &str) -> Status {
    API_PARAMS.with_entry(params.0, |rec| {
        rec.lock().set_user(user);
        status::OKAY
    })
}

pub fn api_params_get_credentials(params: ApiParamsHandle, out_credentials: &mut Vec<u8>) -> Status {
    API_PARAMS.with_entry(params.0, |rec| {
        out_credentials.clear();
        out_credentials.extend_from_slice(rec.lock().credentials());
        status::OKAY
    })
}

pub fn api_params_set_credentials(params: ApiParamsHandle, credentials: &[u8]) -> Status {
    API_PARAMS.with_entry(params.0, |rec| {
        rec.lock().set_credentials(credentials);
        status::OKAY
    })
}

//----------------------------------------------------------------------
// The API object.

/// Connect to the reference backend through the handle protocol.
///
/// On failure the out handle is left untouched; callers must check the
/// returned status before using it.
pub fn api_create(out_api: &mut ApiHandle, params: ApiParamsHandle) -> Status {
    crate::guarded(|| {
        api_create_with_backend(
            out_api,
            params,
            Arc::new(sandglass::backend::NullBackend::new()),
        )
    })
}

/// The vendor hosting seam: connect against a caller-supplied driver.
pub fn api_create_with_backend(
    out_api: &mut ApiHandle,
    params: ApiParamsHandle,
    backend: Arc<dyn Backend>,
) -> Status {
    crate::guarded(|| {
        let Some(params_slot) = API_PARAMS.get(params.0) else {
            return status::BAD_PARAMETER;
        };
        let params = params_slot.object.lock().clone();
        match Api::with_backend(params, backend) {
            Ok(api) => {
                *out_api = ApiHandle(APIS.insert(ApiRec {
                    api,
                    latched: Mutex::new(HashMap::new()),
                }));
                status::OKAY
            }
            Err(err) => status::from_error(&err),
        }
    })
}

/// Tear down a connection. Blocks until the backend's producer threads
/// have been joined, bounded by their tick.
pub fn api_destroy(api: ApiHandle) -> Status {
    match APIS.remove(api.0) {
        Some(slot) => crate::registry::teardown(move || {
            {
                let latched = slot.object.latched.lock();
                for snapshot in latched.values() {
                    for info in snapshot {
                        SOURCE_INFOS.remove(info.0);
                    }
                }
            }
            drop(slot);
        }),
        None => status::DELETE_OF_NULL_HANDLE,
    }
}

pub fn api_get_status(api: ApiHandle) -> Status {
    APIS.take_status(api.0)
}

pub fn api_get_version(api: ApiHandle, out_version: &mut Version) -> Status {
    APIS.with_entry(api.0, |rec| {
        *out_version = rec.api.version();
        status::OKAY
    })
}

pub fn api_get_current_time(api: ApiHandle, out_time: &mut Timestamp) -> Status {
    APIS.with_entry(api.0, |rec| {
        *out_time = rec.api.current_time();
        status::OKAY
    })
}

pub fn api_get_verbosity(api: ApiHandle, out_verbosity: &mut u16) -> Status {
    APIS.with_entry(api.0, |rec| {
        *out_verbosity = rec.api.verbosity();
        status::OKAY
    })
}

pub fn api_set_verbosity(api: ApiHandle, verbosity: u16) -> Status {
    APIS.with_entry(api.0, |rec| {
        rec.api.set_verbosity(verbosity);
        status::OKAY
    })
}

//----------------------------------------------------------------------
// Source enumeration: the per-thread latch.

/// Query the backend and latch a consistent snapshot of its source
/// descriptions for the calling thread, returning the count.
///
/// Re-latching invalidates the handles from this thread's previous
/// latch; snapshots held by other threads are untouched.
pub fn api_get_available_source_count(api: ApiHandle, out_count: &mut u32) -> Status {
    APIS.with_entry(api.0, |rec| {
        let sources = match rec.api.available_sources() {
            Ok(sources) => sources,
            Err(err) => return status::from_error(&err),
        };

        let mut latched = rec.latched.lock();
        let snapshot = latched.entry(thread::current().id()).or_default();
        for stale in snapshot.drain(..) {
            SOURCE_INFOS.remove(stale.0);
        }
        for description in &sources {
            let token = SOURCE_INFOS.insert(SourceInfoRec {
                name: description.name().to_string(),
            });
            snapshot.push(SourceInfoHandle(token));
        }

        *out_count = snapshot.len() as u32;
        status::OKAY
    })
}

/// Read one entry of the calling thread's latched snapshot. Calling
/// before any latch, or with an index at or beyond the latched count, is
/// a bad parameter.
pub fn api_get_available_source_info(
    api: ApiHandle,
    which: u32,
    out_info: &mut SourceInfoHandle,
) -> Status {
    APIS.with_entry(api.0, |rec| {
        let latched = rec.latched.lock();
        match latched
            .get(&thread::current().id())
            .and_then(|snapshot| snapshot.get(which as usize))
        {
            Some(&info) => {
                *out_info = info;
                status::OKAY
            }
            None => status::BAD_PARAMETER,
        }
    })
}

pub fn source_info_get_status(info: SourceInfoHandle) -> Status {
    SOURCE_INFOS.take_status(info.0)
}

pub fn source_info_get_name(info: SourceInfoHandle, out_name: &mut String) -> Status {
    SOURCE_INFOS.with_entry(info.0, |rec| {
        out_name.clear();
        out_name.push_str(&rec.name);
        status::OKAY
    })
}

//----------------------------------------------------------------------
// The log message channel.

pub fn api_set_log_streaming_state(api: ApiHandle, running: bool) -> Status {
    APIS.with_entry(api.0, |rec| {
        rec.api.set_log_streaming(running);
        status::OKAY
    })
}

/// Register (or with `None`, clear) the C-side log callback. Either
/// switch discards messages queued for polling before it.
///
/// # Safety
///
/// `user_data` is handed, unexamined, to `handler` on the producer
/// thread. The caller must keep whatever it points at valid and safe to
/// use from that thread until the callback is cleared or the API handle
/// destroyed.
pub unsafe fn api_set_log_callback(
    api: ApiHandle,
    handler: Option<MessageCallback>,
    user_data: *mut c_void,
) -> Status {
    APIS.with_entry(api.0, |rec| {
        match handler {
            None => rec.api.set_log_callback(None),
            Some(callback) => {
                let user_data = SendPtr(user_data);
                rec.api
                    .set_log_callback(Some(Arc::new(move |message: LogMessage| {
                        // Capture the whole `SendPtr` (Send + Sync), not just
                        // its `*mut c_void` field, under edition 2024's
                        // disjoint closure captures.
                        let user_data = &user_data;
                        // Each delivery becomes its own record so the client
                        // destroys it exactly like a polled one.
                        let token = MESSAGES.insert(Mutex::new(message));
                        callback(MessageHandle(token), user_data.0);
                    })));
            }
        }
        status::OKAY
    })
}

/// Pop the oldest queued log message into a fresh handle. Returns
/// [`status::TIMEOUT`] and leaves the out handle untouched when nothing
/// is queued.
pub fn api_get_next_log_message(api: ApiHandle, out_message: &mut MessageHandle) -> Status {
    APIS.with_entry(api.0, |rec| {
        match rec.api.pending_log_messages(1).pop() {
            Some(message) => {
                *out_message = MessageHandle(MESSAGES.insert(Mutex::new(message)));
                status::OKAY
            }
            None => status::TIMEOUT,
        }
    })
}

pub fn api_set_log_minimum_level(api: ApiHandle, level: i32) -> Status {
    APIS.with_entry(api.0, |rec| {
        rec.api.set_log_minimum_level(MessageLevel(level));
        status::OKAY
    })
}
