// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handle pair and field accessors for log message records.
//!
//! Messages are plain value records: copy deep, destroy when done, no
//! release step.

use std::sync::LazyLock;

use parking_lot::Mutex;

use sandglass::message::{LogMessage, MessageLevel};
use sandglass::time::Timestamp;

use crate::registry::HandleMap;
use crate::status::{self, Status};

/// Opaque token for one log message record. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MessageHandle(pub u64);

impl MessageHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Severity band floors, frozen alongside the rest of the protocol.
pub const MESSAGE_LEVEL_INFO: i32 = MessageLevel::INFO.0;
pub const MESSAGE_LEVEL_WARNING: i32 = MessageLevel::WARNING.0;
pub const MESSAGE_LEVEL_ERROR: i32 = MessageLevel::ERROR.0;
pub const MESSAGE_LEVEL_CRITICAL: i32 = MessageLevel::CRITICAL.0;

pub(crate) static MESSAGES: LazyLock<HandleMap<Mutex<LogMessage>>> = LazyLock::new(HandleMap::new);

pub fn message_create(out_message: &mut MessageHandle) -> Status {
    crate::guarded(|| {
        *out_message = MessageHandle(MESSAGES.insert(Mutex::new(LogMessage::default())));
        status::OKAY
    })
}

/// Deep-copy an existing record into a fresh handle.
pub fn message_copy(out_message: &mut MessageHandle, message: MessageHandle) -> Status {
    crate::guarded(|| {
        let Some(slot) = MESSAGES.get(message.0) else {
            return status::BAD_PARAMETER;
        };
        let copy = slot.object.lock().clone();
        *out_message = MessageHandle(MESSAGES.insert(Mutex::new(copy)));
        status::OKAY
    })
}

pub fn message_destroy(message: MessageHandle) -> Status {
    MESSAGES.destroy(message.0)
}

pub fn message_get_status(message: MessageHandle) -> Status {
    MESSAGES.take_status(message.0)
}

pub fn message_get_value(message: MessageHandle, out_value: &mut String) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        out_value.clear();
        out_value.push_str(rec.lock().value());
        status::OKAY
    })
}

pub fn message_set_value(message: MessageHandle, value: &str) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        rec.lock().set_value(value);
        status::OKAY
    })
}

pub fn message_get_time(message: MessageHandle, out_time: &mut Timestamp) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        *out_time = rec.lock().time();
        status::OKAY
    })
}

pub fn message_set_time(message: MessageHandle, time: Timestamp) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        rec.lock().set_time(time);
        status::OKAY
    })
}

pub fn message_get_level(message: MessageHandle, out_level: &mut i32) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        *out_level = rec.lock().level().0;
        status::OKAY
    })
}

pub fn message_set_level(message: MessageHandle, level: i32) -> Status {
    MESSAGES.with_entry(message.0, |rec| {
        rec.lock().set_level(MessageLevel(level));
        status::OKAY
    })
}
