// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Diagnostic log messages produced asynchronously inside a backend.
//!
//! Messages are small and fully value-copyable; unlike [`DataBlob`]s there
//! is no release step. They travel through the same dual-mode delivery path
//! as blobs (see [`crate::channel`]).
//!
//! [`DataBlob`]: crate::blob::DataBlob

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Severity of a [`LogMessage`], an ordered integer scale partitioned into
/// bands.
///
/// Any value is legal; the named constants are the lower edge of each band.
/// Comparisons are plain integer order, so a minimum-level filter of
/// [`MessageLevel::WARNING`] admits warnings, errors and critical errors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MessageLevel(pub i32);

impl MessageLevel {
    /// Lowest informational level; admits everything when used as a filter.
    pub const INFO: MessageLevel = MessageLevel(i32::MIN);
    /// First level considered a warning.
    pub const WARNING: MessageLevel = MessageLevel(0);
    /// First level considered an error.
    pub const ERROR: MessageLevel = MessageLevel(i32::MAX / 3);
    /// First level considered a critical error.
    pub const CRITICAL: MessageLevel = MessageLevel(2 * (i32::MAX / 3));

    /// Name of the band this level falls into.
    pub fn band(&self) -> &'static str {
        if *self >= Self::CRITICAL {
            "critical"
        } else if *self >= Self::ERROR {
            "error"
        } else if *self >= Self::WARNING {
            "warning"
        } else {
            "info"
        }
    }
}

/// A single diagnostic record: text, creation time, severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    value: String,
    time: Timestamp,
    level: MessageLevel,
}

impl LogMessage {
    pub fn new(value: impl Into<String>, time: Timestamp, level: MessageLevel) -> Self {
        Self {
            value: value.into(),
            time,
            level,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Creation time in UTC, stamped by the producing backend.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }

    pub fn level(&self) -> MessageLevel {
        self.level
    }

    pub fn set_level(&mut self, level: MessageLevel) {
        self.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ordered() {
        assert!(MessageLevel::INFO < MessageLevel::WARNING);
        assert!(MessageLevel::WARNING < MessageLevel::ERROR);
        assert!(MessageLevel::ERROR < MessageLevel::CRITICAL);
    }

    #[test]
    fn band_names_partition_the_scale() {
        assert_eq!(MessageLevel::INFO.band(), "info");
        assert_eq!(MessageLevel(-1).band(), "info");
        assert_eq!(MessageLevel::WARNING.band(), "warning");
        assert_eq!(MessageLevel(MessageLevel::ERROR.0 - 1).band(), "warning");
        assert_eq!(MessageLevel::ERROR.band(), "error");
        assert_eq!(MessageLevel::CRITICAL.band(), "critical");
        assert_eq!(MessageLevel(i32::MAX).band(), "critical");
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut a = LogMessage::new("first", Timestamp::new(1, 0), MessageLevel::WARNING);
        let b = a.clone();
        a.set_value("second");
        a.set_level(MessageLevel::ERROR);
        assert_eq!(b.value(), "first");
        assert_eq!(b.level(), MessageLevel::WARNING);
    }
}
