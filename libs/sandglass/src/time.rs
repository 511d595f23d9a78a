// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Backend wall-clock time and the SDK version triple.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A wall-clock instant reported by the backend, split into whole seconds
/// and microseconds since the Unix epoch.
///
/// Clients are expected to do timeout bookkeeping against this clock rather
/// than their own, which may be skewed from the machine the backend runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: u64,
    pub microseconds: u32,
}

impl Timestamp {
    pub const fn new(seconds: u64, microseconds: u32) -> Self {
        Self {
            seconds,
            microseconds,
        }
    }

    /// The current wall-clock time of this process.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self {
            seconds: since_epoch.as_secs(),
            microseconds: since_epoch.subsec_micros(),
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::new(self.seconds, self.microseconds * 1_000)
    }
}

impl From<Duration> for Timestamp {
    fn from(d: Duration) -> Self {
        Self {
            seconds: d.as_secs(),
            microseconds: d.subsec_micros(),
        }
    }
}

/// SDK version triple.
///
/// A major bump is binary-incompatible, a minor bump adds features, a patch
/// bump is fix-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version this crate was built as.
    pub fn current() -> Self {
        fn field(s: &str) -> u16 {
            s.parse().unwrap_or(0)
        }
        Self {
            major: field(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: field(env!("CARGO_PKG_VERSION_MINOR")),
            patch: field(env!("CARGO_PKG_VERSION_PATCH")),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
