// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The vendor-facing half of the SDK.
//!
//! A driver implements [`Backend`] plus one [`BlobStream`] per opened
//! source and a single [`MessageChannel`] for diagnostics. The client half
//! ([`crate::api::Api`], [`crate::source::BlobSource`]) hosts any such
//! implementation; [`null::NullBackend`] is the reference one used for
//! tests and as a template for real drivers.
//!
//! Contract points every implementation must honor:
//!
//! - `open_source` validates a requested name against the enumerated set
//!   and rejects unknown names with [`SourceError::BadParameter`];
//! - delivered payloads follow the release discipline of
//!   [`crate::blob::DataBlob`];
//! - blobs and messages are delivered in production order within one
//!   stream; nothing is guaranteed across streams;
//! - no method panics. The boundary layer in `sandglass-abi` additionally
//!   converts any panic that does escape into a status code, but a backend
//!   that relies on that firewall is in breach of this contract.
//!
//! [`SourceError::BadParameter`]: crate::error::SourceError::BadParameter

use std::sync::Arc;
use std::time::Duration;

use crate::blob::DataBlob;
use crate::channel::Handler;
use crate::error::Result;
use crate::message::{LogMessage, MessageLevel};
use crate::source::{SourceDescription, StreamProperties};
use crate::time::{Timestamp, Version};

mod null;

pub use null::NullBackend;

/// Blob delivery callback, invoked from the producer thread.
pub type BlobHandler = Handler<DataBlob>;

/// Log message delivery callback, invoked from the producer thread.
pub type MessageHandler = Handler<LogMessage>;

/// A vendor driver: enumeration, stream construction, clock, and the
/// diagnostic channel.
pub trait Backend: Send + Sync {
    /// Version of the backing implementation, not of this crate.
    fn version(&self) -> Version;

    /// The backend's wall clock. Clients do timeout bookkeeping against
    /// this rather than their own, possibly skewed, clock.
    fn current_time(&self) -> Timestamp;

    fn verbosity(&self) -> u16;

    /// Advisory self-diagnostic volume: 0 is silent, higher bands add
    /// errors, then warnings, then tracing. Not routed through the
    /// message channel.
    fn set_verbosity(&self, verbosity: u16);

    /// Enumerate the currently selectable sources.
    fn available_sources(&self) -> Result<Vec<SourceDescription>>;

    /// Open a stream. `None` (or an empty name) selects the backend's
    /// first advertised source; a non-empty name must match an advertised
    /// name exactly.
    fn open_source(
        &self,
        name: Option<&str>,
        props: StreamProperties,
    ) -> Result<Box<dyn BlobStream>>;

    /// The backend's single diagnostic channel.
    fn log_channel(&self) -> Arc<dyn MessageChannel>;
}

/// One opened stream. Owns its producer; dropping the stream stops it.
pub trait BlobStream: Send + Sync {
    fn info(&self) -> SourceDescription;

    fn set_streaming(&self, running: bool);

    /// Switch to callback mode (`Some`) or back to poll mode (`None`).
    /// Either switch discards blobs queued for polling.
    fn set_callback(&self, handler: Option<BlobHandler>);

    /// Poll-mode accessor; `None` on timeout.
    fn next_blob(&self, timeout: Duration) -> Option<DataBlob>;
}

/// The diagnostic message channel, one per backend.
pub trait MessageChannel: Send + Sync {
    fn set_streaming(&self, running: bool);

    /// Same mode rules as [`BlobStream::set_callback`].
    fn set_callback(&self, handler: Option<MessageHandler>);

    /// Drain up to `max` queued messages without waiting; zero means all.
    fn pending(&self, max: usize) -> Vec<LogMessage>;

    /// Messages below `level` are dropped by the producer before they are
    /// ever queued or dispatched.
    fn set_minimum_level(&self, level: MessageLevel);
}
