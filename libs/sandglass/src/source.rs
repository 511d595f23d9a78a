// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Source descriptions, stream properties, and the client-side source
//! object.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{BlobHandler, BlobStream};
use crate::blob::DataBlob;

/// Blobs per second a source produces when no rate is configured.
pub const DEFAULT_RATE: f64 = 30.0;

/// Immutable snapshot identifying a selectable producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescription {
    name: String,
}

impl SourceDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Requested properties for an opened stream.
///
/// The rate is advisory: the producer aims for it but makes no real-time
/// guarantee. New properties gain a field and a getter/setter pair here
/// without disturbing existing construction sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamProperties {
    rate: f64,
}

impl Default for StreamProperties {
    fn default() -> Self {
        Self { rate: DEFAULT_RATE }
    }
}

impl StreamProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target blobs per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }
}

/// An opened blob source: the client half of one stream.
///
/// Owns the vendor's stream object, which in turn owns the producer
/// thread. Dropping the source stops and joins that thread; the drop
/// blocks for about one worker tick.
pub struct BlobSource {
    stream: Box<dyn BlobStream>,
}

impl BlobSource {
    pub(crate) fn new(stream: Box<dyn BlobStream>) -> Self {
        Self { stream }
    }

    /// Description of the source this stream was opened against.
    pub fn info(&self) -> SourceDescription {
        self.stream.info()
    }

    /// Turn production on or off. Orthogonal to the consumption mode.
    pub fn set_streaming(&self, running: bool) {
        self.stream.set_streaming(running);
    }

    /// Register (or with `None`, clear) the delivery callback.
    ///
    /// Registration discards any blobs queued for polling before the
    /// switch; see [`crate::channel`] for the mode rules. The handler runs
    /// on the producer thread and must return promptly.
    pub fn set_callback(&self, handler: Option<BlobHandler>) {
        self.stream.set_callback(handler);
    }

    /// Convenience wrapper around [`BlobSource::set_callback`].
    pub fn on_blob(&self, handler: impl Fn(DataBlob) + Send + Sync + 'static) {
        self.set_callback(Some(std::sync::Arc::new(handler)));
    }

    /// Wait up to `timeout` for the next blob in poll mode.
    ///
    /// Zero timeout returns immediately. `None` means no blob arrived in
    /// time, which is expected while the producer is idle, not a failure.
    pub fn next_blob(&self, timeout: Duration) -> Option<DataBlob> {
        self.stream.next_blob(timeout)
    }
}

impl std::fmt::Debug for BlobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobSource")
            .field("info", &self.stream.info())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_matches_constant() {
        let props = StreamProperties::default();
        assert_eq!(props.rate(), DEFAULT_RATE);
        assert_eq!(props.with_rate(60.0).rate(), 60.0);
    }

    #[test]
    fn description_roundtrips_serde() {
        let description = SourceDescription::new("/sandglass/null/source/1");
        let json = serde_json::to_string(&description).expect("serialize");
        let back: SourceDescription = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, description);
    }
}
