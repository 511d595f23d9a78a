// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The reference backend: no device, no state worth keeping, but every
//! contract point exercised.
//!
//! Two fixed sources are advertised. Each opened stream manufactures a
//! 256-byte test pattern at the requested rate; the log channel emits one
//! message every 100 ms with a severity that cycles through the bands.
//! Real drivers can start from this file and replace the producers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::{Backend, BlobHandler, BlobStream, MessageChannel, MessageHandler};
use crate::blob::DataBlob;
use crate::channel::DeliveryChannel;
use crate::error::{Result, SourceError};
use crate::message::{LogMessage, MessageLevel};
use crate::source::{SourceDescription, StreamProperties};
use crate::time::{Timestamp, Version};
use crate::worker::PacedWorker;

/// Names the null backend advertises.
pub const NULL_SOURCE_NAMES: [&str; 2] =
    ["/sandglass/null/source/1", "/sandglass/null/source/2"];

/// Cadence of the log producer, independent of any stream rate.
const LOG_CADENCE: Duration = Duration::from_millis(100);

pub struct NullBackend {
    verbosity: AtomicU16,
    sources: Vec<SourceDescription>,
    log: Arc<NullLogChannel>,
    _log_worker: PacedWorker,
}

impl NullBackend {
    pub fn new() -> Self {
        let sources = NULL_SOURCE_NAMES
            .into_iter()
            .map(SourceDescription::new)
            .collect();

        let log = Arc::new(NullLogChannel {
            channel: DeliveryChannel::new(),
            min_level: Mutex::new(MessageLevel::INFO),
        });

        // The log producer runs for the backend's whole lifetime; the
        // streaming flag only gates whether it emits.
        let producer = Arc::clone(&log);
        let mut last_emit = Instant::now();
        let mut level = MessageLevel::INFO;
        let log_worker = PacedWorker::spawn("null-log-channel", move || {
            if !producer.channel.is_streaming() || last_emit.elapsed() < LOG_CADENCE {
                return;
            }
            last_emit = Instant::now();

            let message = LogMessage::new(
                format!("null backend {} heartbeat", level.band()),
                Timestamp::now(),
                level,
            );
            level = next_level(level);

            // Filtering happens here, before the message is ever queued
            // or dispatched. Dropped messages are not counted anywhere.
            if message.level() >= *producer.min_level.lock() {
                producer.channel.deliver(message);
            }
        });

        Self {
            verbosity: AtomicU16::new(0),
            sources,
            log,
            _log_worker: log_worker,
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for NullBackend {
    fn version(&self) -> Version {
        Version::current()
    }

    fn current_time(&self) -> Timestamp {
        Timestamp::now()
    }

    fn verbosity(&self) -> u16 {
        self.verbosity.load(Ordering::Relaxed)
    }

    fn set_verbosity(&self, verbosity: u16) {
        self.verbosity.store(verbosity, Ordering::Relaxed);
        if verbosity > 200 {
            tracing::trace!("[null-backend] verbosity set to {verbosity}");
        }
    }

    fn available_sources(&self) -> Result<Vec<SourceDescription>> {
        Ok(self.sources.clone())
    }

    fn open_source(
        &self,
        name: Option<&str>,
        props: StreamProperties,
    ) -> Result<Box<dyn BlobStream>> {
        let description = match name {
            None | Some("") => self.sources[0].clone(),
            Some(requested) => self
                .sources
                .iter()
                .find(|d| d.name() == requested)
                .cloned()
                .ok_or_else(|| {
                    SourceError::bad_parameter(format!("unknown source {requested:?}"))
                })?,
        };
        Ok(Box::new(NullBlobStream::open(description, props)))
    }

    fn log_channel(&self) -> Arc<dyn MessageChannel> {
        Arc::clone(&self.log) as Arc<dyn MessageChannel>
    }
}

impl Drop for NullBackend {
    fn drop(&mut self) {
        if self.verbosity() > 200 {
            tracing::trace!("[null-backend] destroying backend");
        }
    }
}

fn next_level(level: MessageLevel) -> MessageLevel {
    match level {
        MessageLevel::INFO => MessageLevel::WARNING,
        MessageLevel::WARNING => MessageLevel::ERROR,
        MessageLevel::ERROR => MessageLevel::CRITICAL,
        _ => MessageLevel::INFO,
    }
}

struct NullLogChannel {
    channel: DeliveryChannel<LogMessage>,
    min_level: Mutex<MessageLevel>,
}

impl MessageChannel for NullLogChannel {
    fn set_streaming(&self, running: bool) {
        self.channel.set_streaming(running);
    }

    fn set_callback(&self, handler: Option<MessageHandler>) {
        self.channel.set_handler(handler);
    }

    fn pending(&self, max: usize) -> Vec<LogMessage> {
        self.channel.drain(max)
    }

    fn set_minimum_level(&self, level: MessageLevel) {
        *self.min_level.lock() = level;
    }
}

struct NullBlobStream {
    description: SourceDescription,
    channel: Arc<DeliveryChannel<DataBlob>>,
    _worker: PacedWorker,
}

impl NullBlobStream {
    fn open(description: SourceDescription, props: StreamProperties) -> Self {
        let channel = Arc::new(DeliveryChannel::new());

        let producer = Arc::clone(&channel);
        let pattern: Vec<u8> = (0..=255u8).collect();
        let interval = if props.rate() > 0.0 {
            Some(Duration::from_secs_f64(1.0 / props.rate()))
        } else {
            None
        };
        let mut last_emit = Instant::now();
        let worker = PacedWorker::spawn(description.name().to_string(), move || {
            let Some(interval) = interval else { return };
            if !producer.is_streaming() || last_emit.elapsed() < interval {
                return;
            }
            last_emit = Instant::now();
            producer.deliver(DataBlob::from_vec(pattern.clone(), Timestamp::now()));
        });

        Self {
            description,
            channel,
            _worker: worker,
        }
    }
}

impl BlobStream for NullBlobStream {
    fn info(&self) -> SourceDescription {
        self.description.clone()
    }

    fn set_streaming(&self, running: bool) {
        self.channel.set_streaming(running);
    }

    fn set_callback(&self, handler: Option<BlobHandler>) {
        self.channel.set_handler(handler);
    }

    fn next_blob(&self, timeout: Duration) -> Option<DataBlob> {
        self.channel.next(timeout)
    }
}
