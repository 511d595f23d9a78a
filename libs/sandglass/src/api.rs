// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The top-level client object: connection, enumeration, stream
//! construction, and the log channel.

use std::sync::Arc;

use crate::backend::{Backend, MessageChannel, MessageHandler, NullBackend};
use crate::error::Result;
use crate::message::{LogMessage, MessageLevel};
use crate::source::{BlobSource, SourceDescription, StreamProperties};
use crate::time::{Timestamp, Version};

/// Default user identity when none is supplied.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Default credentials value, indicating no credentials supplied.
pub const NO_CREDENTIALS: &[u8] = &[];

/// Connection parameters for [`Api::connect`].
///
/// New optional parameters are added as new fields with getter/setter
/// pairs; existing construction sites never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiParams {
    user: String,
    credentials: Vec<u8>,
}

impl Default for ApiParams {
    fn default() -> Self {
        Self {
            user: ANONYMOUS_USER.to_string(),
            credentials: NO_CREDENTIALS.to_vec(),
        }
    }
}

impl ApiParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.set_user(user);
        self
    }

    /// Opaque credentials blob, passed to the backend unexamined.
    pub fn credentials(&self) -> &[u8] {
        &self.credentials
    }

    pub fn set_credentials(&mut self, credentials: impl Into<Vec<u8>>) {
        self.credentials = credentials.into();
    }

    pub fn with_credentials(mut self, credentials: impl Into<Vec<u8>>) -> Self {
        self.set_credentials(credentials);
        self
    }
}

/// A live connection to a backend.
///
/// The object is safe to share across threads; errors surface as
/// [`Result`]s on the calls that produce them rather than through any
/// shared error slot.
pub struct Api {
    backend: Arc<dyn Backend>,
    log: Arc<dyn MessageChannel>,
    params: ApiParams,
}

impl Api {
    /// Connect to the reference backend.
    pub fn connect(params: ApiParams) -> Result<Self> {
        Self::with_backend(params, Arc::new(NullBackend::new()))
    }

    /// Host a vendor driver. This is the seam a real backend plugs into;
    /// everything above it is backend-agnostic.
    pub fn with_backend(params: ApiParams, backend: Arc<dyn Backend>) -> Result<Self> {
        let log = backend.log_channel();
        tracing::debug!(
            user = params.user(),
            version = %backend.version(),
            "connected to backend"
        );
        Ok(Self {
            backend,
            log,
            params,
        })
    }

    pub fn params(&self) -> &ApiParams {
        &self.params
    }

    /// Version of the backing implementation.
    pub fn version(&self) -> Version {
        self.backend.version()
    }

    /// The backend's wall clock, for timeout bookkeeping.
    pub fn current_time(&self) -> Timestamp {
        self.backend.current_time()
    }

    pub fn verbosity(&self) -> u16 {
        self.backend.verbosity()
    }

    pub fn set_verbosity(&self, verbosity: u16) {
        self.backend.set_verbosity(verbosity);
    }

    /// Snapshot of the currently selectable sources. The returned batch is
    /// owned and stays consistent regardless of later backend changes.
    pub fn available_sources(&self) -> Result<Vec<SourceDescription>> {
        self.backend.available_sources()
    }

    /// Open a stream against a named source, or against the backend's
    /// first advertised source when `name` is `None`.
    pub fn open_source(
        &self,
        name: Option<&str>,
        props: StreamProperties,
    ) -> Result<BlobSource> {
        let stream = self.backend.open_source(name, props)?;
        Ok(BlobSource::new(stream))
    }

    /// Turn log message production on or off.
    pub fn set_log_streaming(&self, running: bool) {
        self.log.set_streaming(running);
    }

    /// Register (or with `None`, clear) the log delivery callback.
    /// Registration discards messages queued for polling before the
    /// switch, same as the blob path.
    pub fn set_log_callback(&self, handler: Option<MessageHandler>) {
        self.log.set_callback(handler);
    }

    /// Convenience wrapper around [`Api::set_log_callback`].
    pub fn on_log_message(&self, handler: impl Fn(LogMessage) + Send + Sync + 'static) {
        self.set_log_callback(Some(Arc::new(handler)));
    }

    /// Drain up to `max` queued log messages without waiting; zero means
    /// all. An empty result while streaming just means nothing has
    /// arrived yet.
    pub fn pending_log_messages(&self, max: usize) -> Vec<LogMessage> {
        self.log.pending(max)
    }

    /// Messages below `level` are dropped inside the producer and never
    /// delivered through either path.
    pub fn set_log_minimum_level(&self, level: MessageLevel) {
        self.log.set_minimum_level(level);
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("user", &self.params.user())
            .field("version", &self.backend.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    #[test]
    fn default_params_are_the_anonymous_sentinels() {
        let params = ApiParams::default();
        assert_eq!(params.user(), ANONYMOUS_USER);
        assert_eq!(params.credentials(), NO_CREDENTIALS);
    }

    #[test]
    fn params_builders_compose() {
        let params = ApiParams::new()
            .with_user("operator")
            .with_credentials(vec![1, 2, 3]);
        assert_eq!(params.user(), "operator");
        assert_eq!(params.credentials(), &[1, 2, 3]);
    }

    #[test]
    fn connect_and_enumerate() {
        let api = Api::connect(ApiParams::default()).expect("connect");
        let sources = api.available_sources().expect("enumeration");
        assert!(!sources.is_empty());
        assert!(api.current_time().seconds > 0);
    }

    #[test]
    fn open_by_exact_name_reports_that_name() {
        let api = Api::connect(ApiParams::default()).expect("connect");
        let sources = api.available_sources().expect("enumeration");
        let requested = sources[1].name().to_string();
        let source = api
            .open_source(Some(&requested), StreamProperties::default())
            .expect("open by name");
        assert_eq!(source.info().name(), requested);
    }

    #[test]
    fn open_with_unknown_name_fails() {
        let api = Api::connect(ApiParams::default()).expect("connect");
        let err = api
            .open_source(Some("/no/such/source"), StreamProperties::default())
            .expect_err("unknown name");
        assert!(matches!(err, SourceError::BadParameter(_)));
    }

    #[test]
    fn verbosity_round_trips() {
        let api = Api::connect(ApiParams::default()).expect("connect");
        assert_eq!(api.verbosity(), 0);
        api.set_verbosity(201);
        assert_eq!(api.verbosity(), 201);
    }
}
