// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Sandglass: a binary-stable streaming-source SDK.
//!
//! The SDK is shaped like an hourglass. This crate is both wide halves:
//!
//! - the **client half** — [`Api`], [`BlobSource`], [`DataBlob`],
//!   [`LogMessage`]: what applications link against;
//! - the **vendor half** — the [`backend`] traits: what a driver
//!   implements to feed blobs and log messages into the machinery.
//!
//! The narrow waist — the frozen, handle-based protocol that lets the two
//! halves be compiled by different toolchains — lives in the companion
//! `sandglass-abi` crate and is the only layer with a stability guarantee.
//!
//! Everything stateful here follows the same delivery discipline: a source
//! is either in *callback* mode (a registered handler is invoked from the
//! producer thread) or in *poll* mode (payloads queue until drained with a
//! bounded wait). See [`channel::DeliveryChannel`] for the rules, including
//! the deliberate queue flush when a handler is registered.

// Suppress pedantic clippy warnings that are intentional design choices
#![allow(clippy::type_complexity)] // Handler slot types are clear in context
#![allow(clippy::should_implement_trait)] // Method names are contextually clear

pub mod api;
pub mod backend;
pub mod blob;
pub mod channel;
pub mod error;
pub mod message;
pub mod prelude;
pub mod source;
pub mod time;
pub mod worker;

pub use api::{Api, ApiParams, ANONYMOUS_USER, NO_CREDENTIALS};
pub use blob::{BlobBacking, DataBlob};
pub use channel::DeliveryChannel;
pub use error::{Result, SourceError};
pub use message::{LogMessage, MessageLevel};
pub use source::{BlobSource, SourceDescription, StreamProperties};
pub use time::{Timestamp, Version};
