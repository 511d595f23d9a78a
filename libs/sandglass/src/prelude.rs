// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commonly used types for `use sandglass::prelude::*`.

pub use crate::{
    // Errors
    error::{Result, SourceError},

    // Client half
    api::{Api, ApiParams},
    blob::DataBlob,
    message::{LogMessage, MessageLevel},
    source::{BlobSource, SourceDescription, StreamProperties},
    time::{Timestamp, Version},

    // Vendor half
    backend::{Backend, BlobHandler, BlobStream, MessageChannel, MessageHandler, NullBackend},
};
