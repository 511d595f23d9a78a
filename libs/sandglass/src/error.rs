// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

/// Errors reported by the client and vendor halves of the SDK.
///
/// Timeouts are deliberately not represented here: a poll accessor that
/// runs out of time returns `None`, because "no data yet" is an expected
/// outcome, not a failure.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

impl SourceError {
    /// Shorthand for the most common rejection.
    pub fn bad_parameter(msg: impl Into<String>) -> Self {
        SourceError::BadParameter(msg.into())
    }
}
