// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The closed numeric status space shared by every boundary operation.
//!
//! These integers are part of the frozen protocol: never renumber, only
//! append. Codes at or below [`HIGHEST_WARNING`] are successes or
//! warnings; everything above it is an error.

use sandglass::error::SourceError;

pub type Status = i32;

/// The operation succeeded.
pub const OKAY: Status = 0;
/// No data arrived within the bound. Not an error.
pub const TIMEOUT: Status = 1;

/// Threshold: codes above this value are errors.
pub const HIGHEST_WARNING: Status = 1000;

/// A caller-supplied parameter was invalid.
pub const BAD_PARAMETER: Status = 1001;
/// The implementation could not allocate what the operation needed.
pub const OUT_OF_MEMORY: Status = 1002;
/// The operation is not implemented by this backend.
pub const NOT_IMPLEMENTED: Status = 1003;
/// Destroy was called on a null or already-destroyed handle.
pub const DELETE_OF_NULL_HANDLE: Status = 1004;
/// Teardown of the underlying object failed.
pub const DELETION_FAILED: Status = 1005;
/// An operation other than destroy was called on a null or dead handle.
pub const NULL_OBJECT: Status = 1006;
/// A panic inside the implementation was converted at the boundary.
pub const INTERNAL_PANIC: Status = 1007;

pub fn is_error(status: Status) -> bool {
    status > HIGHEST_WARNING
}

/// Stable human-readable form of a status code. Unknown codes map to a
/// generic string rather than failing.
pub fn status_message(status: Status) -> &'static str {
    match status {
        OKAY => "No error",
        TIMEOUT => "Timeout",
        BAD_PARAMETER => "Bad parameter",
        OUT_OF_MEMORY => "Out of memory",
        NOT_IMPLEMENTED => "Feature not implemented",
        DELETE_OF_NULL_HANDLE => "Deletion of null handle",
        DELETION_FAILED => "Handle deletion failed",
        NULL_OBJECT => "Object method called with null handle",
        INTERNAL_PANIC => "Panic inside implementation",
        _ => "Unrecognized status code",
    }
}

/// Flatten a typed error from the `sandglass` halves into the numeric
/// space.
pub(crate) fn from_error(err: &SourceError) -> Status {
    match err {
        SourceError::BadParameter(_) => BAD_PARAMETER,
        SourceError::NotImplemented(_) => NOT_IMPLEMENTED,
        SourceError::Backend(_) => INTERNAL_PANIC,
    }
}
