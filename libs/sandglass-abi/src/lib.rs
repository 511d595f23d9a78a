// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The narrow waist of the sandglass hourglass: a flattened, frozen handle
//! protocol over the typed `sandglass` API.
//!
//! Client applications and vendor drivers link against this layer so that
//! either side can be rebuilt, by a different toolchain, without breaking
//! the other. That only works if this surface never moves, so the rules
//! here are stricter than ordinary semver:
//!
//! - every function signature, once shipped, is frozen; new capabilities
//!   arrive as new functions and new parameter-bundle setters, never as
//!   changed signatures;
//! - no struct layout crosses the boundary. Stateful objects are reached
//!   through opaque address-sized tokens (`XHandle`) into arenas owned by
//!   this crate, with a create/destroy pair and getter/setter pairs per
//!   field;
//! - the [`status`] code space is append-only: never renumber;
//! - errors cross as status codes, never as unwinding. Every entry point
//!   runs behind a failure boundary that converts a panic in the
//!   implementation into [`status::INTERNAL_PANIC`];
//! - operations that do not hand their status back directly also record
//!   it in the object's per-thread status cell, readable exactly once via
//!   `*_get_status`.
//!
//! Raw pointers and `extern "C"` callback types exist only here; the
//! `sandglass` crate itself never sees them.

#![allow(clippy::missing_safety_doc)] // Safety contracts documented on the unsafe functions themselves
#![allow(clippy::type_complexity)] // Callback slot types are clear in context

pub mod api;
pub mod blob;
pub mod message;
pub mod registry;
pub mod source;
pub mod status;

// The protocol reads as one flat function table, the way its consumers
// bind it.
pub use api::*;
pub use blob::*;
pub use message::*;
pub use source::*;

use status::Status;

/// Version of the handle protocol itself. Independent of the crate
/// version: it moves only on a binary-incompatible change, which the
/// rules above exist to prevent.
pub const SANDGLASS_ABI_VERSION: u32 = 1;

/// Failure boundary: run `f`, converting a panic into
/// [`status::INTERNAL_PANIC`] instead of letting it unwind into caller
/// code that may not share our runtime.
pub(crate) fn guarded(f: impl FnOnce() -> Status) -> Status {
    // AssertUnwindSafe: on the Err path every touched structure is either
    // dropped with the payload or owned by a poisoning-free parking_lot
    // lock, so observing it afterwards is fine.
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!("panic reached the boundary layer, converted to status");
        status::INTERNAL_PANIC
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_passes_statuses_through() {
        assert_eq!(guarded(|| status::OKAY), status::OKAY);
        assert_eq!(guarded(|| status::TIMEOUT), status::TIMEOUT);
    }

    #[test]
    fn guarded_converts_panics() {
        let status = guarded(|| panic!("backend bug"));
        assert_eq!(status, status::INTERNAL_PANIC);
    }
}
