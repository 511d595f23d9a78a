// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The producer worker thread owned by every stream object.

use std::thread::JoinHandle;
use std::time::Duration;

/// Interval between shutdown checks. Stopping a worker blocks for at most
/// about one tick.
const TICK: Duration = Duration::from_millis(1);

/// A dedicated producer thread that runs a tick closure for the lifetime
/// of its owner.
///
/// The closure is responsible for its own pacing (a blob source emits at
/// its configured rate, the log channel on a fixed cadence); the worker
/// only guarantees the closure runs roughly every [`TICK`] and that drop
/// stops and joins the thread.
pub struct PacedWorker {
    label: String,
    shutdown_tx: crossbeam_channel::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PacedWorker {
    pub fn spawn(label: impl Into<String>, mut tick: impl FnMut() + Send + 'static) -> Self {
        let label = label.into();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_label = label.clone();
        let handle = std::thread::spawn(move || {
            tracing::debug!("[{}] producer thread started", thread_label);
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                tick();
                std::thread::sleep(TICK);
            }
            tracing::debug!("[{}] producer thread stopped", thread_label);
        });

        Self {
            label,
            shutdown_tx,
            handle: Some(handle),
        }
    }
}

impl Drop for PacedWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("[{}] producer thread panicked", self.label);
            }
        }
    }
}
