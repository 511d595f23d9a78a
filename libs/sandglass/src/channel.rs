// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The dual-mode delivery state machine shared by blob streams and the log
//! channel.
//!
//! A [`DeliveryChannel`] is always in exactly one consumption mode:
//!
//! - **callback**: a handler is registered and the producer invokes it for
//!   every payload, from the producer's own thread;
//! - **poll**: no handler is registered and payloads queue in a FIFO until
//!   drained with [`DeliveryChannel::next`] or [`DeliveryChannel::drain`].
//!
//! Registering a handler (or clearing one) discards anything still queued.
//! Payloads that arrived before the switch are not redelivered through the
//! new mode; this lossy transition is part of the contract, chosen over
//! double delivery.
//!
//! The streaming flag is orthogonal to the mode: a producer consults
//! [`DeliveryChannel::is_streaming`] to decide whether to produce at all.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A registered payload consumer. Invoked synchronously from the producer
/// thread, so implementations must return promptly or they stall
/// production.
pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct DeliveryChannel<T> {
    streaming: AtomicBool,
    /// The registered handler. Guarded separately from the queue, and never
    /// held while the handler runs: client code inside the handler must be
    /// free to call [`DeliveryChannel::set_handler`] without deadlocking
    /// against its own delivery.
    handler: Mutex<Option<Handler<T>>>,
    queue: Mutex<VecDeque<T>>,
    arrived: Condvar,
}

impl<T> DeliveryChannel<T> {
    pub fn new() -> Self {
        Self {
            streaming: AtomicBool::new(false),
            handler: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
        }
    }

    pub fn set_streaming(&self, running: bool) {
        self.streaming.store(running, Ordering::Relaxed);
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    /// Switch consumption mode.
    ///
    /// `Some` enters callback mode, `None` reverts to poll mode. Either way
    /// the FIFO is flushed: anything queued before the switch is dropped
    /// rather than delivered twice.
    pub fn set_handler(&self, handler: Option<Handler<T>>) {
        *self.handler.lock() = handler;
        self.queue.lock().clear();
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Producer side: hand one payload to the current consumption mode.
    ///
    /// The handler slot is snapshotted under its lock and the handler runs
    /// outside it.
    pub fn deliver(&self, item: T) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(item),
            None => {
                self.queue.lock().push_back(item);
                self.arrived.notify_one();
            }
        }
    }

    /// Poll side: wait up to `timeout` for the next queued payload.
    ///
    /// A zero timeout returns immediately with whatever is already queued
    /// (or `None`). Expiry returns `None`; absence of data is not an error.
    pub fn next(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                return Some(item);
            }
            if timeout.is_zero() {
                return None;
            }
            if self.arrived.wait_until(&mut queue, deadline).timed_out() {
                return queue.pop_front();
            }
        }
    }

    /// Poll side: drain up to `max` queued payloads without waiting.
    /// `max` of zero drains everything.
    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut queue = self.queue.lock();
        let take = if max == 0 { queue.len() } else { max.min(queue.len()) };
        queue.drain(..take).collect()
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

impl<T> Default for DeliveryChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn poll_mode_queues_in_order() {
        let channel = DeliveryChannel::new();
        channel.deliver(1);
        channel.deliver(2);
        channel.deliver(3);
        assert_eq!(channel.next(Duration::ZERO), Some(1));
        assert_eq!(channel.drain(0), vec![2, 3]);
        assert_eq!(channel.next(Duration::ZERO), None);
    }

    #[test]
    fn callback_mode_bypasses_the_queue() {
        let channel = DeliveryChannel::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        channel.set_handler(Some(Arc::new(move |n: usize| {
            counter.fetch_add(n, Ordering::SeqCst);
        })));

        channel.deliver(5);
        channel.deliver(7);
        assert_eq!(seen.load(Ordering::SeqCst), 12);
        assert_eq!(channel.queued(), 0);
    }

    #[test]
    fn registering_a_handler_discards_queued_payloads() {
        let channel = DeliveryChannel::new();
        channel.deliver(1);
        channel.deliver(2);
        assert_eq!(channel.queued(), 2);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        channel.set_handler(Some(Arc::new(move |_: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        // The switch flushed the queue and nothing was redelivered.
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        channel.set_handler(None);
        assert_eq!(channel.next(Duration::ZERO), None);
    }

    #[test]
    fn clearing_a_handler_also_flushes() {
        let channel = DeliveryChannel::<i32>::new();
        channel.deliver(1);
        channel.set_handler(None);
        assert_eq!(channel.next(Duration::ZERO), None);
    }

    #[test]
    fn next_wakes_on_cross_thread_delivery() {
        let channel = Arc::new(DeliveryChannel::new());
        let producer = Arc::clone(&channel);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.deliver(42);
        });
        assert_eq!(channel.next(Duration::from_secs(5)), Some(42));
        handle.join().expect("producer thread");
    }

    #[test]
    fn next_times_out_empty() {
        let channel = DeliveryChannel::<i32>::new();
        let start = Instant::now();
        assert_eq!(channel.next(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn handler_may_swap_itself_without_deadlock() {
        let channel = Arc::new(DeliveryChannel::new());
        let inner = Arc::clone(&channel);
        channel.set_handler(Some(Arc::new(move |_: i32| {
            inner.set_handler(None);
        })));
        channel.deliver(1i32);
        assert!(!channel.has_handler());
    }

    #[test]
    fn streaming_flag_is_orthogonal_to_mode() {
        let channel = DeliveryChannel::<i32>::new();
        assert!(!channel.is_streaming());
        channel.set_streaming(true);
        assert!(channel.is_streaming());
        channel.set_handler(Some(Arc::new(|_: i32| {})));
        assert!(channel.is_streaming());
        channel.set_streaming(false);
        assert!(channel.has_handler());
    }
}
