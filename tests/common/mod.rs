//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graceful_shutdown::TerminateSignal;

/// A terminate signal with `n` callbacks that each bump the returned counter.
pub fn counting_signal(n: usize) -> (TerminateSignal, Arc<AtomicUsize>) {
    let signal = TerminateSignal::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..n {
        let counter = counter.clone();
        signal.register_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    (signal, counter)
}

/// An ordered log of events written from callbacks.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Register a callback on `signal` that records `start`, sleeps, then records `end`.
    pub fn register_span(&self, signal: &TerminateSignal, label: &str, busy: Duration) {
        let recorder = self.clone();
        let label = label.to_string();
        signal.register_callback(move || {
            recorder.record(format!("{label}:start"));
            std::thread::sleep(busy);
            recorder.record(format!("{label}:end"));
        });
    }
}
