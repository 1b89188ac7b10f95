//! Graceful process shutdown.
//!
//! Subsystems register cleanup callbacks on a [`TerminateSignal`], hand its
//! [`StopContext`] to their long-running work, and pass the signals to one of
//! the `wait_for*` entry points. Once a termination signal (or an external
//! trigger) arrives, every signal is closed under the chosen [`ClosePolicy`].
//!
//! ```no_run
//! use graceful_shutdown::{wait_for_async, TerminateSignal};
//!
//! # async fn run() {
//! let signal = TerminateSignal::new().named("db");
//! signal.register_callback(|| println!("closing database"));
//! wait_for_async(&[signal]).await;
//! # }
//! ```

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ShutdownConfig;
pub use lifecycle::{
    close_all, wait_for, wait_for_async, wait_for_force_sync, wait_for_signals, wait_for_sync,
    wait_until, wait_with_trigger, Callback, ClosePolicy, SignalKind, StopContext, StopError,
    TerminateSignal, WaitGroup,
};
#[allow(deprecated)]
pub use lifecycle::waiting_for_graceful_shutdown;
