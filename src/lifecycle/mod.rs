//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (terminate.rs):
//!     TerminateSignal::new() → register_callback(..) → stop_context() to workers
//!
//! Trigger (signals.rs / context.rs):
//!     SIGINT/SIGTERM/SIGQUIT → SignalListener::recv
//!     or an external StopContext → cancelled()
//!
//! Shutdown (shutdown.rs):
//!     Trigger → close_all(policy) → each TerminateSignal::close
//!         → run callbacks → cancel stop context → drain WaitGroup
//! ```
//!
//! # Design Decisions
//! - One termination trigger per orchestrator call, never re-armed
//! - Close is once-only per terminate signal; repeats are absorbed
//! - No deadline on the close itself: a stuck callback stalls shutdown

pub mod callback;
pub mod context;
pub mod shutdown;
pub mod signals;
pub mod terminate;
pub mod tracker;

pub use callback::Callback;
pub use context::{StopContext, StopError, StopTrigger};
pub use shutdown::{
    close_all, wait_for, wait_for_async, wait_for_force_sync, wait_for_signals, wait_for_sync,
    wait_until, wait_with_trigger, ClosePolicy, ParsePolicyError,
};
#[allow(deprecated)]
pub use shutdown::waiting_for_graceful_shutdown;
pub use signals::{SignalError, SignalKind, SignalListener};
pub use terminate::TerminateSignal;
pub use tracker::{WaitGroup, WaitGuard};
