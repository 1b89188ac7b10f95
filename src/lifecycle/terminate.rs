//! Terminate signals: shutdown-aware units of work.
//!
//! # Responsibilities
//! - Own a stop context that consumers poll or select on
//! - Collect cleanup callbacks until the signal is closed
//! - Run every callback exactly once when the signal is closed
//!
//! # Design Decisions
//! - Close is guarded by a compare-and-swap on the closed flag
//! - Late closers wait for the winning pass instead of re-running callbacks
//! - Registration after close is silently dropped
//! - Callback panics are contained and logged, never propagated

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::lifecycle::callback::Callback;
use crate::lifecycle::context::{StopContext, StopTrigger};
use crate::lifecycle::tracker::WaitGroup;

/// How a single terminate signal runs its own callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// One task per callback, unordered completion.
    Concurrent,
    /// One callback at a time, in registration order.
    Sequential,
}

#[derive(Debug)]
struct Inner {
    name: OnceLock<String>,
    ctx: StopContext,
    trigger: StopTrigger,
    callbacks: Mutex<Vec<Callback>>,
    inflight: WaitGroup,
    closed: AtomicBool,
    drained: watch::Sender<bool>,
}

/// A shutdown-aware unit owning a stop context and its cleanup callbacks.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct TerminateSignal {
    inner: Arc<Inner>,
}

impl TerminateSignal {
    /// A signal with no deadline, derived from the background context.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// A signal whose stop context also expires after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self::with_context(&StopContext::background(), timeout)
    }

    /// A signal whose stop context is derived from `parent`.
    ///
    /// `None` or a zero timeout means no deadline of its own.
    pub fn with_context(parent: &StopContext, timeout: Option<Duration>) -> Self {
        let (ctx, trigger) = StopContext::with_timeout(parent, timeout);
        let (drained, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                name: OnceLock::new(),
                ctx,
                trigger,
                callbacks: Mutex::new(Vec::new()),
                inflight: WaitGroup::new(),
                closed: AtomicBool::new(false),
                drained,
            }),
        }
    }

    /// Attach a name used in log fields. Only the first name sticks.
    pub fn named(self, name: impl Into<String>) -> Self {
        let _ = self.inner.name.set(name.into());
        self
    }

    pub fn name(&self) -> &str {
        self.inner.name.get().map(String::as_str).unwrap_or("unnamed")
    }

    /// Register a synchronous cleanup callback.
    pub fn register_callback<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_callbacks([Callback::blocking(f)]);
    }

    /// Register an asynchronous cleanup callback.
    pub fn register_async_callback<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.register_callbacks([Callback::future(f)]);
    }

    /// Append callbacks in iteration order.
    ///
    /// Does nothing once the signal is closed; such callbacks never run.
    pub fn register_callbacks<I>(&self, callbacks: I)
    where
        I: IntoIterator<Item = Callback>,
    {
        let mut registry = self.lock_callbacks();
        if self.is_closed() {
            tracing::debug!(signal = self.name(), "Ignoring callback registration after close");
            return;
        }

        let before = registry.len();
        registry.extend(callbacks);
        tracing::debug!(
            signal = self.name(),
            added = registry.len() - before,
            total = registry.len(),
            "Registered cancel callbacks"
        );
    }

    /// The stop context consumers should watch for cancellation.
    pub fn stop_context(&self) -> StopContext {
        self.inner.ctx.clone()
    }

    /// Whether a close has started on this signal.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of callbacks waiting for the close pass.
    pub fn callback_count(&self) -> usize {
        self.lock_callbacks().len()
    }

    /// Close the signal, running its callbacks concurrently.
    ///
    /// `done` is marked finished once the callbacks have drained, whether
    /// this call performed the close or an earlier one did. Dropping the
    /// returned future does not abandon a close that has started.
    pub async fn close(&self, done: Option<&WaitGroup>) {
        self.close_with(Dispatch::Concurrent, done).await;
    }

    /// Close the signal, running its callbacks one at a time in registration order.
    pub async fn sync_close(&self, done: Option<&WaitGroup>) {
        self.close_with(Dispatch::Sequential, done).await;
    }

    async fn close_with(&self, dispatch: Dispatch, done: Option<&WaitGroup>) {
        let won = self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if won {
            // The pass runs in its own task and completes even if this future is dropped.
            let finish = FinishClose {
                signal: self.clone(),
                done: done.cloned(),
            };
            let pass = tokio::spawn(async move {
                finish.signal.run_close(dispatch).await;
                drop(finish);
            });
            if let Err(e) = pass.await {
                tracing::error!(signal = self.name(), error = %e, "Close pass failed");
            }
            return;
        }

        tracing::debug!(signal = self.name(), "Close already performed, waiting for drain");
        let mut drained = self.inner.drained.subscribe();
        let _ = drained.wait_for(|drained| *drained).await;

        if let Some(done) = done {
            done.done();
        }
    }

    async fn run_close(&self, dispatch: Dispatch) {
        let started = Instant::now();
        let callbacks = std::mem::take(&mut *self.lock_callbacks());
        let total = callbacks.len();

        tracing::debug!(
            signal = self.name(),
            callbacks = total,
            dispatch = ?dispatch,
            "Closing terminate signal"
        );

        for (index, callback) in callbacks.into_iter().enumerate() {
            let handle = self.spawn_worker(index, callback);
            if dispatch == Dispatch::Sequential {
                if let Err(e) = handle.await {
                    tracing::error!(signal = self.name(), index, error = %e, "Cancel callback task failed");
                }
            }
        }

        self.inner.trigger.cancel();
        self.inner.inflight.wait().await;

        tracing::debug!(
            signal = self.name(),
            callbacks = total,
            elapsed = ?started.elapsed(),
            "Terminate signal closed"
        );
    }

    fn spawn_worker(&self, index: usize, callback: Callback) -> JoinHandle<()> {
        let guard = self.inner.inflight.guard();
        let signal = self.clone();

        match callback {
            Callback::Blocking(f) => tokio::task::spawn_blocking(move || {
                let _guard = guard;
                signal.trace_stopped(index);
                if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
                    signal.report_panic(index, &*panic);
                }
            }),
            Callback::Async(f) => tokio::spawn(async move {
                let _guard = guard;
                signal.trace_stopped(index);
                let run = AssertUnwindSafe(async move { f().await });
                if let Err(panic) = run.catch_unwind().await {
                    signal.report_panic(index, &*panic);
                }
            }),
        }
    }

    // Callbacks run regardless of how the context stopped.
    fn trace_stopped(&self, index: usize) {
        if let Some(reason) = self.inner.ctx.err() {
            tracing::trace!(signal = self.name(), index, %reason, "Running callback on stopped context");
        }
    }

    fn report_panic(&self, index: usize, payload: &(dyn Any + Send)) {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        tracing::error!(signal = self.name(), index, panic = message, "Cancel callback panicked");
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes the drained state and releases the winner's handle when the
/// close pass ends, even by panic.
struct FinishClose {
    signal: TerminateSignal,
    done: Option<WaitGroup>,
}

impl Drop for FinishClose {
    fn drop(&mut self) {
        if let Some(done) = &self.done {
            done.done();
        }
        self.signal.inner.drained.send_replace(true);
    }
}

impl Default for TerminateSignal {
    fn default() -> Self {
        Self::new()
    }
}
