//! Stop contexts handed to long-running work.
//!
//! # Responsibilities
//! - Carry a "should I stop" signal from a terminate signal to its consumers
//! - Report why the context stopped (explicit cancel vs. deadline)
//! - Propagate cancellation from parent to child contexts
//!
//! # Design Decisions
//! - Deadlines are checked lazily against the tokio clock, no timer task
//! - The first observed stop reason is latched and never changes
//! - Only the [`StopTrigger`] can cancel; the context itself is read-only

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a [`StopContext`] has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StopError {
    /// The context (or one of its parents) was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context (or one of its parents) passed its deadline.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    reason: OnceLock<StopError>,
    /// Earliest deadline along the parent chain.
    deadline: Option<Instant>,
    parent: Option<StopContext>,
}

/// A cheaply cloneable, read-only view of a cancellation scope.
#[derive(Debug, Clone)]
pub struct StopContext {
    inner: Arc<Inner>,
}

impl StopContext {
    /// A root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                reason: OnceLock::new(),
                deadline: None,
                parent: None,
            }),
        }
    }

    /// Derive a child context that stops when `trigger` fires or the parent stops.
    pub fn with_cancel(parent: &StopContext) -> (StopContext, StopTrigger) {
        Self::with_timeout(parent, None)
    }

    /// Derive a child context that additionally stops once `timeout` elapses.
    ///
    /// `None` or a zero duration means the child has no deadline of its own.
    pub fn with_timeout(
        parent: &StopContext,
        timeout: Option<Duration>,
    ) -> (StopContext, StopTrigger) {
        let own = timeout
            .filter(|timeout| !timeout.is_zero())
            .map(|timeout| Instant::now() + timeout);
        let deadline = match (own, parent.inner.deadline) {
            (Some(own), Some(inherited)) => Some(own.min(inherited)),
            (own, inherited) => own.or(inherited),
        };

        let ctx = StopContext {
            inner: Arc::new(Inner {
                token: parent.inner.token.child_token(),
                reason: OnceLock::new(),
                deadline,
                parent: Some(parent.clone()),
            }),
        };
        let trigger = StopTrigger { ctx: ctx.clone() };
        (ctx, trigger)
    }

    /// Why the context stopped, or `None` while it is still live.
    pub fn err(&self) -> Option<StopError> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }

        let observed = if self.inner.token.is_cancelled() {
            // Cancelled through the token chain: an ancestor knows why.
            self.inner
                .parent
                .as_ref()
                .and_then(StopContext::err)
                .unwrap_or(StopError::Canceled)
        } else {
            match self.inner.deadline {
                Some(deadline) if Instant::now() >= deadline => StopError::DeadlineExceeded,
                _ => return None,
            }
        };

        let reason = *self.inner.reason.get_or_init(|| observed);
        self.inner.token.cancel();
        Some(reason)
    }

    /// Whether the context has stopped for any reason.
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// The earliest deadline that applies to this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves once the context stops.
    ///
    /// Safe to use inside `tokio::select!`.
    pub async fn cancelled(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }
    }
}

impl Default for StopContext {
    fn default() -> Self {
        Self::background()
    }
}

/// One-shot cancel handle for a [`StopContext`].
#[derive(Debug, Clone)]
pub struct StopTrigger {
    ctx: StopContext,
}

impl StopTrigger {
    /// Cancel the context. Repeated calls are no-ops.
    ///
    /// A context that already stopped keeps its original reason.
    pub fn cancel(&self) {
        if self.ctx.err().is_none() {
            let _ = self.ctx.inner.reason.set(StopError::Canceled);
        }
        self.ctx.inner.token.cancel();
    }

    /// The context this trigger cancels.
    pub fn context(&self) -> &StopContext {
        &self.ctx
    }
}
