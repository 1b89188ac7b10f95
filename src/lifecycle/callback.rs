//! Cleanup callbacks registered on a terminate signal.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// A zero-argument cleanup action, run at most once.
pub enum Callback {
    /// Synchronous work, run on the blocking thread pool.
    Blocking(Box<dyn FnOnce() + Send + 'static>),
    /// Asynchronous work, run as a tokio task.
    Async(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + 'static>),
}

impl Callback {
    /// Wrap a synchronous closure.
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Callback::Blocking(Box::new(f))
    }

    /// Wrap a closure that produces a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Callback::Async(Box::new(move || f().boxed()))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Callback::Blocking(_) => "blocking",
            Callback::Async(_) => "async",
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.kind()).finish()
    }
}
