//! Completion tracking for in-flight work.

use std::sync::Arc;

use tokio::sync::watch;

/// A counter of in-flight work with an async wait-for-zero.
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone)]
pub struct WaitGroup {
    count: Arc<watch::Sender<usize>>,
}

impl WaitGroup {
    /// Create a tracker with nothing in flight.
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
        }
    }

    /// Record `n` more units of in-flight work.
    pub fn add(&self, n: usize) {
        self.count.send_modify(|count| *count += n);
    }

    /// Mark one unit of work as finished.
    pub fn done(&self) {
        let mut underflow = false;
        self.count.send_if_modified(|count| match count.checked_sub(1) {
            Some(next) => {
                *count = next;
                true
            }
            None => {
                underflow = true;
                false
            }
        });
        if underflow {
            tracing::warn!("WaitGroup::done called with nothing in flight");
        }
    }

    /// Record one unit of work, finished when the returned guard drops.
    pub fn guard(&self) -> WaitGuard {
        self.add(1);
        WaitGuard {
            group: self.clone(),
        }
    }

    /// Current number of units in flight.
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once nothing is in flight.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// A RAII guard that marks one unit of work finished on drop.
#[derive(Debug)]
pub struct WaitGuard {
    group: WaitGroup,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_on_idle_group_returns_immediately() {
        let group = WaitGroup::new();
        group.wait().await;
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn test_wait_until_all_done() {
        let group = WaitGroup::new();
        group.add(3);

        for i in 0..3u64 {
            let group = group.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10 * (i + 1))).await;
                group.done();
            });
        }

        group.wait().await;
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn test_guard_decrements_on_drop() {
        let group = WaitGroup::new();
        let guard = group.guard();
        assert_eq!(group.count(), 1);

        drop(guard);
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn test_done_below_zero_is_absorbed() {
        let group = WaitGroup::new();
        group.done();
        assert_eq!(group.count(), 0);

        group.add(1);
        assert_eq!(group.count(), 1);
    }
}
