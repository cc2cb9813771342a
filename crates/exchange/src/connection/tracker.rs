use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::connection::WriteCallback;

/// Outstanding and failed writes of one exchange.
///
/// Completion callbacks may run on the connection's writer task, so the
/// counters are atomic. A failed write is sticky: once recorded the exchange
/// stays failed.
#[derive(Debug, Default)]
pub struct WriteTracker {
    pending: AtomicUsize,
    failed: AtomicBool,
    idle: Notify,
}

impl WriteTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a write and returns the callback that completes it.
    pub fn begin(self: &Arc<Self>) -> WriteCallback {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let tracker = Arc::clone(self);
        Box::new(move |success| tracker.complete(success))
    }

    fn complete(&self, success: bool) {
        if !success {
            self.failed.store(true, Ordering::Release);
        }
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub fn record_failure(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until no write is outstanding. Returns `false` when any write
    /// of the exchange failed.
    pub async fn wait_idle(&self) -> bool {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.pending() == 0 {
                return !self.has_failed();
            }
            idle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn failure_is_sticky() {
        let tracker = WriteTracker::new();
        tracker.begin()(false);
        tracker.begin()(true);
        assert!(tracker.has_failed());
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn wait_idle_resumes_on_completion() {
        let tracker = WriteTracker::new();
        let callback = tracker.begin();

        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        callback(true);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn wait_idle_without_writes() {
        let tracker = WriteTracker::new();
        assert!(tracker.wait_idle().await);
    }
}
