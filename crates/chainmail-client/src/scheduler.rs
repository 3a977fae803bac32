//! Interval scheduling with first-class cancellation.
//!
//! Polling loops are modelled as `schedule(interval, task) -> handle` so
//! that teardown (unmount, account change) is an explicit, testable
//! contract rather than incidental cleanup.  The first tick fires
//! immediately, which gives the "poll at once on account/auth change"
//! behaviour for free.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a scheduled task.  Cancelling (or dropping) the handle stops
/// the interval loop; an individual in-flight task run is not interrupted
/// mid-await by `cancel`, it simply never gets a next tick.
#[derive(Debug)]
pub struct ScheduleHandle {
    handle: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn cancel(&self) {
        debug!("cancelling scheduled task");
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `task` now and then every `interval` until the handle is cancelled.
pub fn schedule<F, Fut>(interval: Duration, mut task: F) -> ScheduleHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow task run should not cause a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            task().await;
        }
    });

    ScheduleHandle { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_on_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let _handle = schedule(Duration::from_secs(5), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // First tick is immediate.
        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let handle = schedule(Duration::from_secs(5), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::advance(Duration::from_millis(10)).await;
        handle.cancel();
        let before = count.load(Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        {
            let _handle = schedule(Duration::from_secs(5), move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            });
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        let before = count.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
    }
}
