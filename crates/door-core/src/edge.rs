//! Edge notifier
//!
//! A single-slot wakeup set from the sensor pin interrupt and consumed by the
//! reporting loop. Any number of edges before a wait coalesce into a single
//! wakeup; the direction of the edge is not recorded because the loop always
//! re-reads the pin level.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, with_timeout};

/// Why a wait on the notifier returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Edge,
    Timeout,
}

pub struct EdgeNotifier {
    pending: Signal<CriticalSectionRawMutex, ()>,
}

impl EdgeNotifier {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
        }
    }

    /// Mark an edge as pending. Safe to call from interrupt context.
    #[inline]
    pub fn notify(&self) {
        self.pending.signal(());
    }

    /// Handle given to the interrupt handler at setup time.
    pub const fn trigger(&self) -> EdgeTrigger<'_> {
        EdgeTrigger { notifier: self }
    }

    /// Drop a pending edge without waking anyone.
    pub fn clear(&self) {
        self.pending.reset();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.signaled()
    }

    /// Wait for a pending edge, or until `timeout` elapses.
    ///
    /// A pending edge is consumed on return, so an edge that arrived before
    /// the call completes it immediately. `None` waits without bound.
    pub async fn wait(&self, timeout: Option<Duration>) -> Wakeup {
        match timeout {
            None => {
                self.pending.wait().await;
                Wakeup::Edge
            }
            Some(timeout) => match with_timeout(timeout, self.pending.wait()).await {
                Ok(()) => Wakeup::Edge,
                Err(_) => Wakeup::Timeout,
            },
        }
    }
}

impl Default for EdgeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Copyable, allocation-free handle for the interrupt context.
#[derive(Clone, Copy)]
pub struct EdgeTrigger<'a> {
    notifier: &'a EdgeNotifier,
}

impl EdgeTrigger<'_> {
    /// Non-blocking; never logs or allocates.
    #[inline]
    pub fn fire(self) {
        self.notifier.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use embassy_time::{Instant, Timer};
    use futures::executor::block_on;

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn test_burst_of_edges_coalesces_into_one_wakeup() {
        let notifier = EdgeNotifier::new();
        for _ in 0..5 {
            notifier.notify();
        }

        assert_eq!(block_on(notifier.wait(Some(SHORT))), Wakeup::Edge);
        assert!(!notifier.is_pending());
        assert_eq!(block_on(notifier.wait(Some(SHORT))), Wakeup::Timeout);
    }

    #[test]
    fn test_wait_times_out_without_edges() {
        let notifier = EdgeNotifier::new();
        let start = Instant::now();
        assert_eq!(block_on(notifier.wait(Some(SHORT))), Wakeup::Timeout);
        assert!(start.elapsed() >= SHORT);
    }

    #[test]
    fn test_clear_discards_pending_edge() {
        let notifier = EdgeNotifier::new();
        notifier.trigger().fire();
        assert!(notifier.is_pending());

        notifier.clear();
        assert!(!notifier.is_pending());
        assert_eq!(block_on(notifier.wait(Some(SHORT))), Wakeup::Timeout);
    }

    #[test]
    fn test_edge_during_wait_wakes_unbounded_wait() {
        let notifier = EdgeNotifier::new();
        let trigger = notifier.trigger();

        let (wakeup, _) = block_on(join(notifier.wait(None), async {
            Timer::after(SHORT).await;
            trigger.fire();
        }));

        assert_eq!(wakeup, Wakeup::Edge);
        assert!(!notifier.is_pending());
    }
}
