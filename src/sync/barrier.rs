/*!
 * Drain Barrier
 * Resettable drained/not-drained flag with suspending wait
 */

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Binary barrier tracking whether the in-flight round has drained
///
/// Starts in the drained state. `wait_drained` suspends while a round
/// is in flight and resumes when `resolve` is called.
pub(crate) struct DrainBarrier {
    drained: AtomicBool,
    notify: Notify,
}

impl DrainBarrier {
    pub(crate) fn new() -> Self {
        Self {
            drained: AtomicBool::new(true),
            notify: Notify::new(),
        }
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.drained.load(Ordering::SeqCst)
    }

    /// Mark a round in flight
    pub(crate) fn clear(&self) {
        self.drained.store(false, Ordering::SeqCst);
    }

    /// Mark the round drained and wake everything waiting on it
    pub(crate) fn resolve(&self) {
        self.drained.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Suspend until the barrier is in the drained state
    pub(crate) async fn wait_drained(&self) {
        loop {
            // register interest before testing the flag so a resolve
            // landing in between cannot be missed
            let resolved = self.notify.notified();
            if self.is_drained() {
                return;
            }
            resolved.await;
        }
    }
}
