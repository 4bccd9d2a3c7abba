/*!
 * Notification
 *
 * Round-based payload broadcast between cooperative tasks.
 *
 * # Design: Barrier-Serialized Rounds
 *
 * A round runs Drained -> Notifying -> Draining -> Drained. `send`
 * snapshots the queued waiters under the exclusion lock, publishes the
 * payload to the targeted count, and then waits on the drain barrier,
 * so it returns only after every targeted waiter has consumed its
 * wake. The barrier also gates the next `send`: rounds never overlap.
 *
 * `pending_wakes` tracks the unconsumed wakes of the in-flight round;
 * the waiter that decrements it to zero resolves the barrier. The
 * barrier is therefore unresolved exactly while `pending_wakes > 0`,
 * and the counter never goes negative (decrements saturate).
 */

use super::barrier::DrainBarrier;
use super::callback::{Callback, Invocable};
use super::condition::PayloadCondition;
use super::lock::TaskLock;
use super::types::SyncResult;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// Synchronization object that passes a payload to waiting tasks, one
/// round at a time
///
/// A `send` wakes a chosen number of queued receivers and hands each of
/// them the payload; it returns only once every one of them has
/// consumed it, and the next `send` cannot begin before then.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use task_notify::Notification;
///
/// let rt = tokio::runtime::Builder::new_current_thread()
///     .enable_time()
///     .build()
///     .unwrap();
/// rt.block_on(async {
///     let notification = Arc::new(Notification::<String>::new());
///
///     let receiver = {
///         let notification = Arc::clone(&notification);
///         tokio::spawn(async move { notification.recv().await.unwrap() })
///     };
///
///     // let the receiver queue up before notifying
///     tokio::time::sleep(Duration::from_millis(10)).await;
///     notification.send("hello world!".to_string()).await.unwrap();
///
///     assert_eq!(receiver.await.unwrap(), "hello world!");
/// });
/// ```
pub struct Notification<T>
where
    T: Clone + Send + 'static,
{
    condition: PayloadCondition<T>,
    barrier: DrainBarrier,
    pending: Mutex<usize>,
    /// Serializes producers so two `send` calls cannot interleave their
    /// round setup on a multi-threaded runtime
    producer: tokio::sync::Mutex<()>,
}

impl<T> Notification<T>
where
    T: Clone + Send + 'static,
{
    /// Create a notification backed by a fresh exclusion lock
    pub fn new() -> Self {
        Self::with_lock(Arc::new(TaskLock::new()))
    }

    /// Create a notification whose condition shares an existing lock
    pub fn with_lock(lock: Arc<TaskLock>) -> Self {
        Self {
            condition: PayloadCondition::with_lock(lock),
            barrier: DrainBarrier::new(),
            pending: Mutex::new(0),
            producer: tokio::sync::Mutex::new(()),
        }
    }

    /// Wake every currently queued receiver with `message`
    ///
    /// No-op when no receivers are queued; messages are not buffered
    /// for future receivers. Returns once every woken receiver has
    /// consumed the message.
    pub async fn send(&self, message: T) -> SyncResult<()> {
        self.send_round(None, message).await
    }

    /// Wake at most `count` queued receivers with `message`
    ///
    /// The count is clamped to the number of queued receivers; the rest
    /// stay queued for a later round. `0` is a no-op.
    pub async fn send_n(&self, count: usize, message: T) -> SyncResult<()> {
        self.send_round(Some(count), message).await
    }

    async fn send_round(&self, limit: Option<usize>, message: T) -> SyncResult<()> {
        let _round = self.producer.lock().await;
        self.barrier.wait_drained().await;

        let lock = self.condition.lock();
        lock.acquire().await;

        // receivers queue while holding the lock, so this is an exact
        // snapshot; anyone arriving later belongs to a later round
        let queued = self.condition.waiter_count();
        let wake_count = limit.map_or(queued, |count| count.min(queued));
        if wake_count == 0 {
            lock.release()?;
            debug!("notification send with no targeted waiters, skipping");
            return Ok(());
        }

        *self.pending.lock() = wake_count;
        self.barrier.clear();
        let woken = self.condition.notify(wake_count, message);
        lock.release()?;
        let woken = woken?;
        debug!(
            "notification round started: {} of {} queued waiters targeted",
            woken.count(),
            queued
        );

        self.barrier.wait_drained().await;
        debug!("notification round drained");
        Ok(())
    }

    /// Suspend until notified and return the message
    pub async fn recv(&self) -> SyncResult<T> {
        self.recv_with(Callback::immediate(|message| message)).await
    }

    /// Suspend until notified and return the message passed through
    /// `callback`
    ///
    /// The callback runs while the exclusion lock is still held, so
    /// concurrent receivers serialize through it: a slow or suspending
    /// callback delays every other waiter of the round. An
    /// already-started operation is rejected with
    /// [`SyncError::InvalidCallback`](super::types::SyncError) before
    /// any wait state is touched.
    pub async fn recv_with<R>(&self, callback: Callback<T, R>) -> SyncResult<R> {
        let invocable = callback.into_invocable()?;

        let lock = self.condition.lock();
        lock.acquire().await;
        let message = match self.condition.wait().await {
            Ok(message) => message,
            Err(err) => {
                // wait only fails before it releases the lock
                let _ = lock.release();
                return Err(err);
            }
        };

        let output = match invocable {
            Invocable::Immediate(f) => f(message),
            Invocable::Deferred(f) => f(message).await,
        };

        let drained = {
            let mut pending = self.pending.lock();
            *pending = pending.saturating_sub(1);
            *pending == 0
        };
        lock.release()?;
        if drained {
            self.barrier.resolve();
        }
        Ok(output)
    }

    /// Suspend until the in-flight round has fully drained
    ///
    /// Returns immediately when no round is in flight.
    pub async fn wait_for_all_notified(&self) {
        self.barrier.wait_drained().await;
    }

    /// Unconsumed wakes of the in-flight round (for diagnostics)
    pub fn pending_wakes(&self) -> usize {
        *self.pending.lock()
    }

    /// Number of receivers currently queued (for diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.condition.waiter_count()
    }

    /// Whether the last round has fully drained
    pub fn is_drained(&self) -> bool {
        self.barrier.is_drained()
    }
}

impl<T> Default for Notification<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
