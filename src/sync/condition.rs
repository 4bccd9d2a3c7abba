/*!
 * Payload Condition
 *
 * A condition variable whose notify call carries a payload.
 *
 * # Design: Per-Waiter Delivery Slots
 *
 * Waiters queue FIFO as slots, each with its own wake signal and
 * payload cell. A notify pops the targeted slots and delivers a clone
 * of the payload to each, so a waiter always observes exactly the
 * payload of the notify that woke it, never one from a later call.
 *
 * Cancellation (dropping a suspended `wait` future) is handled by a
 * scoped cleanup guard: a slot still queued is removed; a slot that was
 * already targeted has its wake re-homed, payload attached, to the next
 * queued waiter, or parked for the next `wait` call when the queue is
 * empty. A targeted wake is therefore consumed exactly once no matter
 * when its original waiter disappears.
 *
 * All operations enforce the condition-variable discipline: the caller
 * must hold the associated exclusion lock, and `wait` releases it for
 * the duration of the suspension and holds it again when it returns.
 */

use super::lock::TaskLock;
use super::types::{SyncError, SyncResult, WakeResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// One queued waiter: a wake signal and a cell for the delivered payload
struct WaitSlot<T> {
    wake: Notify,
    payload: Mutex<Option<T>>,
}

impl<T> WaitSlot<T> {
    fn new() -> Self {
        Self {
            wake: Notify::new(),
            payload: Mutex::new(None),
        }
    }

    /// Hand the payload to this slot and wake its waiter
    fn deliver(&self, payload: T) {
        *self.payload.lock() = Some(payload);
        self.wake.notify_one();
    }
}

/// Queue and delivery state, guarded by one internal mutex
struct ConditionState<T> {
    waiters: VecDeque<Arc<WaitSlot<T>>>,
    /// Wakes whose targeted waiter was cancelled before consuming them;
    /// claimed by the next `wait` call
    parked_wakes: VecDeque<T>,
}

/// Condition variable that passes a payload to the waiters it wakes
///
/// Used like a regular condition variable: the caller acquires the
/// exclusion lock, then waits or notifies. Waiters are admitted and
/// woken in FIFO order.
pub struct PayloadCondition<T>
where
    T: Clone,
{
    lock: Arc<TaskLock>,
    state: Mutex<ConditionState<T>>,
}

impl<T> PayloadCondition<T>
where
    T: Clone,
{
    /// Create a condition backed by a fresh exclusion lock
    pub fn new() -> Self {
        Self::with_lock(Arc::new(TaskLock::new()))
    }

    /// Create a condition backed by an existing exclusion lock
    pub fn with_lock(lock: Arc<TaskLock>) -> Self {
        Self {
            lock,
            state: Mutex::new(ConditionState {
                waiters: VecDeque::new(),
                parked_wakes: VecDeque::new(),
            }),
        }
    }

    /// The exclusion lock associated with this condition
    pub fn lock(&self) -> &Arc<TaskLock> {
        &self.lock
    }

    /// Number of tasks currently queued on the condition
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Wake up to `count` queued waiters, delivering `payload` to each
    ///
    /// The count is clamped to the queue length; `0` is a no-op. Does
    /// not release the exclusion lock. Fails with
    /// [`SyncError::LockNotHeld`] if the lock is not held.
    pub fn notify(&self, count: usize, payload: T) -> SyncResult<WakeResult> {
        if !self.lock.is_locked() {
            return Err(SyncError::LockNotHeld(
                "notify on a payload condition".into(),
            ));
        }

        let mut state = self.state.lock();
        let targeted = count.min(state.waiters.len());
        if targeted == 0 {
            return Ok(WakeResult::NoWaiters);
        }
        for _ in 0..targeted {
            if let Some(slot) = state.waiters.pop_front() {
                slot.deliver(payload.clone());
            }
        }
        Ok(WakeResult::Woken(targeted))
    }

    /// Wake every currently queued waiter, delivering `payload` to each
    pub fn notify_all(&self, payload: T) -> SyncResult<WakeResult> {
        self.notify(usize::MAX, payload)
    }

    /// Suspend until targeted by a notify and return the delivered payload
    ///
    /// The exclusion lock is released for the duration of the
    /// suspension and held again once `wait` returns. Fails with
    /// [`SyncError::LockNotHeld`] if the lock is not held on entry.
    pub async fn wait(&self) -> SyncResult<T> {
        if !self.lock.is_locked() {
            return Err(SyncError::LockNotHeld("wait on a payload condition".into()));
        }

        let slot = Arc::new(WaitSlot::new());
        {
            let mut state = self.state.lock();
            if let Some(parked) = state.parked_wakes.pop_front() {
                // stand in for a cancelled waiter; the lock is already
                // held, so this wake is consumed without suspending
                return Ok(parked);
            }
            state.waiters.push_back(Arc::clone(&slot));
        }

        let mut guard = WaiterGuard {
            condition: self,
            slot: Arc::clone(&slot),
            armed: true,
        };

        self.lock.release()?;

        loop {
            slot.wake.notified().await;
            self.lock.acquire().await;
            if let Some(payload) = slot.payload.lock().take() {
                guard.armed = false;
                return Ok(payload);
            }
            // woken without a delivery; put the lock back and keep waiting
            self.lock.release()?;
        }
    }
}

impl<T> Default for PayloadCondition<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cleanup for a waiter that leaves `wait` on any path but a consumed wake
struct WaiterGuard<'a, T>
where
    T: Clone,
{
    condition: &'a PayloadCondition<T>,
    slot: Arc<WaitSlot<T>>,
    armed: bool,
}

impl<T> Drop for WaiterGuard<'_, T>
where
    T: Clone,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.condition.state.lock();
        if let Some(pos) = state
            .waiters
            .iter()
            .position(|queued| Arc::ptr_eq(queued, &self.slot))
        {
            state.waiters.remove(pos);
            return;
        }
        // already targeted by a notify; the wake must not be lost
        if let Some(payload) = self.slot.payload.lock().take() {
            if let Some(next) = state.waiters.pop_front() {
                next.deliver(payload);
            } else {
                state.parked_wakes.push_back(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    async fn spawn_waiter(
        condition: &Arc<PayloadCondition<&'static str>>,
    ) -> tokio::task::JoinHandle<&'static str> {
        let condition = Arc::clone(condition);
        let handle = tokio::spawn(async move {
            condition.lock().acquire().await;
            let payload = condition.wait().await.unwrap();
            condition.lock().release().unwrap();
            payload
        });
        sleep(Duration::from_millis(20)).await;
        handle
    }

    #[tokio::test]
    async fn test_wait_requires_lock() {
        let condition = PayloadCondition::<u32>::new();
        let err = condition.wait().await.unwrap_err();
        assert!(matches!(err, SyncError::LockNotHeld(_)));
    }

    #[tokio::test]
    async fn test_notify_requires_lock() {
        let condition = PayloadCondition::new();
        let err = condition.notify(1, 7u32).unwrap_err();
        assert!(matches!(err, SyncError::LockNotHeld(_)));
    }

    #[tokio::test]
    async fn test_notify_delivers_payload() {
        let condition = Arc::new(PayloadCondition::new());
        let waiter = spawn_waiter(&condition).await;
        assert_eq!(condition.waiter_count(), 1);

        condition.lock().acquire().await;
        let woken = condition.notify(1, "ping").unwrap();
        condition.lock().release().unwrap();

        assert_eq!(woken, WakeResult::Woken(1));
        assert_eq!(waiter.await.unwrap(), "ping");
        assert_eq!(condition.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_clamps_to_queue_length() {
        let condition = Arc::new(PayloadCondition::new());
        let waiter = spawn_waiter(&condition).await;

        condition.lock().acquire().await;
        let woken = condition.notify(5, "ping").unwrap();
        condition.lock().release().unwrap();

        assert_eq!(woken, WakeResult::Woken(1));
        assert_eq!(waiter.await.unwrap(), "ping");
    }

    #[tokio::test]
    async fn test_notify_zero_is_noop() {
        let condition = Arc::new(PayloadCondition::new());
        let waiter = spawn_waiter(&condition).await;

        condition.lock().acquire().await;
        let woken = condition.notify(0, "ping").unwrap();
        assert_eq!(woken, WakeResult::NoWaiters);
        assert_eq!(condition.waiter_count(), 1);

        // wake the queued waiter so the task does not linger
        condition.notify_all("done").unwrap();
        condition.lock().release().unwrap();
        assert_eq!(waiter.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_notify_empty_queue() {
        let condition = PayloadCondition::new();
        condition.lock().acquire().await;
        let woken = condition.notify_all("ping").unwrap();
        condition.lock().release().unwrap();
        assert_eq!(woken, WakeResult::NoWaiters);
    }

    #[tokio::test]
    async fn test_waiters_woken_in_admission_order() {
        let condition = Arc::new(PayloadCondition::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut waiters = Vec::new();
        for id in 0..3usize {
            let condition = Arc::clone(&condition);
            let order = Arc::clone(&order);
            waiters.push(tokio::spawn(async move {
                condition.lock().acquire().await;
                let payload = condition.wait().await.unwrap();
                condition.lock().release().unwrap();
                order.lock().push(id);
                payload
            }));
            // admit one at a time so the queue order is deterministic
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(condition.waiter_count(), 3);

        condition.lock().acquire().await;
        condition.notify(2, "first").unwrap();
        condition.lock().release().unwrap();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(*order.lock(), vec![0, 1]);
        assert_eq!(condition.waiter_count(), 1);

        condition.lock().acquire().await;
        condition.notify_all("second").unwrap();
        condition.lock().release().unwrap();

        let mut payloads = Vec::new();
        for waiter in waiters {
            payloads.push(waiter.await.unwrap());
        }
        assert_eq!(payloads, vec!["first", "first", "second"]);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_queue() {
        let condition = Arc::new(PayloadCondition::<&str>::new());
        let waiter = spawn_waiter(&condition).await;
        assert_eq!(condition.waiter_count(), 1);

        waiter.abort();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(condition.waiter_count(), 0);
        assert!(!condition.lock().is_locked());
    }

    #[tokio::test]
    async fn test_condition_over_shared_lock() {
        let lock = Arc::new(TaskLock::new());
        let condition = Arc::new(PayloadCondition::with_lock(Arc::clone(&lock)));
        let waiter = spawn_waiter(&condition).await;

        lock.acquire().await;
        condition.notify(1, "shared").unwrap();
        lock.release().unwrap();

        assert_eq!(waiter.await.unwrap(), "shared");
    }
}
