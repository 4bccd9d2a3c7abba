/*!
 * Task Synchronization Primitives
 *
 * Payload-carrying wake/notify coordination for cooperative tasks:
 * - `PayloadCondition`: condition variable whose notify delivers a payload
 * - `Notification`: round-based broadcast with wake-count accounting and
 *   a drain barrier gating the next round
 * - `TaskLock` / `TracedLock`: the explicit-ownership exclusion lock
 *   backing the condition, plus a logging decorator over it
 *
 * # Architecture
 *
 * The condition owns the FIFO wait queue and the per-waiter delivery;
 * the notification layers round accounting on top: a `send` targets the
 * waiters queued at that moment and returns only once each of them has
 * consumed the payload, and no new round starts before then.
 */

pub mod callback;
pub mod condition;
pub mod lock;
pub mod notification;
pub mod types;

mod barrier;

pub use callback::Callback;
pub use condition::PayloadCondition;
pub use lock::{TaskLock, TracedLock};
pub use notification::Notification;
pub use types::{SyncError, SyncResult, WakeResult};
