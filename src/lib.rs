/*!
 * Task Notify
 * Payload-carrying wake/notify primitives for cooperative async tasks
 */

pub mod sync;

// Re-exports
pub use sync::{
    Callback, Notification, PayloadCondition, SyncError, SyncResult, TaskLock, TracedLock,
    WakeResult,
};
