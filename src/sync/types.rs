/*!
 * Sync Types
 * Shared result and outcome types for the notification primitives
 */

use thiserror::Error;

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronization operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Operation requires the exclusion lock and the caller does not hold it
    #[error("Lock not held: {0}")]
    LockNotHeld(String),

    /// Callback argument cannot be invoked per waiter
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),
}

/// Result of a notify operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Targeted N queued waiters (N >= 1)
    Woken(usize),
    /// No waiters were targeted
    NoWaiters,
}

impl WakeResult {
    /// Check if any waiters were targeted
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of targeted waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}
