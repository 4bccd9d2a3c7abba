/*!
 * Exclusion Locks
 *
 * Async mutual exclusion with explicit acquire/release.
 *
 * # Design: Explicit Ownership Over RAII Guards
 *
 * The condition-variable discipline hands lock ownership across a
 * suspension point: `wait` releases the lock while suspended and holds
 * it again when it returns. A guard tied to a lexical scope cannot
 * express that, so `TaskLock` exposes `acquire`/`release` directly and
 * backs them with a single-permit FIFO semaphore. `is_locked` supports
 * the held-lock check that condition operations enforce.
 */

use super::types::{SyncError, SyncResult};
use log::{log, Level};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Async mutual-exclusion lock with explicit acquire/release
///
/// Acquirers are served in FIFO order. Not reentrant: a task acquiring
/// a lock it already holds will deadlock, same as any mutex.
pub struct TaskLock {
    permits: Semaphore,
}

impl TaskLock {
    /// Create a new unlocked lock
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
        }
    }

    /// Acquire the lock, suspending until it is free
    pub async fn acquire(&self) {
        match self.permits.acquire().await {
            Ok(permit) => permit.forget(),
            // the semaphore lives and dies with this lock and is never closed
            Err(_) => unreachable!("lock semaphore closed"),
        }
    }

    /// Acquire the lock without suspending
    ///
    /// Returns `true` if the lock was acquired.
    pub fn try_acquire(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Release the lock
    ///
    /// Fails with [`SyncError::LockNotHeld`] if the lock is not held.
    pub fn release(&self) -> SyncResult<()> {
        if !self.is_locked() {
            return Err(SyncError::LockNotHeld(
                "release of a lock that is not held".into(),
            ));
        }
        self.permits.add_permits(1);
        Ok(())
    }

    /// Check whether any task currently holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for TaskLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging decorator over [`TaskLock`]
///
/// Logs lock transitions (waiting, acquired, released) with the lock's
/// name, optionally annotated per call. Carries no semantics of its
/// own; `inner()` exposes the backing lock so a payload condition can
/// share it when lock-transition logging is desired.
pub struct TracedLock {
    name: String,
    level: Level,
    inner: Arc<TaskLock>,
}

impl TracedLock {
    /// Create a named lock that logs transitions at debug level
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_level(name, Level::Debug)
    }

    /// Create a named lock that logs transitions at the given level
    pub fn with_level(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
            inner: Arc::new(TaskLock::new()),
        }
    }

    /// Decorate an existing lock, logging at debug level
    pub fn over(name: impl Into<String>, lock: Arc<TaskLock>) -> Self {
        Self {
            name: name.into(),
            level: Level::Debug,
            inner: lock,
        }
    }

    /// The backing lock
    pub fn inner(&self) -> Arc<TaskLock> {
        Arc::clone(&self.inner)
    }

    /// Acquire the lock, logging the wait and the acquisition
    pub async fn acquire(&self) {
        self.acquire_annotated("").await
    }

    /// Acquire with a per-call annotation included in the log lines
    pub async fn acquire_annotated(&self, note: &str) {
        log!(
            self.level,
            "{} waiting for acquisition.{}",
            self.name,
            Self::suffix(note)
        );
        self.inner.acquire().await;
        log!(self.level, "{} acquired.{}", self.name, Self::suffix(note));
    }

    /// Release the lock, logging the release
    pub fn release(&self) -> SyncResult<()> {
        self.release_annotated("")
    }

    /// Release with a per-call annotation included in the log line
    pub fn release_annotated(&self, note: &str) -> SyncResult<()> {
        self.inner.release()?;
        log!(self.level, "{} released.{}", self.name, Self::suffix(note));
        Ok(())
    }

    /// Check whether any task currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    fn suffix(note: &str) -> String {
        if note.is_empty() {
            String::new()
        } else {
            format!(" {}", note)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_acquire_release() {
        let lock = TaskLock::new();
        assert!(!lock.is_locked());

        lock.acquire().await;
        assert!(lock.is_locked());

        lock.release().unwrap();
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_release_unheld_fails() {
        let lock = TaskLock::new();
        let err = lock.release().unwrap_err();
        assert!(matches!(err, SyncError::LockNotHeld(_)));
    }

    #[tokio::test]
    async fn test_try_acquire() {
        let lock = TaskLock::new();
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());

        lock.release().unwrap();
        assert!(lock.try_acquire());
        lock.release().unwrap();
    }

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let lock = Arc::new(TaskLock::new());
        lock.acquire().await;

        let contender = {
            let lock = lock.clone();
            tokio::spawn(async move {
                lock.acquire().await;
                lock.release().unwrap();
            })
        };

        sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        lock.release().unwrap();
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_traced_lock_delegates() {
        let traced = TracedLock::new("test_lock");
        traced.acquire_annotated("in test").await;
        assert!(traced.is_locked());
        assert!(traced.inner().is_locked());

        traced.release_annotated("in test").unwrap();
        assert!(!traced.is_locked());
    }

    #[tokio::test]
    async fn test_traced_lock_shares_backing_lock() {
        let backing = Arc::new(TaskLock::new());
        let traced = TracedLock::over("shared", Arc::clone(&backing));

        backing.acquire().await;
        assert!(traced.is_locked());

        traced.release().unwrap();
        assert!(!backing.is_locked());
    }
}
