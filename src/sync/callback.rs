/*!
 * Receive Callbacks
 *
 * The invocable-with-payload contract for `Notification::recv_with`.
 *
 * # Design: Tagged Variants Over Runtime Inspection
 *
 * A callback must be something that can be STARTED once per waiter: a
 * synchronous closure or a closure producing a fresh future. An
 * operation that was already started cannot be replayed, so it gets its
 * own variant and is rejected at the call boundary instead of being
 * detected mid-flight.
 */

use super::types::{SyncError, SyncResult};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

/// Transformation applied to a received payload while the exclusion
/// lock is held
///
/// Extra arguments beyond the payload are closure captures.
pub enum Callback<T, R> {
    /// Synchronous transform of the payload
    Immediate(Box<dyn FnOnce(T) -> R + Send>),
    /// Callable that starts a suspending computation for the payload
    Deferred(Box<dyn FnOnce(T) -> BoxFuture<'static, R> + Send>),
    /// An operation that was already started; rejected by `recv_with`
    /// with [`SyncError::InvalidCallback`]
    Started(BoxFuture<'static, R>),
}

impl<T, R> Callback<T, R> {
    /// Callback applied synchronously to the payload
    pub fn immediate<F>(f: F) -> Self
    where
        F: FnOnce(T) -> R + Send + 'static,
    {
        Callback::Immediate(Box::new(f))
    }

    /// Callback that starts a suspending computation for the payload
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Callback::Deferred(Box::new(move |payload| f(payload).boxed()))
    }

    /// Validate at the call boundary, before any wait state is touched
    pub(crate) fn into_invocable(self) -> SyncResult<Invocable<T, R>> {
        match self {
            Callback::Immediate(f) => Ok(Invocable::Immediate(f)),
            Callback::Deferred(f) => Ok(Invocable::Deferred(f)),
            Callback::Started(_) => Err(SyncError::InvalidCallback(
                "an already-started operation cannot be replayed per waiter; pass a callable"
                    .into(),
            )),
        }
    }
}

/// A callback that passed boundary validation
pub(crate) enum Invocable<T, R> {
    Immediate(Box<dyn FnOnce(T) -> R + Send>),
    Deferred(Box<dyn FnOnce(T) -> BoxFuture<'static, R> + Send>),
}

impl<T, R> std::fmt::Debug for Invocable<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocable::Immediate(_) => f.write_str("Invocable::Immediate(..)"),
            Invocable::Deferred(_) => f.write_str("Invocable::Deferred(..)"),
        }
    }
}
