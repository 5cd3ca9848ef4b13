//! One-shot, memoized outcome of a single queue operation.
//!
//! A [`Deferred`] is handed out as soon as a request is submitted. The queue
//! worker resolves it exactly once through the matching [`Completer`]; from
//! then on every waiter and observer sees the same stored outcome. Waiting
//! again never re-runs the operation.

use std::fmt;
use std::future::IntoFuture;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::error::QueueError;

type Slot<R> = Option<Result<R, QueueError>>;

/// Handle to the eventual result of a queue operation.
///
/// ```rust,no_run
/// # use spool_q::{SpoolQueue, Utf8Converter};
/// # async fn run() -> Result<(), spool_q::QueueError> {
/// let queue = SpoolQueue::<String>::builder().build(Utf8Converter)?;
///
/// let pushed = queue.push("a".to_string());
/// assert!(pushed.clone().await?);
/// // Same outcome, the push is not repeated.
/// assert!(pushed.wait().await?);
///
/// queue.size().observe(|size| println!("size: {:?}", size));
/// # Ok(())
/// # }
/// ```
pub struct Deferred<R> {
    rx: watch::Receiver<Slot<R>>,
    runtime: Handle,
}

/// Resolving side of a [`Deferred`].
///
/// Dropping it without calling [`Completer::complete`] resolves the
/// `Deferred` as [`QueueError::Cancelled`].
pub(crate) struct Completer<R> {
    tx: watch::Sender<Slot<R>>,
}

impl<R> Completer<R> {
    pub(crate) fn complete(self, outcome: Result<R, QueueError>) {
        self.tx.send_replace(Some(outcome));
    }
}

impl<R> Deferred<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn channel(runtime: Handle) -> (Self, Completer<R>) {
        let (tx, rx) = watch::channel(None);
        (Self { rx, runtime }, Completer { tx })
    }

    /// A handle that is already resolved.
    pub(crate) fn ready(outcome: Result<R, QueueError>, runtime: Handle) -> Self {
        let (deferred, completer) = Self::channel(runtime);
        completer.complete(outcome);
        deferred
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> Result<R, QueueError> {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(QueueError::Cancelled))
    }

    /// Block the current thread until the outcome is known.
    ///
    /// Must not be called from inside an async context; use
    /// [`Deferred::wait`] or `.await` there.
    pub fn blocking_wait(&self) -> Result<R, QueueError> {
        futures::executor::block_on(self.wait())
    }

    /// True once the operation has succeeded, failed or been cancelled.
    pub fn is_completed(&self) -> bool {
        self.rx.borrow().is_some() || self.rx.has_changed().is_err()
    }

    /// Run `callback` with the outcome once it is known.
    ///
    /// The callback runs as a task on the queue's runtime, also when the
    /// outcome is already available. Any number of observers may attach.
    pub fn observe<F>(&self, callback: F)
    where
        F: FnOnce(Result<R, QueueError>) + Send + 'static,
    {
        let this = self.clone();
        self.runtime.spawn(async move {
            callback(this.wait().await);
        });
    }
}

impl<R> Clone for Deferred<R> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<R> fmt::Debug for Deferred<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.rx.borrow() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<R> IntoFuture for Deferred<R>
where
    R: Clone + Send + Sync + 'static,
{
    type Output = Result<R, QueueError>;
    type IntoFuture = BoxFuture<'static, Result<R, QueueError>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.wait().await }.boxed()
    }
}
