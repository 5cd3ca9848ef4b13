//! Cold, multi-valued results.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::QueueError;

/// Stream of values produced by the queue, such as
/// [`SpoolQueue::stream_size`](crate::SpoolQueue::stream_size).
///
/// Nothing happens until the stream is polled or observed. An `Err` item is
/// always the last one: the stream ends right after it.
pub struct ResultStream<T> {
    inner: BoxStream<'static, Result<T, QueueError>>,
    runtime: Handle,
}

impl<T> ResultStream<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(inner: BoxStream<'static, Result<T, QueueError>>, runtime: Handle) -> Self {
        Self { inner, runtime }
    }

    /// Consume the stream on the queue's runtime, calling `callback` for each
    /// item until the stream ends or the returned [`Subscription`] is
    /// disposed.
    pub fn observe<F>(self, mut callback: F) -> Subscription
    where
        F: FnMut(Result<T, QueueError>) + Send + 'static,
    {
        let Self { mut inner, runtime } = self;
        let handle = runtime.spawn(async move {
            while let Some(item) = inner.next().await {
                callback(item);
            }
        });
        Subscription { handle }
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T, QueueError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream").finish_non_exhaustive()
    }
}

/// Handle to a running [`ResultStream::observe`] consumer.
///
/// Dropping the subscription leaves the consumer running; call
/// [`Subscription::dispose`] to stop it.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering items. No callback runs after the consumer task
    /// observes the cancellation.
    pub fn dispose(&self) {
        self.handle.abort();
    }

    /// True once the stream has ended or the subscription was disposed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the consumer has stopped.
    pub async fn finished(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio::sync::mpsc;

    fn numbers(values: Vec<Result<u32, QueueError>>) -> ResultStream<u32> {
        ResultStream::new(stream::iter(values).boxed(), Handle::current())
    }

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        let items: Vec<_> = numbers(vec![Ok(1), Ok(2), Err(QueueError::Cancelled)])
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &1);
        assert_eq!(items[1].as_ref().unwrap(), &2);
        assert!(matches!(items[2], Err(QueueError::Cancelled)));
    }

    #[tokio::test]
    async fn test_observe_delivers_until_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = numbers(vec![Ok(4), Ok(5)]).observe(move |item| {
            let _ = tx.send(item.unwrap());
        });

        subscription.finished().await;
        assert_eq!(rx.recv().await, Some(4));
        assert_eq!(rx.recv().await, Some(5));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dispose_stops_pending_stream() {
        let stream = ResultStream::<u32>::new(stream::pending().boxed(), Handle::current());
        let subscription = stream.observe(|_| {});
        assert!(!subscription.is_finished());

        subscription.dispose();
        subscription.finished().await;
    }
}
