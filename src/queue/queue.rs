use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::runtime::Handle;
use uuid::Uuid;

use super::{Deferred, ResultStream};
use crate::actor::QueueActor;
use crate::config::QueueConfig;
use crate::converter::{ConversionError, Converter};
use crate::error::QueueError;
use crate::storage::{Driver, InMemoryDriver};

/// A persistent FIFO queue of `T`.
///
/// Every method only submits a request and returns immediately; the result
/// arrives through the returned [`Deferred`]. Clones share the same queue.
pub struct SpoolQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    actor: QueueActor<T>,
    config: QueueConfig,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if self.config.close_on_drop {
            self.actor.close();
        }
    }
}

impl<T> SpoolQueue<T> {
    pub fn builder() -> SpoolQueueBuilder<T> {
        SpoolQueueBuilder::new()
    }

    pub fn name(&self) -> &str {
        self.shared.actor.name()
    }

    /// Identifier of this queue instance, as logged in the `spool_queue` span.
    pub fn id(&self) -> Uuid {
        self.shared.actor.id()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Close the queue.
    ///
    /// New requests fail with [`QueueError::Closed`]. The request the worker
    /// is executing completes; requests still queued fail with
    /// [`QueueError::Cancelled`]; the driver is closed exactly once and live
    /// [`ResultStream`]s end with an error. Calling it again does nothing.
    pub fn close(&self) {
        self.shared.actor.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.actor.is_closed()
    }

    /// Wait until the worker has closed the driver and cancelled what was
    /// left.
    pub async fn closed(&self) {
        self.shared.actor.closed().await
    }
}

impl<T> SpoolQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Append `value` at the tail. Resolves to true iff it was persisted.
    ///
    /// The value is encoded right away, so a conversion failure is reported
    /// without touching the driver.
    pub fn push(&self, value: T) -> Deferred<bool> {
        self.shared.actor.push(&value)
    }

    /// Remove and return the head, or `None` when the queue is empty.
    pub fn poll(&self) -> Deferred<Option<T>> {
        self.shared.actor.poll()
    }

    /// The head without removing it.
    pub fn peek(&self) -> Deferred<Option<T>> {
        self.shared.actor.peek()
    }

    /// Up to `limit` values from the head, in order. `None` returns all.
    pub fn peek_list(&self, limit: Option<usize>) -> Deferred<Vec<T>> {
        self.shared.actor.peek_list(limit)
    }

    pub fn size(&self) -> Deferred<usize> {
        self.shared.actor.size()
    }

    /// The current size, then the size after every change, until the queue
    /// closes.
    ///
    /// The stream is cold: it does nothing until polled, and each call
    /// returns an independent stream. Changes that happen in quick
    /// succession may be reported as one.
    pub fn stream_size(&self) -> ResultStream<usize> {
        self.shared.actor.stream_size()
    }

    /// Remove the head. Resolves to false when the queue was empty.
    pub fn remove_head(&self) -> Deferred<bool> {
        self.shared.actor.remove_head()
    }

    /// Remove up to `limit` values from the head (`None` removes all).
    /// Resolves to the number removed.
    pub fn remove(&self, limit: Option<usize>) -> Deferred<usize> {
        self.shared.actor.remove(limit)
    }

    /// Replace every value with `f(value)`, keeping the order. Resolves to
    /// the number of values rewritten.
    ///
    /// ```rust,no_run
    /// # use spool_q::{SpoolQueue, Utf8Converter};
    /// # async fn run(queue: SpoolQueue<String>) -> Result<(), spool_q::QueueError> {
    /// let updated = queue.mutate(|line| line.to_uppercase()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn mutate<F>(&self, f: F) -> Deferred<usize>
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.shared.actor.try_mutate(move |value| Ok(f(value)))
    }

    /// Like [`SpoolQueue::mutate`], but `f` may reject a value. One rejected
    /// value (or a panic in `f`) aborts the whole mutation and leaves every
    /// value as it was.
    pub fn try_mutate<F>(&self, f: F) -> Deferred<usize>
    where
        F: Fn(T) -> Result<T, ConversionError> + Send + Sync + 'static,
    {
        self.shared.actor.try_mutate(f)
    }
}

impl<T> Clone for SpoolQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for SpoolQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpoolQueue")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for [`SpoolQueue`].
///
/// Defaults: [`QueueConfig::default`], an [`InMemoryDriver`] and the tokio
/// runtime the builder is called from.
pub struct SpoolQueueBuilder<T> {
    config: QueueConfig,
    driver: Option<Box<dyn Driver>>,
    runtime: Option<Handle>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SpoolQueueBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            driver: None,
            runtime: None,
            _marker: PhantomData,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bound the number of requests waiting for the worker.
    pub fn max_pending_requests(mut self, limit: usize) -> Self {
        self.config.max_pending_requests = Some(limit);
        self
    }

    pub fn close_on_drop(mut self, close_on_drop: bool) -> Self {
        self.config.close_on_drop = close_on_drop;
        self
    }

    /// Storage driver; the queue takes exclusive ownership of it.
    pub fn driver<D>(mut self, driver: D) -> Self
    where
        D: Driver + 'static,
    {
        self.driver = Some(Box::new(driver));
        self
    }

    /// Runtime the worker task is spawned on.
    ///
    /// Closing the queue only stops its own worker, never the runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

impl<T> SpoolQueueBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start the worker and return the queue.
    ///
    /// Fails with [`QueueError::Configuration`] when no runtime was given and
    /// the builder is not called from within one.
    pub fn build<C>(self, converter: C) -> Result<SpoolQueue<T>, QueueError>
    where
        C: Converter<T>,
    {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| {
                QueueError::Configuration(format!("no tokio runtime available: {}", e))
            })?,
        };
        let driver = self
            .driver
            .unwrap_or_else(|| Box::new(InMemoryDriver::new()));

        let actor = QueueActor::spawn(driver, Arc::new(converter), &self.config, runtime);

        Ok(SpoolQueue {
            shared: Arc::new(Shared {
                actor,
                config: self.config,
            }),
        })
    }
}

impl<T> Default for SpoolQueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
