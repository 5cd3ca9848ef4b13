//! The queue actor: a single worker task serializing every driver call.
//!
//! Callers never touch the driver. Each operation becomes a request on one
//! of two unbounded channels (reads, writes); the worker takes one request
//! at a time from whichever channel is ready and resolves the request's
//! [`Deferred`]. Writes that changed the store bump a coalescing `watch`
//! slot which drives [`QueueActor::stream_size`].

mod request;
mod worker;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use self::request::{ReadRequest, WriteRequest};
use self::worker::Worker;
use crate::config::QueueConfig;
use crate::converter::{ConversionError, Converter};
use crate::error::QueueError;
use crate::queue::deferred::Completer;
use crate::queue::{Deferred, ResultStream};
use crate::storage::{BlobMapper, Driver};

/// State shared between every actor handle and the worker.
pub(crate) struct ActorState {
    name: String,
    id: Uuid,
    closing: AtomicBool,
    /// Requests submitted but not yet taken by the worker.
    pending: AtomicUsize,
    max_pending: Option<usize>,
}

/// Submission side of the queue actor. Cheap to clone.
pub(crate) struct QueueActor<T> {
    read_tx: mpsc::UnboundedSender<ReadRequest<T>>,
    write_tx: mpsc::UnboundedSender<WriteRequest<T>>,
    converter: Arc<dyn Converter<T>>,
    updates: watch::Receiver<u64>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    terminated: watch::Receiver<bool>,
    state: Arc<ActorState>,
    runtime: Handle,
}

impl<T> QueueActor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start the worker on `runtime` and return the first handle.
    pub(crate) fn spawn(
        driver: Box<dyn Driver>,
        converter: Arc<dyn Converter<T>>,
        config: &QueueConfig,
        runtime: Handle,
    ) -> Self {
        let (read_tx, read_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = watch::channel(0u64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (terminated_tx, terminated) = watch::channel(false);

        let state = Arc::new(ActorState {
            name: config.name.clone(),
            id: Uuid::new_v4(),
            closing: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            max_pending: config.max_pending_requests,
        });

        let worker = Worker {
            driver,
            converter: converter.clone(),
            read_rx,
            write_rx,
            updates: updates_tx,
            shutdown_rx,
            terminated: terminated_tx,
            state: state.clone(),
        };
        let span = info_span!("spool_queue", queue = %state.name, id = %state.id);
        runtime.spawn(worker.run().instrument(span));

        Self {
            read_tx,
            write_tx,
            converter,
            updates,
            shutdown_tx: Arc::new(shutdown_tx),
            terminated,
            state,
            runtime,
        }
    }

    /// Encode `value` and append it. Resolves to true iff it was persisted.
    pub(crate) fn push(&self, value: &T) -> Deferred<bool> {
        if self.is_closed() {
            return Deferred::ready(Err(QueueError::Closed), self.runtime.clone());
        }
        match encode_caught(self.converter.as_ref(), value) {
            Ok(blob) => self.submit_write(|reply| WriteRequest::Push { blob, reply }),
            Err(e) => Deferred::ready(Err(e.into()), self.runtime.clone()),
        }
    }

    pub(crate) fn poll(&self) -> Deferred<Option<T>> {
        self.submit_write(|reply| WriteRequest::Poll { reply })
    }

    pub(crate) fn peek(&self) -> Deferred<Option<T>> {
        self.submit_read(|reply| ReadRequest::Peek { reply })
    }

    pub(crate) fn peek_list(&self, limit: Option<usize>) -> Deferred<Vec<T>> {
        self.submit_read(|reply| ReadRequest::PeekList { limit, reply })
    }

    pub(crate) fn size(&self) -> Deferred<usize> {
        self.submit_read(|reply| ReadRequest::Size { reply })
    }

    /// A size read on behalf of a live stream. It is not subject to the
    /// pending limit, so a busy queue never ends a subscription.
    fn tracked_size(&self) -> Deferred<usize> {
        self.enqueue_read(false, |reply| ReadRequest::Size { reply })
    }

    pub(crate) fn remove(&self, limit: Option<usize>) -> Deferred<usize> {
        self.submit_write(|reply| WriteRequest::Remove { limit, reply })
    }

    pub(crate) fn remove_head(&self) -> Deferred<bool> {
        self.submit_write(|reply| WriteRequest::RemoveHead { reply })
    }

    /// Rewrite every entry with `f`, all or nothing.
    ///
    /// `f` runs on the worker once per entry, head first. An error or a
    /// panic from `f`, or a conversion failure, leaves the store unchanged.
    pub(crate) fn try_mutate<F>(&self, f: F) -> Deferred<usize>
    where
        F: Fn(T) -> Result<T, ConversionError> + Send + Sync + 'static,
    {
        let converter = self.converter.clone();
        let mapper: Box<BlobMapper> = Box::new(move |blob: &[u8]| {
            let value = decode_caught(converter.as_ref(), blob)?;
            let mapped = panic::catch_unwind(AssertUnwindSafe(|| f(value)))
                .map_err(|_| ConversionError::new("mutate closure panicked"))??;
            encode_caught(converter.as_ref(), &mapped)
        });
        self.submit_write(|reply| WriteRequest::Mutate { mapper, reply })
    }

    /// Live queue size: the current size on subscription, then once per
    /// coalesced change until the queue closes.
    pub(crate) fn stream_size(&self) -> ResultStream<usize> {
        let actor = self.clone();
        let sizes = async_stream::stream! {
            let mut updates = actor.updates.clone();
            loop {
                updates.borrow_and_update();
                match actor.tracked_size().await {
                    Ok(size) => yield Ok(size),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
                if updates.changed().await.is_err() {
                    yield Err(QueueError::Cancelled);
                    break;
                }
            }
        };
        ResultStream::new(sizes.boxed(), self.runtime.clone())
    }

    fn submit_read<R>(&self, make: impl FnOnce(Completer<R>) -> ReadRequest<T>) -> Deferred<R>
    where
        R: Clone + Send + Sync + 'static,
    {
        self.enqueue_read(true, make)
    }

    fn enqueue_read<R>(
        &self,
        bounded: bool,
        make: impl FnOnce(Completer<R>) -> ReadRequest<T>,
    ) -> Deferred<R>
    where
        R: Clone + Send + Sync + 'static,
    {
        let (deferred, reply) = Deferred::channel(self.runtime.clone());
        if let Err(e) = self.admit(bounded) {
            reply.complete(Err(e));
            return deferred;
        }
        if let Err(mpsc::error::SendError(request)) = self.read_tx.send(make(reply)) {
            self.state.pending.fetch_sub(1, Ordering::AcqRel);
            request.fail(QueueError::Closed);
        }
        deferred
    }

    fn submit_write<R>(&self, make: impl FnOnce(Completer<R>) -> WriteRequest<T>) -> Deferred<R>
    where
        R: Clone + Send + Sync + 'static,
    {
        let (deferred, reply) = Deferred::channel(self.runtime.clone());
        if let Err(e) = self.admit(true) {
            reply.complete(Err(e));
            return deferred;
        }
        if let Err(mpsc::error::SendError(request)) = self.write_tx.send(make(reply)) {
            self.state.pending.fetch_sub(1, Ordering::AcqRel);
            request.fail(QueueError::Closed);
        }
        deferred
    }

    /// Reserve a pending slot, or say why the request cannot be queued.
    /// Unbounded requests are counted but never rejected for load.
    fn admit(&self, bounded: bool) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let pending = self.state.pending.fetch_add(1, Ordering::AcqRel);
        if let Some(limit) = self.state.max_pending.filter(|_| bounded) {
            if pending >= limit {
                self.state.pending.fetch_sub(1, Ordering::AcqRel);
                warn!(queue = %self.state.name, limit, "Request rejected, too many pending requests");
                return Err(QueueError::Overloaded { limit });
            }
        }
        Ok(())
    }
}

impl<T> QueueActor<T> {
    pub(crate) fn name(&self) -> &str {
        &self.state.name
    }

    pub(crate) fn id(&self) -> Uuid {
        self.state.id
    }

    /// Stop accepting requests and ask the worker to shut down.
    ///
    /// Idempotent and non-blocking; see [`QueueActor::closed`] to wait for
    /// the worker.
    pub(crate) fn close(&self) {
        if self.state.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(queue = %self.state.name, id = %self.state.id, "Closing queue");
        self.shutdown_tx.send_replace(true);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.closing.load(Ordering::Acquire)
    }

    /// Resolves once the driver is closed and every pending request has
    /// been cancelled.
    pub(crate) async fn closed(&self) {
        let mut terminated = self.terminated.clone();
        // An error means the worker is gone, which is just as final.
        let _ = terminated.wait_for(|done| *done).await;
    }
}

/// Encode with `converter`, reporting a panic as a conversion failure.
fn encode_caught<T: 'static>(converter: &dyn Converter<T>, value: &T) -> Result<Vec<u8>, ConversionError> {
    panic::catch_unwind(AssertUnwindSafe(|| converter.encode(value)))
        .map_err(|_| ConversionError::new("converter panicked while encoding"))?
}

/// Decode with `converter`, reporting a panic as a conversion failure.
fn decode_caught<T: 'static>(converter: &dyn Converter<T>, blob: &[u8]) -> Result<T, ConversionError> {
    panic::catch_unwind(AssertUnwindSafe(|| converter.decode(blob)))
        .map_err(|_| ConversionError::new("converter panicked while decoding"))?
}

impl<T> Clone for QueueActor<T> {
    fn clone(&self) -> Self {
        Self {
            read_tx: self.read_tx.clone(),
            write_tx: self.write_tx.clone(),
            converter: self.converter.clone(),
            updates: self.updates.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            terminated: self.terminated.clone(),
            state: self.state.clone(),
            runtime: self.runtime.clone(),
        }
    }
}
