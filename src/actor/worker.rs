use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::request::{ReadRequest, WriteRequest};
use super::{decode_caught, ActorState};
use crate::converter::Converter;
use crate::error::QueueError;
use crate::storage::{Driver, DriverError};

/// The single consumer of both request queues and sole user of the driver.
pub(crate) struct Worker<T> {
    pub(super) driver: Box<dyn Driver>,
    pub(super) converter: Arc<dyn Converter<T>>,
    pub(super) read_rx: mpsc::UnboundedReceiver<ReadRequest<T>>,
    pub(super) write_rx: mpsc::UnboundedReceiver<WriteRequest<T>>,
    pub(super) updates: watch::Sender<u64>,
    pub(super) shutdown_rx: watch::Receiver<bool>,
    pub(super) terminated: watch::Sender<bool>,
    pub(super) state: Arc<ActorState>,
}

impl<T> Worker<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Serve requests one at a time until the queue is closed.
    ///
    /// A request is only taken between steps, so a shutdown never interrupts
    /// a driver call.
    pub(crate) async fn run(mut self) {
        info!("Queue worker started");

        loop {
            // Queued requests are cancelled, not served, once close was asked.
            if *self.shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                // Also fires when every handle (and with it the sender) is gone.
                _ = self.shutdown_rx.changed() => break,
                Some(request) = self.read_rx.recv() => {
                    self.taken();
                    self.execute_read(request).await;
                }
                Some(request) = self.write_rx.recv() => {
                    self.taken();
                    self.execute_write(request).await;
                }
                else => break,
            }
        }

        self.shutdown().await;
    }

    fn taken(&self) {
        self.state.pending.fetch_sub(1, Ordering::AcqRel);
    }

    async fn execute_read(&mut self, request: ReadRequest<T>) {
        let op = request.op();
        match request {
            ReadRequest::Peek { reply } => {
                let outcome = guarded(op, self.driver.peek(Some(1)))
                    .await
                    .and_then(|blobs| blobs.first().map(|b| self.decode(b)).transpose());
                finish(op, &outcome);
                reply.complete(outcome);
            }
            ReadRequest::PeekList { limit, reply } => {
                let outcome = guarded(op, self.driver.peek(limit))
                    .await
                    .and_then(|blobs| blobs.iter().map(|b| self.decode(b)).collect());
                finish(op, &outcome);
                reply.complete(outcome);
            }
            ReadRequest::Size { reply } => {
                let outcome = guarded(op, self.driver.count()).await;
                finish(op, &outcome);
                reply.complete(outcome);
            }
        }
    }

    async fn execute_write(&mut self, request: WriteRequest<T>) {
        let op = request.op();
        match request {
            WriteRequest::Push { blob, reply } => {
                let outcome = guarded(op, self.driver.write(blob)).await;
                finish(op, &outcome);
                self.signal_if(matches!(outcome, Ok(true)));
                reply.complete(outcome);
            }
            WriteRequest::Poll { reply } => {
                let outcome = guarded(op, self.driver.poll()).await;
                // The entry is gone once the driver returned it, decoded or not.
                self.signal_if(matches!(outcome, Ok(Some(_))));
                let outcome = outcome.and_then(|blob| blob.map(|b| self.decode(&b)).transpose());
                finish(op, &outcome);
                reply.complete(outcome);
            }
            WriteRequest::Remove { limit, reply } => {
                let outcome = guarded(op, self.driver.remove(limit)).await;
                finish(op, &outcome);
                self.signal_if(matches!(outcome, Ok(n) if n > 0));
                reply.complete(outcome);
            }
            WriteRequest::RemoveHead { reply } => {
                let outcome = guarded(op, self.driver.remove(Some(1)))
                    .await
                    .map(|n| n > 0);
                finish(op, &outcome);
                self.signal_if(matches!(outcome, Ok(true)));
                reply.complete(outcome);
            }
            WriteRequest::Mutate { mapper, reply } => {
                let outcome = guarded(op, self.driver.mutate(mapper.as_ref())).await;
                finish(op, &outcome);
                self.signal_if(matches!(outcome, Ok(n) if n > 0));
                reply.complete(outcome);
            }
        }
    }

    fn decode(&self, blob: &[u8]) -> Result<T, QueueError> {
        decode_caught(self.converter.as_ref(), blob).map_err(QueueError::from)
    }

    /// Bump the coalescing update slot. Subscribers that have not caught up
    /// yet see a single change no matter how many bumps happened.
    fn signal_if(&self, changed: bool) {
        if changed {
            self.updates.send_modify(|version| *version = version.wrapping_add(1));
        }
    }

    async fn shutdown(self) {
        let Worker {
            mut driver,
            mut read_rx,
            mut write_rx,
            updates,
            terminated,
            state,
            ..
        } = self;

        state.closing.store(true, Ordering::Release);

        if AssertUnwindSafe(driver.close()).catch_unwind().await.is_err() {
            warn!("Driver panicked while closing");
        }

        read_rx.close();
        write_rx.close();

        let mut cancelled = 0usize;
        while let Ok(request) = read_rx.try_recv() {
            request.fail(QueueError::Cancelled);
            cancelled += 1;
        }
        while let Ok(request) = write_rx.try_recv() {
            request.fail(QueueError::Cancelled);
            cancelled += 1;
        }
        state.pending.fetch_sub(cancelled, Ordering::AcqRel);

        // Ends every live size stream.
        drop(updates);
        terminated.send_replace(true);

        info!(cancelled, "Queue worker stopped");
    }
}

/// Run one driver call, turning a panic into a storage error for this
/// request only.
async fn guarded<F, R>(op: &'static str, call: F) -> Result<R, QueueError>
where
    F: Future<Output = Result<R, DriverError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result.map_err(QueueError::from),
        Err(_) => Err(QueueError::Storage(DriverError::Internal(format!(
            "driver panicked during {}",
            op
        )))),
    }
}

fn finish<R>(op: &'static str, outcome: &Result<R, QueueError>) {
    match outcome {
        Ok(_) => debug!(op, "Request completed"),
        Err(e) => warn!(op, error = %e, "Request failed"),
    }
}
