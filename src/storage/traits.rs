//! Core trait for spool storage drivers.
//!
//! A driver is a persistent FIFO store of byte blobs. The queue actor is
//! its only caller and never issues two operations at once, so a driver
//! only has to make each individual operation atomic.
//!
//! # Example: Implementing a Custom Driver
//!
//! ```rust,ignore
//! use spool_q::storage::{BlobMapper, Driver, DriverError};
//! use async_trait::async_trait;
//!
//! pub struct MyDriver { /* ... */ }
//!
//! #[async_trait]
//! impl Driver for MyDriver {
//!     // Implement the blob operations...
//! }
//! ```

use async_trait::async_trait;

use super::error::DriverError;
use crate::converter::ConversionError;

/// Rewrites one stored payload during [`Driver::mutate`].
pub type BlobMapper = dyn Fn(&[u8]) -> Result<Vec<u8>, ConversionError> + Send + Sync;

/// A single stored entry.
///
/// `id` is assigned by the driver on write, grows monotonically and is never
/// reused; it alone defines FIFO order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub payload: Vec<u8>,
    /// Reserved for payload format migrations.
    pub version: String,
}

impl QueueEntry {
    pub const DEFAULT_VERSION: &'static str = "0";

    pub fn new(id: i64, payload: Vec<u8>) -> Self {
        Self {
            id,
            payload,
            version: Self::DEFAULT_VERSION.to_string(),
        }
    }
}

/// Persistent FIFO store of binary blobs.
///
/// # Implementation Notes
///
/// - Entries are always returned in ascending id order; the head is the
///   lowest live id.
/// - `poll`, `remove` and `mutate` must each be atomic.
/// - `mutate` is all-or-nothing: if the mapper fails for any entry, no
///   entry may be changed.
/// - After `close`, every operation must fail with [`DriverError::Closed`].
#[async_trait]
pub trait Driver: Send {
    /// Append `blob` as the new tail entry. Returns true iff it was persisted.
    async fn write(&mut self, blob: Vec<u8>) -> Result<bool, DriverError>;

    /// Number of live entries.
    async fn count(&mut self) -> Result<usize, DriverError>;

    /// Up to `limit` payloads from the head, without removing them.
    ///
    /// `None` returns every entry. An empty queue yields an empty list.
    async fn peek(&mut self, limit: Option<usize>) -> Result<Vec<Vec<u8>>, DriverError>;

    /// Read and remove the head entry in one indivisible step.
    async fn poll(&mut self) -> Result<Option<Vec<u8>>, DriverError>;

    /// Delete up to `limit` entries from the head (`None` deletes all).
    ///
    /// Returns how many entries were actually deleted.
    async fn remove(&mut self, limit: Option<usize>) -> Result<usize, DriverError>;

    /// Replace every payload, head to tail, with `mapper(payload)`.
    ///
    /// Ids and ordering are preserved. Returns the number of entries updated.
    async fn mutate(&mut self, mapper: &BlobMapper) -> Result<usize, DriverError>;

    /// Release underlying resources. Idempotent and infallible.
    async fn close(&mut self);
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn write(&mut self, blob: Vec<u8>) -> Result<bool, DriverError> {
        (**self).write(blob).await
    }

    async fn count(&mut self) -> Result<usize, DriverError> {
        (**self).count().await
    }

    async fn peek(&mut self, limit: Option<usize>) -> Result<Vec<Vec<u8>>, DriverError> {
        (**self).peek(limit).await
    }

    async fn poll(&mut self) -> Result<Option<Vec<u8>>, DriverError> {
        (**self).poll().await
    }

    async fn remove(&mut self, limit: Option<usize>) -> Result<usize, DriverError> {
        (**self).remove(limit).await
    }

    async fn mutate(&mut self, mapper: &BlobMapper) -> Result<usize, DriverError> {
        (**self).mutate(mapper).await
    }

    async fn close(&mut self) {
        (**self).close().await
    }
}
