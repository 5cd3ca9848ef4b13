//! In-memory driver, the default for [`SpoolQueue`](crate::SpoolQueue).
//!
//! Nothing survives a restart. The queue actor already serializes access,
//! so a plain `VecDeque` satisfies every atomicity requirement.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::error::DriverError;
use super::traits::{BlobMapper, Driver, QueueEntry};

#[derive(Debug)]
pub struct InMemoryDriver {
    /// `None` once closed.
    entries: Option<VecDeque<QueueEntry>>,
    next_id: i64,
}

impl InMemoryDriver {
    pub fn new() -> Self {
        Self {
            entries: Some(VecDeque::new()),
            next_id: 1,
        }
    }

    fn entries(&mut self) -> Result<&mut VecDeque<QueueEntry>, DriverError> {
        self.entries.as_mut().ok_or(DriverError::Closed)
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn write(&mut self, blob: Vec<u8>) -> Result<bool, DriverError> {
        let id = self.next_id;
        self.entries()?.push_back(QueueEntry::new(id, blob));
        self.next_id += 1;
        Ok(true)
    }

    async fn count(&mut self) -> Result<usize, DriverError> {
        Ok(self.entries()?.len())
    }

    async fn peek(&mut self, limit: Option<usize>) -> Result<Vec<Vec<u8>>, DriverError> {
        let entries = self.entries()?;
        let take = limit.unwrap_or(entries.len());
        Ok(entries
            .iter()
            .take(take)
            .map(|entry| entry.payload.clone())
            .collect())
    }

    async fn poll(&mut self) -> Result<Option<Vec<u8>>, DriverError> {
        Ok(self.entries()?.pop_front().map(|entry| entry.payload))
    }

    async fn remove(&mut self, limit: Option<usize>) -> Result<usize, DriverError> {
        let entries = self.entries()?;
        let removed = limit.unwrap_or(entries.len()).min(entries.len());
        entries.drain(..removed);
        Ok(removed)
    }

    async fn mutate(&mut self, mapper: &BlobMapper) -> Result<usize, DriverError> {
        let entries = self.entries()?;
        // Map everything first so a failure leaves the queue untouched.
        let mapped = entries
            .iter()
            .map(|entry| mapper(&entry.payload))
            .collect::<Result<Vec<_>, _>>()?;

        let updated = mapped.len();
        for (entry, payload) in entries.iter_mut().zip(mapped) {
            entry.payload = payload;
        }
        Ok(updated)
    }

    async fn close(&mut self) {
        self.entries = None;
    }
}
