//! Errors reported to queue callers.
//!
//! A failure is always attached to the one [`Deferred`](crate::Deferred)
//! or stream item it belongs to; sibling operations are unaffected.

use thiserror::Error;

use crate::converter::ConversionError;
use crate::storage::DriverError;

#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// A value could not be encoded or decoded, or a mutate closure failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The queue (or its driver) has been closed.
    #[error("the queue has been closed")]
    Closed,

    /// The request was still pending when the queue closed.
    #[error("the operation was cancelled because the queue closed")]
    Cancelled,

    /// Driver specific failure, passed through unchanged.
    #[error("storage error: {0}")]
    Storage(DriverError),

    /// The bounded submission queue is full.
    #[error("queue overloaded: {limit} requests already pending")]
    Overloaded { limit: usize },

    /// The queue could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl QueueError {
    /// True for the errors a closed queue produces.
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed | QueueError::Cancelled)
    }
}

impl From<DriverError> for QueueError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Closed => QueueError::Closed,
            DriverError::Mapper(e) => QueueError::Conversion(e),
            other => QueueError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_errors_are_classified() {
        assert!(matches!(
            QueueError::from(DriverError::Closed),
            QueueError::Closed
        ));
        assert!(matches!(
            QueueError::from(DriverError::Mapper(ConversionError::new("bad"))),
            QueueError::Conversion(_)
        ));
        assert!(matches!(
            QueueError::from(DriverError::Internal("disk".into())),
            QueueError::Storage(DriverError::Internal(_))
        ));
    }

    #[test]
    fn test_is_closed() {
        assert!(QueueError::Closed.is_closed());
        assert!(QueueError::Cancelled.is_closed());
        assert!(!QueueError::Overloaded { limit: 1 }.is_closed());
    }
}
