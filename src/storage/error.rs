//! Driver-agnostic error types for spool storage drivers.
//!
//! Every driver maps its native failures onto [`DriverError`], so the queue
//! actor can report them uniformly regardless of the underlying storage.

use thiserror::Error;

use crate::converter::ConversionError;

/// Errors that can occur during driver operations.
///
/// # Examples
///
/// ```rust
/// use spool_q::DriverError;
///
/// fn handle_error(err: DriverError) {
///     match err {
///         DriverError::Closed => {
///             // The driver was closed, a new one is needed
///             eprintln!("driver closed");
///         }
///         DriverError::Unavailable(msg) => {
///             // Connection lost, retry later
///             eprintln!("Backend unavailable: {}", msg);
///         }
///         _ => {
///             eprintln!("Error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// The driver has been closed; every operation after `close` fails with this.
    #[error("the driver has been closed")]
    Closed,

    /// Backend is unavailable (connection lost, service down, etc.)
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Internal backend error
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The mutate mapper failed; nothing was written.
    #[error("mutate aborted: {0}")]
    Mapper(#[from] ConversionError),
}

impl DriverError {
    /// Returns true if this error is potentially recoverable with a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Unavailable(_))
    }
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => DriverError::Closed,
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                DriverError::Unavailable(err.to_string())
            }
            sqlx::Error::Configuration(_) => DriverError::Configuration(err.to_string()),
            other => DriverError::Internal(other.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for DriverError {
    fn from(err: redis::RedisError) -> Self {
        DriverError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(DriverError::Unavailable("down".into()).is_retryable());
        assert!(!DriverError::Closed.is_retryable());
        assert!(!DriverError::Mapper(ConversionError::new("bad")).is_retryable());
    }
}
