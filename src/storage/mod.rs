//! Storage driver abstraction layer for spool queues.
//!
//! This module provides the [`Driver`] contract and its implementations.
//! The default driver is in-memory, but the abstraction allows any store
//! that can keep an ordered list of blobs with atomic operations.
//!
//! # Architecture
//!
//! - [`Driver`]: FIFO blob operations (write, count, peek, poll, remove, mutate)
//! - [`QueueEntry`]: the stored row model
//! - [`DriverError`]: driver-agnostic error type
//!
//! # Using a Custom Driver
//!
//! ```rust,ignore
//! use spool_q::{SpoolQueue, Utf8Converter};
//!
//! let queue = SpoolQueue::builder()
//!     .driver(MyCustomDriver::new(config))
//!     .build(Utf8Converter)?;
//! ```

mod error;
mod memory;
mod traits;

#[cfg(test)]
pub(crate) mod conformance;

// SQLite driver
#[cfg(feature = "sqlite")]
pub mod sqlite;

// PostgreSQL driver
#[cfg(feature = "postgres")]
pub mod postgres;

// Redis driver
#[cfg(feature = "redis")]
pub mod redis;

pub use error::DriverError;
pub use memory::InMemoryDriver;
pub use traits::{BlobMapper, Driver, QueueEntry};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;

#[cfg(feature = "redis")]
pub use self::redis::RedisDriver;

/// Validate that a table name is safe to interpolate as an SQL identifier.
///
/// Valid names must:
/// - Be non-empty
/// - Start with a letter (a-z, A-Z) or underscore
/// - Contain only letters, digits (0-9), and underscores
/// - Be at most 48 characters
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub(crate) fn validate_table_name(table: &str) -> Result<(), DriverError> {
    if table.is_empty() {
        return Err(DriverError::Configuration(
            "table name cannot be empty".to_string(),
        ));
    }

    if table.len() > 48 {
        return Err(DriverError::Configuration(format!(
            "table name '{}' is too long (max 48 characters)",
            table
        )));
    }

    let mut chars = table.chars();

    // First character must be a letter or underscore
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(DriverError::Configuration(format!(
                "table name '{}' must start with a letter or underscore",
                table
            )));
        }
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(DriverError::Configuration(format!(
                "table name '{}' contains invalid character '{}'; only letters, digits, and underscores are allowed",
                table, c
            )));
        }
    }

    Ok(())
}

#[cfg(all(test, any(feature = "sqlite", feature = "postgres")))]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("spool_entries").is_ok());
        assert!(validate_table_name("_private2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("bad-name").is_err());
        assert!(validate_table_name("quoted\"name").is_err());
        assert!(validate_table_name(&"x".repeat(49)).is_err());
    }
}
