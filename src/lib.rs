//! # spool_q
//!
//! A persistent FIFO queue with exchangeable storage drivers.
//!
//! Every operation on a [`SpoolQueue`] is turned into a request and handed
//! to a single worker task (the queue actor). The worker owns the storage
//! [`Driver`] exclusively and executes one driver call at a time, so many
//! concurrent callers can push, poll, peek, remove and mutate without any
//! locking beyond the driver's own atomic primitives.
//!
//! ## Architecture
//!
//! - [`Converter`]: pure codec between a domain value and bytes
//! - [`Driver`]: persistent FIFO store of byte blobs
//!   ([`InMemoryDriver`], `SqliteDriver`, `PostgresDriver`, `RedisDriver`)
//! - [`SpoolQueue`]: typed facade returning [`Deferred`] handles and
//!   [`ResultStream`]s
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use spool_q::{SpoolQueue, Utf8Converter};
//!
//! # async fn run() -> Result<(), spool_q::QueueError> {
//! let queue = SpoolQueue::<String>::builder().build(Utf8Converter)?;
//!
//! queue.push("hello".to_string()).await?;
//! assert_eq!(queue.size().await?, 1);
//! assert_eq!(queue.poll().await?, Some("hello".to_string()));
//!
//! queue.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Using a persistent driver
//!
//! ```rust,ignore
//! use spool_q::{JsonConverter, SpoolQueue};
//! use spool_q::storage::sqlite::SqliteDriver;
//!
//! let driver = SqliteDriver::connect("sqlite://spool.db", "spool_entries").await?;
//! let queue = SpoolQueue::builder()
//!     .name("uploads")
//!     .driver(driver)
//!     .build(JsonConverter::<Upload>::new())?;
//! ```

mod actor;
pub mod config;
pub mod converter;
pub mod error;
pub mod queue;
pub mod storage;

pub use config::QueueConfig;
pub use converter::{ConversionError, Converter, JsonConverter, RawConverter, Utf8Converter};
pub use error::QueueError;
pub use queue::{Deferred, ResultStream, SpoolQueue, SpoolQueueBuilder, Subscription};
pub use storage::{Driver, DriverError, InMemoryDriver, QueueEntry};
