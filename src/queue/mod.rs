//! The typed queue facade and the handles it returns.

pub(crate) mod deferred;
mod queue;
mod stream;

pub use deferred::Deferred;
pub use queue::{SpoolQueue, SpoolQueueBuilder};
pub use stream::{ResultStream, Subscription};
