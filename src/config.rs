use serde::{Deserialize, Serialize};

/// Configuration for a [`SpoolQueue`](crate::SpoolQueue).
///
/// Deserializable so it can live in an application's config file:
///
/// ```rust
/// use spool_q::QueueConfig;
///
/// let config: QueueConfig =
///     serde_json::from_str(r#"{ "name": "uploads", "max_pending_requests": 1024 }"#).unwrap();
/// assert_eq!(config.name, "uploads");
/// assert!(config.close_on_drop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Label attached to every log line of this queue.
    pub name: String,
    /// Upper bound on requests submitted but not yet taken by the worker.
    ///
    /// `None` never rejects. With `Some(n)`, a submission beyond `n` fails
    /// immediately with [`QueueError::Overloaded`](crate::QueueError::Overloaded).
    pub max_pending_requests: Option<usize>,
    /// Close the queue (and its driver) when the last facade handle is dropped.
    pub close_on_drop: bool,
}

impl QueueConfig {
    pub const DEFAULT_NAME: &'static str = "spool";
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            max_pending_requests: None,
            close_on_drop: true,
        }
    }
}
