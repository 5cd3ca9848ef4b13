//! Example: a durable upload queue on SQLite
//!
//! Pushes a few uploads into a SQLite-backed queue, bumps their attempt
//! counters with `mutate`, then drains the queue. Run it twice to see that
//! entries left behind survive a restart.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example sqlite_queue
//! ```

use serde::{Deserialize, Serialize};
use spool_q::storage::sqlite::SqliteDriver;
use spool_q::{JsonConverter, SpoolQueue};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Upload {
    path: String,
    attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,spool_q=debug".into()),
        )
        .init();

    let url = std::env::var("SPOOL_SQLITE_URL").unwrap_or_else(|_| "sqlite://spool-demo.db".into());
    info!(%url, "=== spool_q SQLite example ===");

    let driver = SqliteDriver::connect(&url, "uploads").await?;
    let queue = SpoolQueue::builder()
        .name("uploads")
        .driver(driver)
        .build(JsonConverter::<Upload>::new())?;

    let leftover = queue.size().await?;
    if leftover > 0 {
        info!(leftover, "Found uploads from a previous run");
    }

    for name in ["a.bin", "b.bin", "c.bin"] {
        queue
            .push(Upload {
                path: format!("/var/spool/{}", name),
                attempts: 0,
            })
            .await?;
    }

    let retried = queue
        .mutate(|mut upload| {
            upload.attempts += 1;
            upload
        })
        .await?;
    info!(retried, "Bumped attempt counters");

    info!(next = ?queue.peek().await?, "Head of the queue");

    // Leave one entry behind for the next run.
    while queue.size().await? > 1 {
        if let Some(upload) = queue.poll().await? {
            info!(path = %upload.path, attempts = upload.attempts, "Uploaded");
        }
    }

    queue.close();
    queue.closed().await;
    Ok(())
}
