//! Example: watching the queue size
//!
//! Subscribes to `stream_size` and lets a producer and a consumer race
//! against each other. Bursts of changes arrive as a single size update.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example stream_size
//! ```

use std::time::Duration;

use futures::StreamExt;
use spool_q::{SpoolQueue, Utf8Converter};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let queue = SpoolQueue::builder()
        .name("stream-demo")
        .build(Utf8Converter)?;

    let mut sizes = queue.stream_size();
    let watcher = tokio::spawn(async move {
        while let Some(size) = sizes.next().await {
            match size {
                Ok(size) => info!(size, "Queue size changed"),
                Err(e) => info!(error = %e, "Size stream ended"),
            }
        }
    });

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                let _ = queue.push(format!("event {}", i)).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let mut drained = 0;
            while drained < 20 {
                match queue.poll().await {
                    Ok(Some(_)) => drained += 1,
                    Ok(None) => tokio::time::sleep(Duration::from_millis(25)).await,
                    Err(_) => break,
                }
            }
        })
    };

    producer.await?;
    consumer.await?;

    queue.close();
    watcher.await?;
    Ok(())
}
