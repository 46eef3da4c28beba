//! # Example: fanout_demo
//!
//! One fast reader, one slow reader, one reader on a plain thread, and a publisher.
//!
//! Demonstrates how to:
//! - Build a broker with a short delivery timeout.
//! - Observe lifecycle events (drops for the slow reader).
//! - Shut down with `close()` and watch every handle reach end-of-stream.
//!
//! ## Flow
//! ```text
//! publisher ──► Broker::publish() ──► BrokerActor
//!                                        ├─► fast   (always reading)     → receives while reading
//!                                        ├─► slow   (sleeps 50ms/read)   → MessageDropped
//!                                        └─► thread (blocking_recv)      → receives while reading
//! close() ──► every handle returns None
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=fanout=debug cargo run --example fanout_demo
//! ```

use std::time::Duration;

use fanout::{Broker, EventKind, FanOut};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Build the broker: 10ms per delivery, offers run concurrently.
    let broker = Broker::<u32>::builder()
        .with_timeout(Duration::from_millis(10))
        .with_buffer_capacity(16)
        .with_fan_out(FanOut::Concurrent)
        .build();

    // 2. Watch drops.
    let mut events = broker.events();
    let watcher = tokio::spawn(async move {
        let mut dropped = 0u32;
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::MessageDropped => dropped += 1,
                EventKind::BrokerStopped => break,
                _ => {}
            }
        }
        dropped
    });

    // 3. Subscribers.
    let mut fast = broker.subscribe().await?;
    let fast = tokio::spawn(async move {
        let mut n = 0u32;
        while fast.recv().await.is_some() {
            n += 1;
        }
        n
    });

    let mut slow = broker.subscribe().await?;
    let slow = tokio::spawn(async move {
        let mut n = 0u32;
        while slow.recv().await.is_some() {
            n += 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        n
    });

    let mut threaded = broker.subscribe().await?;
    let threaded = std::thread::spawn(move || {
        let mut n = 0u32;
        while threaded.blocking_recv().is_some() {
            n += 1;
        }
        n
    });

    // 4. Publish.
    for i in 0..20 {
        broker.publish(i).await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 5. Shut down.
    broker.close().await?;

    println!();
    println!("Deliveries:");
    println!(" ├─► fast:    {}", fast.await?);
    println!(" ├─► slow:    {}", slow.await?);
    println!(" ├─► thread:  {}", threaded.join().unwrap_or_default());
    println!(" └─► dropped: {}", watcher.await?);
    Ok(())
}
