//! # fanout
//!
//! **fanout** is a generic in-process publish/subscribe broker for tokio applications.
//!
//! Any number of producers publish typed messages; any number of subscriber handles receive
//! every message published while they are subscribed. All coordination happens inside one
//! serialized actor, so the subscriber set is never shared or locked.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Publisher   │   │  Publisher   │   │  Publisher   │
//!     │ (task / clone│   │ (task / clone│   │ (task / clone│
//!     │  of Broker)  │   │  of Broker)  │   │  of Broker)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ publish()        ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  inbound queue (bounded, BrokerConfig::buffer_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!   subscribe() / unsubscribe() ──► │ ◄── close() (shutdown token)
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │      BrokerActor       │
//!                       │  (one event at a time) │
//!                       │   owns SubscriberSet   │
//!                       └───┬────────┬───────┬───┘
//!              offer ≤ timeout│        │       │ offer ≤ timeout
//!                           ▼        ▼       ▼
//!                        sub 1     sub 2   sub N      (Subscriber::recv)
//! ```
//!
//! ### Broadcast policy
//! ```text
//! for each message dequeued by the actor:
//!   ├─► snapshot the current subscribers
//!   ├─► offer to each (FanOut::Sequential) or all at once (FanOut::Concurrent)
//!   │       ├─ reader waiting        ─► delivered
//!   │       ├─ no reader in timeout  ─► dropped for that subscriber only (MessageDropped)
//!   │       └─ handle dropped        ─► pruned (SubscriberDetached)
//!   └─► next event
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types                              |
//! |-------------------|-----------------------------------------------------------|----------------------------------------|
//! | **Broker**        | Publish, subscribe, unsubscribe, idempotent close.        | [`Broker`], [`BrokerState`]            |
//! | **Subscribers**   | Rendezvous receive handles, async/blocking/stream reads.  | [`Subscriber`], [`SubscriberId`]       |
//! | **Configuration** | Timeout, buffer capacity, fan-out strategy.               | [`BrokerBuilder`], [`BrokerConfig`]    |
//! | **Events**        | Observe membership changes, drops and shutdown.           | [`Event`], [`EventKind`]               |
//! | **Errors**        | Recoverable timeouts and terminal close.                  | [`BrokerError`]                        |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fanout::{Broker, BrokerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), BrokerError> {
//!     let broker = Broker::<u64>::builder()
//!         .with_timeout(Duration::from_millis(10))
//!         .with_buffer_capacity(5)
//!         .build();
//!
//!     let mut client = broker.subscribe().await?;
//!
//!     let publisher = broker.clone();
//!     tokio::spawn(async move { publisher.publish(4711).await });
//!
//!     assert_eq!(client.recv().await, Some(4711));
//!
//!     broker.close().await?;
//!     assert_eq!(client.recv().await, None);
//!     assert_eq!(broker.subscribe().await.err(), Some(BrokerError::Closed));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Broker, BrokerBuilder, BrokerConfig, BrokerState, FanOut};
pub use error::BrokerError;
pub use events::{Event, EventKind};
pub use subscribers::{Subscriber, SubscriberId};
