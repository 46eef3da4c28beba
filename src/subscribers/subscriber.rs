//! # Subscriber handle
//!
//! [`Subscriber`] is the receive side handed out by [`Broker::subscribe`](crate::Broker::subscribe).
//! Its queue is a rendezvous: every read registers a one-shot slot with the actor, and the actor
//! fills the oldest slot during a broadcast. A handle that is not reading holds no messages, so a
//! stalled consumer costs the actor at most one timeout per message and never a growing buffer.
//!
//! ## Contract
//! - `recv()` returns `Some(msg)` for each delivered message in broadcast order.
//! - `recv()` returns `None` once the actor closed the handle (unsubscribe or shutdown).
//!   End-of-stream is not an error and stays `None` forever.
//! - Dropping the handle without unsubscribing is allowed; the actor prunes it on the next broadcast.
//!
//! ## Example
//! ```rust
//! use fanout::Broker;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fanout::BrokerError> {
//!     let broker = Broker::<u32>::new();
//!     let mut sub = broker.subscribe().await?;
//!
//!     let publisher = broker.clone();
//!     tokio::spawn(async move { publisher.publish(7).await });
//!
//!     assert_eq!(sub.recv().await, Some(7));
//!     broker.close().await?;
//!     assert_eq!(sub.recv().await, None);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

/// Source of process-unique subscriber ids.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a subscriber handle.
///
/// Handles are compared by identity, never by content: two handles never share an id,
/// even across different brokers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One pending read: the actor fills it with the next message.
pub(crate) type Slot<T> = oneshot::Sender<T>;

/// Receive-only handle for one subscriber.
pub struct Subscriber<T> {
    id: SubscriberId,
    demand: mpsc::Sender<Slot<T>>,
}

impl<T> Subscriber<T> {
    pub(crate) fn new(id: SubscriberId, demand: mpsc::Sender<Slot<T>>) -> Self {
        Self { id, demand }
    }

    /// Returns the identity used by [`Broker::unsubscribe`](crate::Broker::unsubscribe).
    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once the handle has been closed by the broker.
    ///
    /// ### Cancel safety
    /// Dropping the future before a message arrives is safe: the actor offers the message
    /// to the next pending read instead. A message handed over in the same instant the
    /// future is dropped is lost for this subscriber.
    pub async fn recv(&mut self) -> Option<T> {
        let (slot, filled) = oneshot::channel();
        self.demand.send(slot).await.ok()?;
        filled.await.ok()
    }

    /// Blocking variant of [`recv`](Self::recv) for plain threads.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<T> {
        let (slot, filled) = oneshot::channel();
        self.demand.blocking_send(slot).ok()?;
        filled.blocking_recv().ok()
    }

    /// Returns `true` once the broker has closed this handle.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.demand.is_closed()
    }

    /// Turns the handle into a stream that ends when the handle is closed.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold(self, |mut sub| async move {
            let msg = sub.recv().await?;
            Some((msg, sub))
        })
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::channel;
    use futures::StreamExt;
    use std::time::Duration;

    #[test]
    fn test_ids_are_unique() {
        let a = SubscriberId::next();
        let b = SubscriberId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(format!("{a}"), format!("sub-{}", a.as_u64()));
    }

    #[tokio::test]
    async fn test_recv_after_outlet_dropped_is_end_of_stream() {
        let (outlet, mut sub) = channel::<u8>();
        assert!(!sub.is_closed());
        drop(outlet);
        assert!(sub.is_closed());
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_pending_recv_ends_when_outlet_dropped() {
        let (outlet, mut sub) = channel::<u8>();
        let reader = tokio::spawn(async move { sub.recv().await });
        tokio::task::yield_now().await;
        drop(outlet);
        assert_eq!(reader.await.expect("join"), None);
    }

    #[tokio::test]
    async fn test_stream_yields_until_closed() {
        let (mut outlet, sub) = channel::<u8>();
        let reader = tokio::spawn(sub.into_stream().collect::<Vec<_>>());

        for n in 1..=3 {
            outlet.offer(n, Duration::from_secs(5)).await;
        }
        drop(outlet);

        assert_eq!(reader.await.expect("join"), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_recv_from_thread() {
        let (mut outlet, mut sub) = channel::<&'static str>();
        let reader = std::thread::spawn(move || {
            let first = sub.blocking_recv();
            let second = sub.blocking_recv();
            (first, second)
        });

        outlet.offer("hello", Duration::from_secs(5)).await;
        drop(outlet);

        let (first, second) = reader.join().expect("thread");
        assert_eq!(first, Some("hello"));
        assert_eq!(second, None);
    }
}
