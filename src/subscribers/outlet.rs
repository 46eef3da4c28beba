//! # Per-subscriber timed delivery.
//!
//! [`Outlet`] is the actor's side of one subscriber. [`Outlet::offer`] hands a message to the
//! subscriber's oldest pending read, waiting at most `timeout` for one to show up.
//!
//! ## Outcomes
//! ```text
//! offer(msg, timeout)
//!   ├─► pending read filled         → Delivered
//!   ├─► stale read (future dropped) → take message back, wait for the next read
//!   ├─► no read before deadline     → TimedOut  (message dropped for this subscriber)
//!   └─► handle dropped              → Detached  (subscriber is gone for good)
//! ```
//!
//! Dropping an `Outlet` closes the subscriber: pending and future reads observe `None`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

use super::subscriber::{Slot, SubscriberId};

/// Result of offering one message to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The subscriber took the message.
    Delivered,
    /// No read was pending before the deadline.
    TimedOut,
    /// The subscriber handle no longer exists.
    Detached,
}

/// Actor-owned delivery end of one subscriber.
pub(crate) struct Outlet<T> {
    id: SubscriberId,
    demand: mpsc::Receiver<Slot<T>>,
}

impl<T> Outlet<T> {
    pub(crate) fn new(id: SubscriberId, demand: mpsc::Receiver<Slot<T>>) -> Self {
        Self { id, demand }
    }

    #[inline]
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Offers `message` to the subscriber for at most `timeout`.
    ///
    /// A pending read is always served, even with a zero timeout.
    pub(crate) async fn offer(&mut self, mut message: T, timeout: Duration) -> Delivery {
        let deadline = Instant::now() + timeout;

        loop {
            match timeout_at(deadline, self.demand.recv()).await {
                Err(_elapsed) => return Delivery::TimedOut,
                Ok(None) => return Delivery::Detached,
                Ok(Some(slot)) => match slot.send(message) {
                    Ok(()) => return Delivery::Delivered,
                    Err(back) => message = back,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::channel;

    #[tokio::test(start_paused = true)]
    async fn test_offer_without_reader_times_out() {
        let (mut outlet, sub) = channel::<u32>();
        let started = Instant::now();

        let outcome = outlet.offer(42, Duration::from_millis(100)).await;

        assert_eq!(outcome, Delivery::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(100));
        drop(sub);
    }

    #[tokio::test]
    async fn test_offer_to_waiting_reader() {
        let (mut outlet, mut sub) = channel::<u32>();
        let reader = tokio::spawn(async move { sub.recv().await });

        assert_eq!(
            outlet.offer(4711, Duration::from_secs(5)).await,
            Delivery::Delivered
        );
        assert_eq!(reader.await.expect("join"), Some(4711));
    }

    #[tokio::test]
    async fn test_zero_timeout_serves_pending_read() {
        let (mut outlet, mut sub) = channel::<u32>();
        let reader = tokio::spawn(async move { sub.recv().await });
        while outlet.demand.is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(outlet.offer(1, Duration::ZERO).await, Delivery::Delivered);
        assert_eq!(reader.await.expect("join"), Some(1));
    }

    #[tokio::test]
    async fn test_dropped_handle_is_detached() {
        let (mut outlet, sub) = channel::<u32>();
        drop(sub);
        assert_eq!(
            outlet.offer(1, Duration::from_secs(5)).await,
            Delivery::Detached
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_is_skipped() {
        let (mut outlet, mut sub) = channel::<u32>();

        // Register a read and abandon it before anything arrives.
        let abandoned = tokio::time::timeout(Duration::from_millis(1), sub.recv()).await;
        assert!(abandoned.is_err());

        let reader = tokio::spawn(async move { sub.recv().await });
        assert_eq!(
            outlet.offer(9, Duration::from_secs(5)).await,
            Delivery::Delivered
        );
        assert_eq!(reader.await.expect("join"), Some(9));
    }
}
