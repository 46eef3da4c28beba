//! # Lifecycle events emitted by the broker actor.
//!
//! The [`EventKind`] enum classifies what happened inside the actor:
//! - **Membership events**: subscriber added, removed, detached
//! - **Delivery events**: a message dropped for one subscriber
//! - **Shutdown events**: shutdown observed, actor stopped
//!
//! The [`Event`] struct carries metadata such as the timestamp, the subscriber id
//! and the timeout that expired.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fanout::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::MessageDropped).with_timeout(Duration::from_millis(10));
//!
//! assert_eq!(ev.kind, EventKind::MessageDropped);
//! assert_eq!(ev.timeout_ms, Some(10));
//! assert!(ev.subscriber.is_none());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::subscribers::SubscriberId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Membership events ===
    /// A subscriber was registered and will see every later broadcast.
    ///
    /// Sets:
    /// - `subscriber`: id of the new handle
    SubscriberAdded,

    /// A subscriber was removed by `unsubscribe` and its handle closed.
    ///
    /// Sets:
    /// - `subscriber`: id of the removed handle
    SubscriberRemoved,

    /// A subscriber handle was dropped without unsubscribing; the actor pruned it.
    ///
    /// Sets:
    /// - `subscriber`: id of the dropped handle
    SubscriberDetached,

    // === Delivery events ===
    /// A message was not accepted by one subscriber within the timeout and was dropped for it.
    ///
    /// Sets:
    /// - `subscriber`: id of the slow handle
    /// - `timeout_ms`: the timeout that expired
    MessageDropped,

    // === Shutdown events ===
    /// The actor observed the shutdown signal.
    ShutdownRequested,

    /// The actor closed every remaining handle and exited.
    BrokerStopped,
}

/// Broker event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Subscriber the event refers to, if any.
    pub subscriber: Option<SubscriberId>,
    /// Expired timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subscriber: None,
            timeout_ms: None,
        }
    }

    /// Attaches a subscriber id.
    #[inline]
    pub fn with_subscriber(mut self, id: SubscriberId) -> Self {
        self.subscriber = Some(id);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a per-subscriber drop event.
    #[inline]
    pub fn message_dropped(id: SubscriberId, timeout: Duration) -> Self {
        Event::new(EventKind::MessageDropped)
            .with_subscriber(id)
            .with_timeout(timeout)
    }

    #[inline]
    pub fn is_message_dropped(&self) -> bool {
        matches!(self.kind, EventKind::MessageDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::SubscriberAdded);
        let b = Event::new(EventKind::SubscriberRemoved);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_timeout_saturates() {
        let ev = Event::new(EventKind::MessageDropped).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
