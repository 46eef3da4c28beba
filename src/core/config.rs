//! # Broker configuration.
//!
//! Provides [`BrokerConfig`], the immutable settings copied into a broker at construction,
//! and [`FanOut`], the broadcast strategy.
//!
//! ## Sentinel values
//! - `buffer_capacity = 0` → fully synchronous publish (`publish` returns once the actor dequeued it)
//! - `timeout = 0s` → offers succeed only when the receiver is already waiting

use std::time::Duration;

/// Default bound for every blocking operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default capacity of the inbound message queue.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Default capacity of the lifecycle event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// How a broadcast pass delivers one message to the current subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FanOut {
    /// Offer to each subscriber in turn.
    ///
    /// Worst case for one message is `timeout × subscribers`.
    #[default]
    Sequential,

    /// Offer to all subscribers at once and wait for every offer to settle
    /// before the actor handles its next event.
    ///
    /// Worst case for one message is `timeout`.
    Concurrent,
}

/// Configuration for a broker instance.
///
/// ## Field semantics
/// - `timeout`: bound for `publish`, `subscribe`, `unsubscribe` and for every per-subscriber offer
/// - `buffer_capacity`: inbound queue size (`0` = synchronous hand-off to the actor)
/// - `fan_out`: broadcast strategy
/// - `event_capacity`: lifecycle event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Bound applied to every blocking operation.
    pub timeout: Duration,

    /// Capacity of the inbound publish queue.
    ///
    /// - `0` = `publish` waits until the actor has taken the message
    /// - `n > 0` = up to `n` messages wait for the actor
    pub buffer_capacity: usize,

    /// Broadcast strategy.
    pub fan_out: FanOut,

    /// Capacity of the lifecycle event bus.
    pub event_capacity: usize,
}

impl BrokerConfig {
    /// Returns the capacity of the underlying inbound channel.
    ///
    /// Tokio channels need at least one slot; a synchronous broker uses that
    /// single slot together with an acknowledgement from the actor.
    #[inline]
    pub fn inbound_capacity(&self) -> usize {
        self.buffer_capacity.max(1)
    }

    /// Returns `true` when publishing waits for the actor to dequeue the message.
    #[inline]
    pub fn is_synchronous(&self) -> bool {
        self.buffer_capacity == 0
    }

    /// Returns an event bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn event_capacity_clamped(&self) -> usize {
        self.event_capacity.max(1)
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `timeout = 1s`
    /// - `buffer_capacity = 10`
    /// - `fan_out = FanOut::Sequential`
    /// - `event_capacity = 1024`
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            fan_out: FanOut::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
