//! # Live subscriber set and broadcast pass.
//!
//! [`SubscriberSet`] maps [`SubscriberId`] to the actor-owned [`Outlet`]. It is owned by the
//! broker actor and never shared, so membership changes and broadcasts can not interleave.
//!
//! ## Broadcast
//! ```text
//! broadcast(msg)
//!     │
//!     ├──► offer(msg.clone()) ──► sub 1   (≤ timeout)
//!     ├──► offer(msg.clone()) ──► sub 2   (≤ timeout)
//!     └──► offer(msg.clone()) ──► sub N   (≤ timeout)
//!
//! FanOut::Sequential → offers one after another  (worst case timeout × N)
//! FanOut::Concurrent → offers joined together    (worst case timeout)
//! ```
//!
//! ## Rules
//! - **Snapshot**: a broadcast sees exactly the members present when it starts
//! - **Isolation**: a timed-out offer drops the message for that subscriber only
//! - **No retries**: a dropped message is gone for that subscriber
//! - **Per-subscriber FIFO**: a broadcast finishes before the next one begins
//! - **Pruning**: handles found dropped during a broadcast are removed

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;

use crate::core::FanOut;

use super::outlet::{Delivery, Outlet};
use super::subscriber::SubscriberId;

/// Summary of one broadcast pass.
#[derive(Debug, Default)]
pub(crate) struct BroadcastReport {
    /// Number of subscribers that took the message.
    pub delivered: usize,
    /// Subscribers that did not read within the timeout.
    pub dropped: Vec<SubscriberId>,
    /// Subscribers whose handle was gone; already removed from the set.
    pub detached: Vec<SubscriberId>,
}

/// Subscribers currently registered with the actor.
pub(crate) struct SubscriberSet<T> {
    outlets: HashMap<SubscriberId, Outlet<T>>,
}

impl<T> SubscriberSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            outlets: HashMap::new(),
        }
    }

    /// Adds a subscriber; returns `false` if the id is already present.
    pub(crate) fn insert(&mut self, outlet: Outlet<T>) -> bool {
        let id = outlet.id();
        if self.outlets.contains_key(&id) {
            return false;
        }
        self.outlets.insert(id, outlet);
        true
    }

    /// Removes and closes a subscriber; returns `false` if it was not present.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.outlets.remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.outlets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    /// Closes every remaining subscriber and returns how many were closed.
    pub(crate) fn close_all(&mut self) -> usize {
        let closed = self.outlets.len();
        self.outlets.clear();
        closed
    }
}

impl<T: Clone> SubscriberSet<T> {
    /// Offers `message` to every current subscriber.
    pub(crate) async fn broadcast(
        &mut self,
        message: T,
        timeout: Duration,
        fan_out: FanOut,
    ) -> BroadcastReport {
        let outcomes: Vec<(SubscriberId, Delivery)> = match fan_out {
            FanOut::Sequential => {
                let mut outcomes = Vec::with_capacity(self.outlets.len());
                for (id, outlet) in self.outlets.iter_mut() {
                    let msg = message.clone();
                    outcomes.push((*id, outlet.offer(msg, timeout).await));
                }
                outcomes
            }
            FanOut::Concurrent => {
                let offers = self.outlets.iter_mut().map(|(id, outlet)| {
                    let msg = message.clone();
                    async move { (*id, outlet.offer(msg, timeout).await) }
                });
                join_all(offers).await
            }
        };

        let mut report = BroadcastReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::TimedOut => report.dropped.push(id),
                Delivery::Detached => {
                    self.outlets.remove(&id);
                    report.detached.push(id);
                }
            }
        }
        report
    }
}
