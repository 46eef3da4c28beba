//! # Subscriber handles and the actor-side subscriber set.
//!
//! ## Architecture
//! ```text
//!   Subscriber::recv() ── slot ──► [demand queue] ──► Outlet::offer(msg) ── msg ──► slot
//!   (client side)                                     (owned by SubscriberSet in the actor)
//! ```
//!
//! - [`Subscriber`] is public; it only reads and reports whether it is closed.
//! - `Outlet` and `SubscriberSet` are internal to the broker actor, which is the only
//!   component allowed to close a subscriber.

mod outlet;
mod set;
mod subscriber;

pub(crate) use outlet::Outlet;
pub(crate) use set::{BroadcastReport, SubscriberSet};
pub use subscriber::{Subscriber, SubscriberId};

use tokio::sync::mpsc;

/// Outstanding reads per subscriber; a handle only ever has one read in flight.
const DEMAND_CAPACITY: usize = 1;

/// Creates a connected actor/client pair with a fresh identity.
pub(crate) fn channel<T>() -> (Outlet<T>, Subscriber<T>) {
    let id = SubscriberId::next();
    let (tx, rx) = mpsc::channel(DEMAND_CAPACITY);
    (Outlet::new(id, rx), Subscriber::new(id, tx))
}
