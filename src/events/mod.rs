//! Broker lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - `Bus` thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: the broker actor (membership changes, drops, shutdown).
//! - **Consumers**: whoever called [`Broker::events`](crate::Broker::events).

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
