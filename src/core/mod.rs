//! Broker core: configuration, the public handle and the serialized actor.
//!
//! The public API from this module is [`Broker`], [`BrokerBuilder`], [`BrokerConfig`],
//! [`BrokerState`] and [`FanOut`].
//!
//! Internal modules:
//! - [`actor`]: single task that owns the subscriber set and handles one event at a time;
//! - [`broker`]: cloneable handle that talks to the actor through queues;
//! - [`builder`]: fluent construction;
//! - [`config`]: immutable settings and defaults.

mod actor;
mod broker;
mod builder;
mod config;

pub use broker::{Broker, BrokerState};
pub use builder::BrokerBuilder;
pub use config::{BrokerConfig, FanOut};
