use std::marker::PhantomData;
use std::time::Duration;

use super::broker::Broker;
use super::config::{BrokerConfig, FanOut};

/// Fluent builder for a [`Broker`].
///
/// Each setter consumes the builder and returns it with one option changed.
/// Nothing is started until [`build`](Self::build).
pub struct BrokerBuilder<T> {
    cfg: BrokerConfig,
    _message: PhantomData<fn() -> T>,
}

impl<T> BrokerBuilder<T> {
    /// Creates a new builder starting from the given configuration.
    pub fn new(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            _message: PhantomData,
        }
    }

    /// Sets the bound applied to publish, subscribe, unsubscribe and every per-subscriber offer.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout = timeout;
        self
    }

    /// Sets the inbound queue capacity (`0` = publish waits for the actor).
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.cfg.buffer_capacity = capacity;
        self
    }

    /// Sets the broadcast strategy.
    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.cfg.fan_out = fan_out;
        self
    }

    /// Sets the lifecycle event bus capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.cfg.event_capacity = capacity;
        self
    }

    /// Returns the configuration collected so far.
    pub fn config(&self) -> &BrokerConfig {
        &self.cfg
    }
}

impl<T: Clone + Send + 'static> BrokerBuilder<T> {
    /// Builds the broker and starts its actor in the background.
    ///
    /// Returns immediately; the actor is already accepting requests.
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn build(self) -> Broker<T> {
        Broker::spawn(self.cfg)
    }
}

impl<T> Default for BrokerBuilder<T> {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}
