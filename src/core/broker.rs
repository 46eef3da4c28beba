//! # Broker: the public handle over the broker actor.
//!
//! [`Broker`] is a cheap, cloneable handle. Every clone talks to the same background
//! [`BrokerActor`](super::actor::BrokerActor); none of them touches the subscriber set.
//!
//! ## Operations
//! ```text
//! publish(msg)     ──► inbound queue          ≤ timeout   → Ok | Timeout | Closed
//! subscribe()      ──► Command::Subscribe     ≤ timeout   → Subscriber | Timeout | Closed
//! unsubscribe(&s)  ──► Command::Unsubscribe   ≤ timeout   → Ok | Timeout | Closed
//! close()          ──► latch + shutdown token → waits for the actor → Ok | Closed
//! ```
//!
//! ## Lifecycle
//! ```text
//! Running ──close()──► Closed   (terminal; every later call returns BrokerError::Closed)
//! ```
//! Dropping the last handle without `close()` also stops the actor and closes every subscriber.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fanout::{Broker, BrokerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), BrokerError> {
//!     let broker = Broker::<String>::builder()
//!         .with_timeout(Duration::from_millis(10))
//!         .with_buffer_capacity(100)
//!         .build();
//!
//!     let mut sub = broker.subscribe().await?;
//!     let publisher = broker.clone();
//!     tokio::spawn(async move { publisher.publish("hello".to_string()).await });
//!
//!     assert_eq!(sub.recv().await.as_deref(), Some("hello"));
//!
//!     broker.close().await?;
//!     assert_eq!(broker.close().await, Err(BrokerError::Closed));
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::events::{Bus, Event};
use crate::subscribers::{self, Subscriber};

use super::actor::{BrokerActor, BrokerActorParams, Command, Envelope};
use super::builder::BrokerBuilder;
use super::config::BrokerConfig;

/// Commands in flight at once; every command is acknowledged, so this stays small.
const COMMAND_CAPACITY: usize = 1;

/// Lifecycle state of a broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerState {
    /// Accepting publishes and membership changes.
    Running,
    /// Shut down; every operation fails with [`BrokerError::Closed`].
    Closed,
}

/// Shared state behind every [`Broker`] clone.
struct Inner<T> {
    cfg: BrokerConfig,
    inbound: mpsc::Sender<Envelope<T>>,
    commands: mpsc::Sender<Command<T>>,
    /// Tells the actor to stop.
    shutdown: CancellationToken,
    /// Fired by the actor after it closed every subscriber.
    stopped: CancellationToken,
    /// One-shot `Running → Closed` latch.
    closed: AtomicBool,
    bus: Bus,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle to a running broker.
pub struct Broker<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Broker<T> {
    /// Builds a broker with the default configuration.
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder with the default configuration.
    pub fn builder() -> BrokerBuilder<T> {
        BrokerBuilder::default()
    }

    /// Creates the queues and spawns the actor on the current runtime.
    pub(crate) fn spawn(cfg: BrokerConfig) -> Self {
        let (inbound, inbound_rx) = mpsc::channel(cfg.inbound_capacity());
        let (commands, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        let bus = Bus::new(cfg.event_capacity_clamped());

        let actor = BrokerActor::new(
            inbound_rx,
            commands_rx,
            shutdown.clone(),
            stopped.clone(),
            BrokerActorParams {
                timeout: cfg.timeout,
                fan_out: cfg.fan_out,
            },
            bus.clone(),
        );
        tokio::spawn(actor.run());

        Self {
            inner: Arc::new(Inner {
                cfg,
                inbound,
                commands,
                shutdown,
                stopped,
                closed: AtomicBool::new(false),
                bus,
            }),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broker<T> {
    /// Publishes a message to every current subscriber.
    ///
    /// Waits until the inbound queue accepts the message (or, with `buffer_capacity = 0`,
    /// until the actor takes it). Success means the message reached the broker; it says
    /// nothing about individual subscribers, which may drop it after their own timeout.
    ///
    /// # Errors
    /// - [`BrokerError::Timeout`] if the queue stayed full for the whole timeout; the message
    ///   is not broadcast and the call may be retried.
    /// - [`BrokerError::Closed`] if the broker has shut down.
    pub async fn publish(&self, message: T) -> Result<(), BrokerError> {
        self.ensure_running()?;
        let timeout = self.inner.cfg.timeout;

        if !self.inner.cfg.is_synchronous() {
            return self
                .inner
                .inbound
                .send_timeout(Envelope::new(message), timeout)
                .await
                .map_err(|e| match e {
                    mpsc::error::SendTimeoutError::Timeout(_) => BrokerError::Timeout { timeout },
                    mpsc::error::SendTimeoutError::Closed(_) => BrokerError::Closed,
                });
        }

        let deadline = Instant::now() + timeout;
        let (ack, taken) = oneshot::channel();
        let envelope = Envelope::acknowledged(message, ack);
        match timeout_at(deadline, self.inner.inbound.send(envelope)).await {
            Err(_elapsed) => Err(BrokerError::Timeout { timeout }),
            Ok(Err(_closed)) => Err(BrokerError::Closed),
            Ok(Ok(())) => await_ack(taken, deadline, timeout).await,
        }
    }

    /// Registers a new subscriber.
    ///
    /// Returns once the actor has acknowledged the registration, so every message published
    /// after this call returns is offered to the new handle.
    ///
    /// Messages are matched against the subscriber set when the actor dequeues them, not when
    /// `publish` returns. Registration requests are served ahead of queued messages, so the
    /// new handle may also receive messages that were accepted before this call but were
    /// still waiting in the inbound queue.
    ///
    /// # Errors
    /// - [`BrokerError::Timeout`] if the actor did not accept the request in time; the handle
    ///   is never registered.
    /// - [`BrokerError::Closed`] if the broker has shut down.
    pub async fn subscribe(&self) -> Result<Subscriber<T>, BrokerError> {
        self.ensure_running()?;
        let (outlet, subscriber) = subscribers::channel();
        let (ack, accepted) = oneshot::channel();
        self.request(Command::Subscribe { outlet, ack }, accepted)
            .await?;
        Ok(subscriber)
    }

    /// Removes a subscriber and closes its handle.
    ///
    /// Unsubscribing a handle that is already removed (or belongs to another broker) is a no-op.
    /// A delivery already in flight to this handle is not cancelled.
    ///
    /// # Errors
    /// - [`BrokerError::Timeout`] if the actor did not accept the request in time; the handle
    ///   stays subscribed and the call may be retried.
    /// - [`BrokerError::Closed`] if the broker has shut down.
    pub async fn unsubscribe(&self, subscriber: &Subscriber<T>) -> Result<(), BrokerError> {
        self.ensure_running()?;
        let (ack, accepted) = oneshot::channel();
        let id = subscriber.id();
        self.request(Command::Unsubscribe { id, ack }, accepted)
            .await
    }

    /// Shuts the broker down.
    ///
    /// The first call stops the actor and waits until every subscriber handle is closed.
    ///
    /// # Errors
    /// [`BrokerError::Closed`] on every call after the first.
    pub async fn close(&self) -> Result<(), BrokerError> {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BrokerError::Closed);
        }
        self.inner.shutdown.cancel();
        self.inner.stopped.cancelled().await;
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> BrokerState {
        if self.is_closed() {
            BrokerState::Closed
        } else {
            BrokerState::Running
        }
    }

    /// Returns `true` once `close()` has been called.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the configuration this broker was built with.
    #[inline]
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.cfg
    }

    /// Returns a receiver of lifecycle events emitted after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    #[inline]
    fn ensure_running(&self) -> Result<(), BrokerError> {
        if self.is_closed() {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }

    /// Hands a command to the actor and waits for its acknowledgement, both within one timeout.
    async fn request(
        &self,
        cmd: Command<T>,
        accepted: oneshot::Receiver<()>,
    ) -> Result<(), BrokerError> {
        let timeout = self.inner.cfg.timeout;
        let deadline = Instant::now() + timeout;
        match timeout_at(deadline, self.inner.commands.send(cmd)).await {
            Err(_elapsed) => Err(BrokerError::Timeout { timeout }),
            Ok(Err(_closed)) => Err(BrokerError::Closed),
            Ok(Ok(())) => await_ack(accepted, deadline, timeout).await,
        }
    }
}

impl<T> fmt::Debug for Broker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("state", &self.state())
            .field("config", &self.inner.cfg)
            .finish()
    }
}

/// Waits for the actor's acknowledgement until `deadline`.
///
/// On timeout the receiver is closed first, so the actor either sees the refusal and drops
/// the request, or its acknowledgement is already stored and counts as success.
async fn await_ack(
    mut ack: oneshot::Receiver<()>,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), BrokerError> {
    match timeout_at(deadline, &mut ack).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_dropped)) => Err(BrokerError::Closed),
        Err(_elapsed) => {
            ack.close();
            match ack.try_recv() {
                Ok(()) => Ok(()),
                Err(_) => Err(BrokerError::Timeout { timeout }),
            }
        }
    }
}
