//! # BrokerActor: the single serialized coordinator.
//!
//! The actor owns the [`SubscriberSet`] and is the only code that mutates it or closes a
//! subscriber. Callers talk to it exclusively through queues:
//!
//! ```text
//!   Broker::publish ───► [inbound  (bounded, buffer_capacity)] ──┐
//!   Broker::subscribe ─┐                                         │
//!   Broker::unsubscribe┴► [commands (acknowledged)] ─────────────┼──► BrokerActor::run()
//!   Broker::close ─────► shutdown token ─────────────────────────┘          │
//!                                                                          ▼
//!                                                  SubscriberSet::broadcast / insert / remove
//! ```
//!
//! ## Event loop
//! ```text
//! loop {
//!   select! (biased) {
//!     ├─► shutdown cancelled → break
//!     ├─► Command::Subscribe   → ack, then insert
//!     ├─► Command::Unsubscribe → ack, then remove (closes handle)
//!     └─► Envelope             → ack (synchronous publish), broadcast to snapshot
//!   }
//! }
//! close_all() → BrokerStopped → stopped token
//! ```
//!
//! ## Rules
//! - Exactly **one** event is handled at a time; broadcasts never interleave with membership changes
//! - A request whose caller already gave up (ack receiver closed) has **no effect**
//! - Shutdown interrupts an in-progress broadcast
//! - The `stopped` token fires after every handle was closed, also when the actor unwinds

use std::time::Duration;

use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::core::FanOut;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{BroadcastReport, Outlet, SubscriberId, SubscriberSet};

/// Membership request sent to the actor.
pub(crate) enum Command<T> {
    /// Register a new subscriber; `ack` is answered before the outlet is inserted.
    Subscribe {
        outlet: Outlet<T>,
        ack: oneshot::Sender<()>,
    },
    /// Remove and close a subscriber after answering `ack`; unknown ids are a no-op.
    Unsubscribe {
        id: SubscriberId,
        ack: oneshot::Sender<()>,
    },
}

/// One published message on the inbound queue.
pub(crate) struct Envelope<T> {
    pub message: T,
    /// Present for synchronous brokers: the publisher waits for the actor to take the message.
    pub ack: Option<oneshot::Sender<()>>,
}

impl<T> Envelope<T> {
    #[inline]
    pub(crate) fn new(message: T) -> Self {
        Self { message, ack: None }
    }

    #[inline]
    pub(crate) fn acknowledged(message: T, ack: oneshot::Sender<()>) -> Self {
        Self {
            message,
            ack: Some(ack),
        }
    }
}

/// Parameters copied from the broker configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BrokerActorParams {
    /// Bound for each per-subscriber offer.
    pub timeout: Duration,
    /// Broadcast strategy.
    pub fan_out: FanOut,
}

/// Serialized owner of the subscriber set.
pub(crate) struct BrokerActor<T> {
    subscribers: SubscriberSet<T>,
    inbound: mpsc::Receiver<Envelope<T>>,
    commands: mpsc::Receiver<Command<T>>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
    params: BrokerActorParams,
    bus: Bus,
}

impl<T: Clone + Send + 'static> BrokerActor<T> {
    pub(crate) fn new(
        inbound: mpsc::Receiver<Envelope<T>>,
        commands: mpsc::Receiver<Command<T>>,
        shutdown: CancellationToken,
        stopped: CancellationToken,
        params: BrokerActorParams,
        bus: Bus,
    ) -> Self {
        Self {
            subscribers: SubscriberSet::new(),
            inbound,
            commands,
            shutdown,
            stopped,
            params,
            bus,
        }
    }

    /// Runs the actor until the shutdown token is cancelled or every sender is gone.
    pub(crate) async fn run(mut self) {
        let stopped = self.stopped.clone().drop_guard();

        self.event_loop().await;
        self.shut_down();

        drop(self);
        drop(stopped);
    }

    async fn event_loop(&mut self) {
        loop {
            select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                envelope = self.inbound.recv() => match envelope {
                    Some(envelope) => {
                        if !self.handle_message(envelope).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    fn handle_command(&mut self, cmd: Command<T>) {
        match cmd {
            Command::Subscribe { outlet, ack } => {
                let id = outlet.id();
                if ack.send(()).is_err() {
                    debug!(subscriber = %id, "subscribe request abandoned by caller");
                    return;
                }
                if self.subscribers.insert(outlet) {
                    debug!(subscriber = %id, total = self.subscribers.len(), "subscriber added");
                    self.bus
                        .publish(Event::new(EventKind::SubscriberAdded).with_subscriber(id));
                }
            }
            Command::Unsubscribe { id, ack } => {
                if ack.send(()).is_err() {
                    debug!(subscriber = %id, "unsubscribe request abandoned by caller");
                    return;
                }
                if self.subscribers.remove(id) {
                    debug!(subscriber = %id, total = self.subscribers.len(), "subscriber removed");
                    self.bus
                        .publish(Event::new(EventKind::SubscriberRemoved).with_subscriber(id));
                }
            }
        }
    }

    /// Broadcasts one message. Returns `false` if shutdown interrupted the broadcast.
    async fn handle_message(&mut self, envelope: Envelope<T>) -> bool {
        let Envelope { message, ack } = envelope;

        if let Some(ack) = ack {
            if ack.send(()).is_err() {
                trace!("publisher gave up before hand-off; message discarded");
                return true;
            }
        }
        if self.subscribers.is_empty() {
            trace!("no subscribers; message discarded");
            return true;
        }

        let BrokerActorParams { timeout, fan_out } = self.params;
        let report = select! {
            biased;

            _ = self.shutdown.cancelled() => return false,

            report = self.subscribers.broadcast(message, timeout, fan_out) => report,
        };
        self.report(report, timeout);
        true
    }

    fn report(&self, report: BroadcastReport, timeout: Duration) {
        trace!(
            delivered = report.delivered,
            dropped = report.dropped.len(),
            detached = report.detached.len(),
            "broadcast finished"
        );
        for id in report.dropped {
            debug!(subscriber = %id, ?timeout, "message dropped for slow subscriber");
            self.bus.publish(Event::message_dropped(id, timeout));
        }
        for id in report.detached {
            debug!(subscriber = %id, "subscriber handle dropped; pruned");
            self.bus
                .publish(Event::new(EventKind::SubscriberDetached).with_subscriber(id));
        }
    }

    fn shut_down(&mut self) {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.inbound.close();
        self.commands.close();

        let closed = self.subscribers.close_all();
        debug!(closed, "broker stopped");
        self.bus.publish(Event::new(EventKind::BrokerStopped));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::channel;

    struct Harness {
        inbound: mpsc::Sender<Envelope<u32>>,
        commands: mpsc::Sender<Command<u32>>,
        shutdown: CancellationToken,
        stopped: CancellationToken,
        events: tokio::sync::broadcast::Receiver<Event>,
    }

    fn spawn_actor(timeout: Duration) -> Harness {
        let (inbound, inbound_rx) = mpsc::channel(4);
        let (commands, commands_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        let bus = Bus::new(64);
        let events = bus.subscribe();

        let actor = BrokerActor::new(
            inbound_rx,
            commands_rx,
            shutdown.clone(),
            stopped.clone(),
            BrokerActorParams {
                timeout,
                fan_out: FanOut::Sequential,
            },
            bus,
        );
        tokio::spawn(actor.run());

        Harness {
            inbound,
            commands,
            shutdown,
            stopped,
            events,
        }
    }

    #[tokio::test]
    async fn test_abandoned_subscribe_is_not_registered() {
        let mut h = spawn_actor(Duration::from_secs(1));
        let (outlet, sub) = channel::<u32>();
        let (ack, accepted) = oneshot::channel();
        drop(accepted);

        h.commands
            .send(Command::Subscribe { outlet, ack })
            .await
            .expect("send");

        // The rejected outlet is dropped by the actor.
        let mut sub = sub;
        assert_eq!(sub.recv().await, None);

        h.shutdown.cancel();
        h.stopped.cancelled().await;
        let kinds: Vec<EventKind> = std::iter::from_fn(|| h.events.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert!(!kinds.contains(&EventKind::SubscriberAdded));
        assert!(kinds.contains(&EventKind::BrokerStopped));
    }

    #[tokio::test]
    async fn test_abandoned_unsubscribe_keeps_subscriber() {
        let mut h = spawn_actor(Duration::from_secs(1));
        let (outlet, sub) = channel::<u32>();
        let id = sub.id();
        let (ack, accepted) = oneshot::channel();
        h.commands
            .send(Command::Subscribe { outlet, ack })
            .await
            .expect("send");
        accepted.await.expect("ack");

        let (ack, accepted) = oneshot::channel();
        drop(accepted);
        h.commands
            .send(Command::Unsubscribe { id, ack })
            .await
            .expect("send");

        // A second acknowledged command proves the abandoned one was handled.
        let (outlet, _other) = channel::<u32>();
        let (ack, accepted) = oneshot::channel();
        h.commands
            .send(Command::Subscribe { outlet, ack })
            .await
            .expect("send");
        accepted.await.expect("ack");
        assert!(!sub.is_closed());

        h.shutdown.cancel();
        h.stopped.cancelled().await;
        let kinds: Vec<EventKind> = std::iter::from_fn(|| h.events.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert!(!kinds.contains(&EventKind::SubscriberRemoved));
    }

    #[tokio::test]
    async fn test_shutdown_closes_registered_subscribers() {
        let h = spawn_actor(Duration::from_secs(1));
        let (outlet, mut sub) = channel::<u32>();
        let (ack, accepted) = oneshot::channel();
        h.commands
            .send(Command::Subscribe { outlet, ack })
            .await
            .expect("send");
        accepted.await.expect("ack");

        h.shutdown.cancel();
        h.stopped.cancelled().await;
        assert!(sub.is_closed());
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_broadcast() {
        let h = spawn_actor(Duration::from_secs(3600));
        let (outlet, stalled) = channel::<u32>();
        let (ack, accepted) = oneshot::channel();
        h.commands
            .send(Command::Subscribe { outlet, ack })
            .await
            .expect("send");
        accepted.await.expect("ack");

        h.inbound.send(Envelope::new(1)).await.expect("send");
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), h.stopped.cancelled())
            .await
            .expect("actor stops without waiting for the offer timeout");
        assert!(stalled.is_closed());
    }

    #[tokio::test]
    async fn test_actor_stops_when_all_senders_dropped() {
        let h = spawn_actor(Duration::from_secs(1));
        let stopped = h.stopped.clone();
        drop(h);
        stopped.cancelled().await;
    }
}
