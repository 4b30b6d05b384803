//! Broadcast bus abstraction
//!
//! A bus has no notion of addressing: every published message reaches every
//! subscriber, including the publisher itself. Filtering is the subscriber's
//! job.

use crate::message::BusMessage;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use thiserror::Error;

/// Bus errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("bus is closed")]
    Closed,
}

/// Callback invoked for every message published on a bus
pub trait BusListener: Send + Sync {
    fn on_message(&self, sender: &str, topic: &str, payload: &str);
}

/// A broadcast publish/subscribe primitive
pub trait Bus: Send + Sync {
    /// Publishes a message to every subscriber
    fn publish(&self, sender: &str, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Installs a listener until the returned subscription is dropped
    fn subscribe(&self, listener: Arc<dyn BusListener>) -> Subscription;
}

impl<B: Bus + ?Sized> Bus for Arc<B> {
    fn publish(&self, sender: &str, topic: &str, payload: &str) -> Result<(), BusError> {
        (**self).publish(sender, topic, payload)
    }

    fn subscribe(&self, listener: Arc<dyn BusListener>) -> Subscription {
        (**self).subscribe(listener)
    }
}

/// Identifier of a subscription on a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

type Unsubscribe = Box<dyn FnOnce(SubscriptionId) + Send + Sync>;

/// RAII handle for an installed listener
///
/// Dropping the handle removes the listener from the bus.
pub struct Subscription {
    id: SubscriptionId,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    /// Creates a subscription that runs `unsubscribe` when dropped
    pub fn new(
        id: SubscriptionId,
        unsubscribe: impl FnOnce(SubscriptionId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// How a [`LocalBus`] hands messages to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Listeners run on the publisher's thread before `publish` returns
    #[default]
    Inline,
    /// Listeners run on a dedicated delivery thread, in publish order
    Background,
}

struct LocalBusInner {
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn BusListener>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    queue: Option<Sender<BusMessage>>,
}

impl LocalBusInner {
    fn deliver(&self, sender: &str, topic: &str, payload: &str) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        // Snapshot so listeners may publish or (un)subscribe re-entrantly.
        let listeners: Vec<Arc<dyn BusListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_message(sender, topic, payload);
        }
    }
}

/// In-memory broadcast bus shared by every participant in one process
///
/// Cloning a `LocalBus` yields another handle to the same bus.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<LocalBusInner>,
    mode: DeliveryMode,
}

impl LocalBus {
    /// Creates a bus that delivers inline
    pub fn new() -> Self {
        Self::with_mode(DeliveryMode::Inline)
    }

    /// Creates a bus with the given delivery mode
    pub fn with_mode(mode: DeliveryMode) -> Self {
        match mode {
            DeliveryMode::Inline => Self {
                inner: Arc::new(LocalBusInner {
                    listeners: RwLock::new(Vec::new()),
                    next_id: AtomicU64::new(1),
                    closed: AtomicBool::new(false),
                    queue: None,
                }),
                mode,
            },
            DeliveryMode::Background => {
                let (tx, rx) = crossbeam_channel::unbounded();
                let inner = Arc::new(LocalBusInner {
                    listeners: RwLock::new(Vec::new()),
                    next_id: AtomicU64::new(1),
                    closed: AtomicBool::new(false),
                    queue: Some(tx),
                });
                spawn_delivery_thread(Arc::downgrade(&inner), rx);
                Self { inner, mode }
            }
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Stops delivery; later publishes fail with [`BusError::Closed`]
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        tracing::debug!("local bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the number of installed listeners
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("mode", &self.mode)
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Bus for LocalBus {
    fn publish(&self, sender: &str, topic: &str, payload: &str) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        tracing::trace!(sender, topic, bytes = payload.len(), "publish");
        match &self.inner.queue {
            None => {
                self.inner.deliver(sender, topic, payload);
                Ok(())
            }
            Some(queue) => queue
                .send(BusMessage::new(sender, topic, payload))
                .map_err(|_| BusError::Closed),
        }
    }

    fn subscribe(&self, listener: Arc<dyn BusListener>) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(id, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.write().retain(|(sub, _)| *sub != id);
            }
        })
    }
}

fn spawn_delivery_thread(inner: Weak<LocalBusInner>, queue: Receiver<BusMessage>) {
    let spawned = thread::Builder::new()
        .name("local-bus-delivery".to_string())
        .spawn(move || {
            // Ends once every handle to the bus (and so the sender) is gone.
            for message in queue.iter() {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.deliver(&message.sender, &message.topic, &message.payload);
            }
        });
    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to spawn bus delivery thread");
    }
}
