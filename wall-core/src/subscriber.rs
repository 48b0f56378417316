//! Event delivery from the engine to application code.
//!
//! The engine never holds a UI object directly. It emits [`Event`]s into
//! a [`SubscriberSlot`] that the owner fills with [`register`] and empties
//! with [`unregister`] before tearing the subscriber down.
//!
//! [`register`]: SubscriberSlot::register
//! [`unregister`]: SubscriberSlot::unregister

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::game::GameState;

/// Callbacks invoked on the engine task, in wire order.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// The wall accepted the handshake.
    async fn on_connected(&self);

    /// A folded tetris state arrived.
    async fn on_game_update(&self, state: GameState);

    /// The session ended normally (local stop or peer `disconnect`).
    async fn on_disconnected(&self);

    /// The session could not be set up or broke down.
    async fn on_failure(&self, reason: String);
}

// ── Event ────────────────────────────────────────────────────────

/// A connection event, as delivered to a [`Subscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    GameUpdate(GameState),
    Disconnected,
    Failure(String),
}

impl Event {
    /// Terminal events end a session; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Disconnected | Event::Failure(_))
    }

    /// Invoke the matching callback on `subscriber`.
    pub async fn deliver(self, subscriber: &dyn Subscriber) {
        match self {
            Event::Connected => subscriber.on_connected().await,
            Event::GameUpdate(state) => subscriber.on_game_update(state).await,
            Event::Disconnected => subscriber.on_disconnected().await,
            Event::Failure(reason) => subscriber.on_failure(reason).await,
        }
    }
}

// ── ChannelSubscriber ────────────────────────────────────────────

/// Forwards every callback as an [`Event`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn on_connected(&self) {
        self.forward(Event::Connected);
    }

    async fn on_game_update(&self, state: GameState) {
        self.forward(Event::GameUpdate(state));
    }

    async fn on_disconnected(&self) {
        self.forward(Event::Disconnected);
    }

    async fn on_failure(&self, reason: String) {
        self.forward(Event::Failure(reason));
    }
}

// ── SubscriberSlot ───────────────────────────────────────────────

type SharedSubscriber = Arc<dyn Subscriber>;

/// Holds the currently registered subscriber, if any.
#[derive(Clone, Default)]
pub struct SubscriberSlot {
    current: Arc<RwLock<Option<SharedSubscriber>>>,
}

impl SubscriberSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot with `subscriber` already registered.
    pub fn with(subscriber: SharedSubscriber) -> Self {
        let slot = Self::new();
        slot.register(subscriber);
        slot
    }

    /// Register `subscriber`, returning the one it replaces.
    pub fn register(&self, subscriber: SharedSubscriber) -> Option<SharedSubscriber> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(subscriber)
    }

    /// Remove the current subscriber. Later events are dropped.
    pub fn unregister(&self) -> Option<SharedSubscriber> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_registered(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver `event` to the registered subscriber.
    pub async fn emit(&self, event: Event) {
        let subscriber = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match subscriber {
            Some(subscriber) => event.deliver(subscriber.as_ref()).await,
            None => debug!(?event, "no subscriber registered; event dropped"),
        }
    }
}

impl std::fmt::Debug for SubscriberSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}
