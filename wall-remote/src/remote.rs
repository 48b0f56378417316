//! One session with the wall, as used by every subcommand.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use wall_core::codec::{encode_connect, encode_disconnect};
use wall_core::{
    ChannelSubscriber, ConnectionEngine, ConnectionState, Event, OutboundQueue, SubscriberSlot,
    WallConfig, WallError,
};

/// Owns a [`ConnectionEngine`] and the channel its events arrive on.
#[derive(Debug)]
pub struct Remote {
    engine: ConnectionEngine,
    events: UnboundedReceiver<Event>,
    /// A terminal event has already been observed.
    ended: bool,
}

impl Remote {
    /// Build a remote for the validated endpoint in `config`.
    pub fn new(config: &WallConfig) -> Result<Self, WallError> {
        config.validate()?;
        let state = ConnectionState::new(
            config.network.address.trim(),
            config.network.port,
            config.device_id(),
        );
        let (subscriber, events) = ChannelSubscriber::new();
        let engine = ConnectionEngine::new(
            state,
            OutboundQueue::new(),
            SubscriberSlot::with(Arc::new(subscriber)),
        )
        .with_config(config.engine_config());

        Ok(Self {
            engine,
            events,
            ended: false,
        })
    }

    pub fn engine(&self) -> &ConnectionEngine {
        &self.engine
    }

    /// Open a session and wait for the wall to accept it.
    pub async fn connect(&mut self) -> Result<(), WallError> {
        let udid = self.engine.state().device_id();
        self.engine.enqueue(encode_connect(udid)?);
        self.engine.start()?;
        self.ended = false;

        match self.next_event().await {
            Some(Event::Connected) => {
                let (address, port) = self.engine.state().endpoint();
                info!(%address, port, udid, "wall accepted the remote");
                Ok(())
            }
            Some(Event::Failure(reason)) => {
                self.engine.join().await;
                Err(reason.into())
            }
            _ => {
                self.engine.join().await;
                Err(WallError::ConnectionClosed)
            }
        }
    }

    /// Queue a wire message for the wall.
    pub fn send(&self, message: impl Into<String>) {
        self.engine.enqueue(message);
    }

    /// The next event from the engine, or `None` once the session has
    /// ended and every event was consumed.
    pub async fn next_event(&mut self) -> Option<Event> {
        if self.ended {
            return self.events.try_recv().ok();
        }
        let event = self.events.recv().await?;
        if event.is_terminal() {
            self.ended = true;
        }
        Some(event)
    }

    pub fn is_connected(&self) -> bool {
        self.engine.state().is_connected()
    }

    /// Say goodbye to the wall and wait for the session to end.
    ///
    /// Messages queued before this call are flushed ahead of the
    /// `disconnect`. Events still pending are discarded.
    pub async fn disconnect(mut self, wait: Duration) -> Result<(), WallError> {
        if !self.ended {
            if self.is_connected() {
                self.engine.enqueue(encode_disconnect()?);
            }
            self.engine.stop();
            let terminal = tokio::time::timeout(wait, async {
                while let Some(event) = self.next_event().await {
                    if event.is_terminal() {
                        return event;
                    }
                    debug!(?event, "discarding event while disconnecting");
                }
                Event::Disconnected
            })
            .await
            .map_err(|_| WallError::Timeout(wait))?;
            if let Event::Failure(reason) = terminal {
                return Err(reason.into());
            }
        }
        tokio::time::timeout(wait, self.engine.join())
            .await
            .map_err(|_| WallError::Timeout(wait))
    }
}
