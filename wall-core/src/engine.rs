//! The connection engine: one task per session with the wall.
//!
//! ```text
//! producers ──push──► OutboundQueue ──drain──► socket ──► wall
//!                                                        │
//! Subscriber ◄──emit── GameTracker ◄──decode── socket ◄──┘
//! ```
//!
//! [`ConnectionEngine::start`] spawns the session task and returns at
//! once; [`ConnectionEngine::stop`] cancels it cooperatively. How the
//! session ended is reported through the subscriber, never through the
//! return value of `stop`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::codec::{Function, WallCodec, decode_function, decode_game_state, decode_status};
use crate::config::EngineConfig;
use crate::error::WallError;
use crate::game::GameTracker;
use crate::queue::OutboundQueue;
use crate::state::{ConnectionPhase, ConnectionState, SessionInfo};
use crate::subscriber::{Event, SubscriberSlot};

// ── ConnectionEngine ─────────────────────────────────────────────

/// Drives sessions with the wall on behalf of application code.
///
/// The engine shares the [`ConnectionState`] and [`OutboundQueue`] it was
/// built with; producers keep their own clones and push into the queue
/// directly or through [`enqueue`](Self::enqueue).
pub struct ConnectionEngine {
    state: ConnectionState,
    queue: OutboundQueue,
    subscribers: SubscriberSlot,
    config: EngineConfig,
    phase_tx: Arc<watch::Sender<ConnectionPhase>>,
    /// Cancellation handle of the current (or last) session.
    cancel: Mutex<Option<CancellationToken>>,
}

impl ConnectionEngine {
    pub fn new(state: ConnectionState, queue: OutboundQueue, subscribers: SubscriberSlot) -> Self {
        let (phase_tx, _) = watch::channel(ConnectionPhase::Idle);
        Self {
            state,
            queue,
            subscribers,
            config: EngineConfig::default(),
            phase_tx: Arc::new(phase_tx),
            cancel: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn subscribers(&self) -> &SubscriberSlot {
        &self.subscribers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Queue a wire message for the current or next session.
    pub fn enqueue(&self, message: impl Into<String>) {
        self.queue.push(message);
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase_tx.borrow().clone()
    }

    /// Observe phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase_tx.subscribe()
    }

    /// `true` from `start()` until the session has been cleaned up.
    pub fn is_running(&self) -> bool {
        !self.phase_tx.borrow().is_idle()
    }

    fn lock_cancel(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a session task on the current Tokio runtime.
    ///
    /// The caller is expected to have queued a `connect` message first.
    /// Fails with [`WallError::SessionActive`] while a previous session
    /// has not finished its cleanup.
    pub fn start(&self) -> Result<(), WallError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WallError::NoRuntime)?;
        let mut cancel_slot = self.lock_cancel();

        let started = self
            .phase_tx
            .send_if_modified(|phase| phase.begin_connect().is_ok());
        if !started {
            return Err(WallError::SessionActive);
        }

        let cancel = CancellationToken::new();
        *cancel_slot = Some(cancel.clone());

        let (address, port) = self.state.endpoint();
        let session = Session {
            state: self.state.clone(),
            queue: self.queue.clone(),
            subscribers: self.subscribers.clone(),
            config: self.config,
            phase_tx: Arc::clone(&self.phase_tx),
            cancel,
            tracker: GameTracker::new(),
        };
        runtime.spawn(
            session
                .run()
                .instrument(info_span!("wall_session", %address, port)),
        );
        Ok(())
    }

    /// Ask the running session to end. Idempotent; a no-op when idle.
    pub fn stop(&self) {
        if let Some(cancel) = self.lock_cancel().as_ref() {
            cancel.cancel();
        }
    }

    /// Wait until the current session (if any) has fully ended.
    pub async fn join(&self) {
        let mut rx = self.phase_tx.subscribe();
        if rx.wait_for(ConnectionPhase::is_idle).await.is_err() {
            debug!("phase channel closed while joining");
        }
    }
}

impl Drop for ConnectionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ConnectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("phase", &self.phase())
            .field("config", &self.config)
            .finish()
    }
}

// ── Session ──────────────────────────────────────────────────────

/// How a session ended.
#[derive(Debug)]
enum Ending {
    /// `stop()` was honoured.
    Stopped,
    /// The wall sent `disconnect`.
    PeerDisconnected,
    Failed(WallError),
}

/// State owned by one session task.
struct Session {
    state: ConnectionState,
    queue: OutboundQueue,
    subscribers: SubscriberSlot,
    config: EngineConfig,
    phase_tx: Arc<watch::Sender<ConnectionPhase>>,
    cancel: CancellationToken,
    tracker: GameTracker,
}

impl Session {
    async fn run(mut self) {
        let (mut framed, info) = match self.connect().await {
            Ok(connected) => connected,
            Err(ending) => return self.finish::<TcpStream>(ending, None).await,
        };

        let ending = match self.handshake(&mut framed, info).await {
            Ok(()) => self.exchange(&mut framed).await,
            Err(ending) => ending,
        };
        self.finish(ending, Some(framed)).await;
    }

    fn transition(&self, step: impl FnOnce(&mut ConnectionPhase) -> Result<(), WallError>) {
        self.phase_tx.send_if_modified(|phase| match step(phase) {
            Ok(()) => true,
            Err(e) => {
                warn!("phase {phase}: {e}");
                false
            }
        });
    }

    /// `Connecting`: open the TCP stream within the connect timeout.
    async fn connect(&self) -> Result<(Framed<TcpStream, WallCodec>, SessionInfo), Ending> {
        let (address, port) = self.state.endpoint();
        let timeout = self.config.connect_timeout;
        info!("connecting");

        let stream = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Ending::Stopped),
            res = tokio::time::timeout(timeout, TcpStream::connect((address.as_str(), port))) => {
                match res {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => return Err(Ending::Failed(e.into())),
                    Err(_) => return Err(Ending::Failed(WallError::Timeout(timeout))),
                }
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        let info = SessionInfo {
            peer_addr: stream.peer_addr().map_err(|e| Ending::Failed(e.into()))?,
            local_addr: stream.local_addr().map_err(|e| Ending::Failed(e.into()))?,
            opened_at: Instant::now(),
        };
        Ok((Framed::new(stream, WallCodec::new()), info))
    }

    /// `Handshaking`: send the first queued message and wait for the ack.
    async fn handshake<T>(
        &mut self,
        framed: &mut Framed<T, WallCodec>,
        info: SessionInfo,
    ) -> Result<(), Ending>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        self.transition(ConnectionPhase::begin_handshake);
        let timeout = self.config.read_timeout;

        let request = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Ending::Stopped),
            request = self.queue.wait_pop(timeout) => request.ok_or(Ending::Failed(
                WallError::ProtocolViolation("no connect message queued before start"),
            ))?,
        };
        if decode_function(&request) != Some(Function::Connect) {
            warn!(%request, "first queued message is not a connect request");
        }
        debug!(%request, "handshake request");
        framed.send(request).await.map_err(Ending::Failed)?;

        let reply = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Ending::Stopped),
            reply = tokio::time::timeout(timeout, framed.next()) => match reply {
                Ok(Some(Ok(raw))) => raw,
                Ok(Some(Err(e))) => return Err(Ending::Failed(e)),
                Ok(None) => return Err(Ending::Failed(WallError::ConnectionClosed)),
                Err(_) => return Err(Ending::Failed(WallError::Timeout(timeout))),
            },
        };
        if !decode_status(&reply) {
            return Err(Ending::Failed(WallError::HandshakeRejected(reply)));
        }

        self.state.mark_connected(info);
        self.transition(ConnectionPhase::complete_handshake);
        info!(peer = %info.peer_addr, "connected");
        self.subscribers.emit(Event::Connected).await;
        Ok(())
    }

    /// `Exchanging`: alternate between draining the queue and waiting for
    /// inbound frames, further pushes, `stop()` or the poll interval.
    async fn exchange<T>(&mut self, framed: &mut Framed<T, WallCodec>) -> Ending
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            // Only what is queued now; later pushes wait for the next turn.
            if let Err(e) = self.drain(framed, self.queue.len()).await {
                return Ending::Failed(e);
            }

            if self.cancel.is_cancelled() {
                // producers may have queued a goodbye while the last send was in flight
                if let Err(e) = self.drain(framed, usize::MAX).await {
                    return Ending::Failed(e);
                }
                return Ending::Stopped;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = self.queue.notified() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                frame = framed.next() => match frame {
                    Some(Ok(raw)) => {
                        if let Some(ending) = self.handle_inbound(&raw).await {
                            return ending;
                        }
                    }
                    Some(Err(e)) => return Ending::Failed(e),
                    None => return Ending::Failed(WallError::ConnectionClosed),
                },
            }
        }
    }

    /// Send up to `limit` queued messages in FIFO order.
    async fn drain<T>(
        &self,
        framed: &mut Framed<T, WallCodec>,
        limit: usize,
    ) -> Result<(), WallError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        for _ in 0..limit {
            let Some(message) = self.queue.pop() else {
                break;
            };
            debug!(%message, "outbound");
            framed.send(message).await?;
        }
        Ok(())
    }

    async fn handle_inbound(&mut self, raw: &str) -> Option<Ending> {
        match decode_function(raw) {
            Some(Function::Disconnect) => Some(Ending::PeerDisconnected),
            Some(Function::Tetris) => {
                let update = decode_game_state(raw);
                if update.is_empty() {
                    debug!(frame = raw, "tetris frame without game state");
                    return None;
                }
                let state = self.tracker.apply(update);
                debug!(%state, "game update");
                self.subscribers.emit(Event::GameUpdate(state)).await;
                None
            }
            Some(function) => {
                debug!(%function, "ignoring inbound function");
                None
            }
            None => {
                debug!(frame = raw, "ignoring unrecognised frame");
                None
            }
        }
    }

    /// Shared cleanup for every way a session can end.
    async fn finish<T>(self, ending: Ending, framed: Option<Framed<T, WallCodec>>)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.queue.clear();
        self.state.mark_disconnected();
        if let Some(framed) = framed {
            self.schedule_close(framed);
        }

        let uptime = self.phase_tx.borrow().exchanging_duration();
        let event = match ending {
            Ending::Stopped => {
                info!(?uptime, "session stopped");
                self.transition(ConnectionPhase::disconnect);
                Event::Disconnected
            }
            Ending::PeerDisconnected => {
                info!(?uptime, "wall ended the session");
                self.transition(ConnectionPhase::disconnect);
                Event::Disconnected
            }
            Ending::Failed(e) => {
                warn!("session failed: {e}");
                self.transition(ConnectionPhase::fail);
                Event::Failure(e.to_string())
            }
        };
        self.subscribers.emit(event).await;
        self.transition(ConnectionPhase::reset);
    }

    /// Close the socket after the grace delay so a just-flushed
    /// `disconnect` reaches the wall before the FIN.
    fn schedule_close<T>(&self, mut framed: Framed<T, WallCodec>)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let grace = self.config.close_grace;
        tokio::spawn(
            async move {
                tokio::time::sleep(grace).await;
                if let Err(e) = SinkExt::<String>::close(&mut framed).await {
                    debug!("socket close: {e}");
                }
            }
            .in_current_span(),
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────
