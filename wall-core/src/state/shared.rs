//! Shared record of the endpoint, device id and connection status.
//!
//! Read and written from application code and from the engine task.
//! Every access goes through one mutex so `connected` and the session
//! descriptor are never observed half-updated.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Describes the live socket while a session owns one.
///
/// The socket itself stays inside the engine task; producers only ever
/// see this descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub peer_addr: SocketAddr,
    pub local_addr: SocketAddr,
    pub opened_at: Instant,
}

#[derive(Debug, Clone, Default)]
struct Fields {
    address: String,
    port: u16,
    device_id: u32,
    connected: bool,
    session: Option<SessionInfo>,
}

/// Cloneable handle to the shared connection state.
///
/// Setters are plain assignment; validation belongs to whoever collects
/// the values (see [`crate::config::WallConfig::validate`]).
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    inner: Arc<Mutex<Fields>>,
}

impl ConnectionState {
    pub fn new(address: impl Into<String>, port: u16, device_id: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Fields {
                address: address.into(),
                port,
                device_id,
                ..Fields::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Fields> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Endpoint ──────────────────────────────────────────────────

    pub fn address(&self) -> String {
        self.lock().address.clone()
    }

    pub fn set_address(&self, address: impl Into<String>) {
        self.lock().address = address.into();
    }

    pub fn port(&self) -> u16 {
        self.lock().port
    }

    pub fn set_port(&self, port: u16) {
        self.lock().port = port;
    }

    /// Address and port read under one lock.
    pub fn endpoint(&self) -> (String, u16) {
        let fields = self.lock();
        (fields.address.clone(), fields.port)
    }

    // ── Device ────────────────────────────────────────────────────

    pub fn device_id(&self) -> u32 {
        self.lock().device_id
    }

    pub fn set_device_id(&self, device_id: u32) {
        self.lock().device_id = device_id;
    }

    // ── Connection status ─────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.lock().session
    }

    pub fn set_session(&self, session: Option<SessionInfo>) {
        self.lock().session = session;
    }

    /// Record an accepted handshake: session and flag set together.
    pub fn mark_connected(&self, session: SessionInfo) {
        let mut fields = self.lock();
        fields.session = Some(session);
        fields.connected = true;
    }

    /// Clear the flag and the session descriptor together.
    pub fn mark_disconnected(&self) {
        let mut fields = self.lock();
        fields.connected = false;
        fields.session = None;
    }

    /// `connected` and the session descriptor read under one lock.
    pub fn snapshot(&self) -> (bool, Option<SessionInfo>) {
        let fields = self.lock();
        (fields.connected, fields.session)
    }
}
