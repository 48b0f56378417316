//! Remote configuration: wall endpoint, timings, device id, logging.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WallError;

/// Ports the wall may listen on.
pub const PORT_RANGE: RangeInclusive<u16> = 1024..=65535;

/// Top-level configuration for the remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Device identity.
    pub device: DeviceConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// IPv4 address of the wall.
    pub address: String,
    /// TCP port of the wall.
    pub port: u16,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Handshake wait/read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Upper bound between exchange-loop polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Delay before closing the socket after a session ends.
    pub close_grace_ms: u64,
}

/// Device identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Identifier sent with `connect`. 0 means "derive from the platform".
    pub udid: u32,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "192.168.10.110".into(),
            port: 5432,
            connect_timeout_ms: 2500,
            read_timeout_ms: 2500,
            poll_interval_ms: 50,
            close_grace_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Check that `address` is a dotted-quad IPv4 address.
pub fn validate_address(address: &str) -> Result<Ipv4Addr, WallError> {
    address
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| WallError::InvalidConfig(format!("'{address}' is not an IPv4 address")))
}

/// Check that `port` is one the wall may listen on.
pub fn validate_port(port: u16) -> Result<u16, WallError> {
    if PORT_RANGE.contains(&port) {
        Ok(port)
    } else {
        Err(WallError::InvalidConfig(format!(
            "port {port} outside {}..={}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        )))
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl WallConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Persist this configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<(), WallError> {
        let text = toml::to_string_pretty(self).map_err(|e| WallError::Encoding(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<(), WallError> {
        Self::default().save(path)
    }

    /// Validate the endpoint before it is handed to the engine.
    pub fn validate(&self) -> Result<(), WallError> {
        validate_address(&self.network.address)?;
        validate_port(self.network.port)?;
        if self.network.poll_interval_ms == 0 {
            return Err(WallError::InvalidConfig(
                "poll_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The configured udid, or the platform-derived one when unset.
    pub fn device_id(&self) -> u32 {
        match self.device.udid {
            0 => crate::device::device_id(),
            udid => udid,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(&self.network)
    }
}

// ── EngineConfig ─────────────────────────────────────────────────

/// Timings used by [`crate::engine::ConnectionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub poll_interval: Duration,
    pub close_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for EngineConfig {
    fn from(net: &NetworkConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(net.connect_timeout_ms),
            read_timeout: Duration::from_millis(net.read_timeout_ms),
            poll_interval: Duration::from_millis(net.poll_interval_ms.max(1)),
            close_grace: Duration::from_millis(net.close_grace_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
