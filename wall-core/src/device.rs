//! Stable device identifier sent with `connect`.
//!
//! Derived once per process from the platform identity and cached.

use std::sync::OnceLock;

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];
const HOST_ENV_VARS: [&str; 2] = ["HOSTNAME", "COMPUTERNAME"];
const FALLBACK_IDENTITY: &str = "wall-remote";

static DEVICE_ID: OnceLock<u32> = OnceLock::new();

/// The cached device id for this machine. Always positive.
pub fn device_id() -> u32 {
    *DEVICE_ID.get_or_init(|| {
        let identity = platform_identity();
        let id = derive_device_id(&identity);
        tracing::debug!(id, "derived device id");
        id
    })
}

/// Hash `identity` into a positive 31-bit identifier.
pub fn derive_device_id(identity: &str) -> u32 {
    let hash = blake3::hash(identity.as_bytes());
    let mut word = [0u8; 4];
    word.copy_from_slice(&hash.as_bytes()[..4]);
    match u32::from_le_bytes(word) & 0x7fff_ffff {
        0 => 1,
        id => id,
    }
}

fn platform_identity() -> String {
    MACHINE_ID_PATHS
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .or_else(|| {
            HOST_ENV_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|s| !s.is_empty())
        })
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}
