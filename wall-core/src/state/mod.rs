pub mod phase;
mod shared;

pub use phase::ConnectionPhase;
pub use shared::{ConnectionState, SessionInfo};
