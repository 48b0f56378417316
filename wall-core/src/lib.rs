//! # wall-core
//!
//! Client library for driving an LED wall over TCP.
//!
//! This crate contains:
//! - **Codec**: typed JSON [`Message`]s, tolerant decoders and the
//!   [`WallCodec`] stream framer for `tokio_util`
//! - **Queue**: [`OutboundQueue`], the FIFO producers push wire messages into
//! - **State**: [`ConnectionState`] (endpoint, device id, status) and the
//!   [`ConnectionPhase`] state machine
//! - **Engine**: [`ConnectionEngine`], one background task per session
//! - **Game**: [`GameState`] and the [`GameTracker`] that folds tetris updates
//! - **Subscriber**: the [`Subscriber`] trait events are delivered through
//! - **Config**: [`WallConfig`], TOML-backed settings
//! - **Error**: [`WallError`], a `thiserror`-based error type

pub mod codec;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod game;
pub mod queue;
pub mod state;
pub mod subscriber;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{
    Function, Grid, MAX_FRAME_SIZE, Message, Pixel, TetrisAction, TextColor, TextMessage,
    WallCodec,
};
pub use config::{EngineConfig, WallConfig};
pub use device::device_id;
pub use engine::ConnectionEngine;
pub use error::WallError;
pub use game::{GameState, GameTracker, Stone};
pub use queue::OutboundQueue;
pub use state::{ConnectionPhase, ConnectionState, SessionInfo};
pub use subscriber::{ChannelSubscriber, Event, Subscriber, SubscriberSlot};
