//! # wall-remote: command-line remote for the LED wall
//!
//! Opens a session through `wall-core`, turns user input into wire
//! messages and prints what the wall reports back.
//!
//! ## Modes
//!
//! - **One-shot**: `text`, `draw`, `fill` and `break` connect, send one
//!   message and disconnect.
//! - **Interactive**: `paint` and `tetris` read commands from stdin until
//!   end of input, `done`/`exit` or Ctrl-C.

pub mod app;
pub mod paint;
pub mod remote;
pub mod tetris;
pub mod throttle;
