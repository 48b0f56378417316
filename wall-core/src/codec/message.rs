//! Wire messages exchanged with the wall.
//!
//! # Wire Protocol
//!
//! Every message is a flat JSON object discriminated by `function`:
//!
//! ```text
//! Remote ──[connect]───────────► Wall   {function, status:"menu", udid}
//! Wall   ──[ack]───────────────► Remote {status:"success"|"failure"}
//! Remote ──[text|draw|break]───► Wall
//! Remote ──[tetris + action]───► Wall
//! Wall   ──[tetris + gameState]► Remote
//! either ──[disconnect]────────► other
//! ```
//!
//! Encoding goes through the typed [`Message`] enum. Decoding of inbound
//! traffic is tolerant: malformed or partial input degrades to `None`,
//! `false` or the sentinel [`GameState`] instead of an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WallError;
use crate::game::{GameState, Stone};

const KEY_FUNCTION: &str = "function";
const KEY_STATUS: &str = "status";
const KEY_GAME_STATE: &str = "gameState";

/// Status sent along with `connect` when the remote enters the menu.
pub const STATUS_MENU: &str = "menu";
/// Handshake acknowledgement meaning the wall accepted the remote.
pub const STATUS_SUCCESS: &str = "success";
/// Handshake acknowledgement meaning the wall rejected the remote.
pub const STATUS_FAILURE: &str = "failure";

/// Default text animation; the wall implements no others yet.
pub const ANIMATION_NONE: &str = "none";

// ── Function ─────────────────────────────────────────────────────

/// The message-kind discriminator carried in the `function` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Connect,
    Disconnect,
    Break,
    Text,
    Draw,
    Tetris,
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Connect => "connect",
            Function::Disconnect => "disconnect",
            Function::Break => "break",
            Function::Text => "text",
            Function::Draw => "draw",
            Function::Tetris => "tetris",
        }
    }
}

impl TryFrom<&str> for Function {
    type Error = WallError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "connect" => Ok(Function::Connect),
            "disconnect" => Ok(Function::Disconnect),
            "break" => Ok(Function::Break),
            "text" => Ok(Function::Text),
            "draw" => Ok(Function::Draw),
            "tetris" => Ok(Function::Tetris),
            _ => Err(WallError::UnknownVariant {
                type_name: "Function",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── TetrisAction ─────────────────────────────────────────────────

/// Controller input for the tetris game running on the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TetrisAction {
    #[serde(rename = "init")]
    Init,
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "quit")]
    Quit,
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "CC")]
    CounterClockwise,
    #[serde(rename = "C")]
    Clockwise,
}

impl TetrisAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TetrisAction::Init => "init",
            TetrisAction::Start => "start",
            TetrisAction::Quit => "quit",
            TetrisAction::Left => "L",
            TetrisAction::Right => "R",
            TetrisAction::CounterClockwise => "CC",
            TetrisAction::Clockwise => "C",
        }
    }
}

impl TryFrom<&str> for TetrisAction {
    type Error = WallError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "init" => Ok(TetrisAction::Init),
            "start" => Ok(TetrisAction::Start),
            "quit" => Ok(TetrisAction::Quit),
            "L" => Ok(TetrisAction::Left),
            "R" => Ok(TetrisAction::Right),
            "CC" => Ok(TetrisAction::CounterClockwise),
            "C" => Ok(TetrisAction::Clockwise),
            _ => Err(WallError::UnknownVariant {
                type_name: "TetrisAction",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for TetrisAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── TextColor ────────────────────────────────────────────────────

/// Colour used by the `text` function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    #[default]
    Red,
    Green,
    Blue,
    Multicolored,
}

impl TryFrom<&str> for TextColor {
    type Error = WallError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "red" => Ok(TextColor::Red),
            "green" => Ok(TextColor::Green),
            "blue" => Ok(TextColor::Blue),
            "multicolored" => Ok(TextColor::Multicolored),
            _ => Err(WallError::UnknownVariant {
                type_name: "TextColor",
                value: value.to_string(),
            }),
        }
    }
}

// ── Pixel / Grid ─────────────────────────────────────────────────

/// Colour code of a single LED in a [`Grid`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pixel {
    /// LED switched off (wire code 0).
    #[default]
    Off = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl TryFrom<u8> for Pixel {
    type Error = WallError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pixel::Off),
            1 => Ok(Pixel::Red),
            2 => Ok(Pixel::Green),
            3 => Ok(Pixel::Blue),
            _ => Err(WallError::UnknownVariant {
                type_name: "Pixel",
                value: value.to_string(),
            }),
        }
    }
}

impl Pixel {
    /// The colour a tap moves to: off, red, green, blue, then off again.
    pub fn cycled(self) -> Self {
        match self {
            Pixel::Off => Pixel::Red,
            Pixel::Red => Pixel::Green,
            Pixel::Green => Pixel::Blue,
            Pixel::Blue => Pixel::Off,
        }
    }
}

/// The 10×16 LED raster sent by the `draw` function, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Grid {
    pixels: [Pixel; Grid::LEN],
}

impl Grid {
    pub const WIDTH: usize = 10;
    pub const HEIGHT: usize = 16;
    pub const LEN: usize = Self::WIDTH * Self::HEIGHT;

    /// A grid with every LED switched off.
    pub fn new() -> Self {
        Self::filled(Pixel::Off)
    }

    pub fn filled(pixel: Pixel) -> Self {
        Self {
            pixels: [pixel; Self::LEN],
        }
    }

    /// Build a grid from raw wire codes, validating length and range.
    pub fn from_codes(codes: &[u8]) -> Result<Self, WallError> {
        if codes.len() != Self::LEN {
            return Err(WallError::InvalidGrid {
                expected: Self::LEN,
                actual: codes.len(),
            });
        }
        let mut grid = Self::new();
        for (slot, &code) in grid.pixels.iter_mut().zip(codes) {
            *slot = Pixel::try_from(code)?;
        }
        Ok(grid)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        Self::index(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<(), WallError> {
        let i = Self::index(x, y).ok_or(WallError::ProtocolViolation(
            "pixel coordinate outside the 10x16 grid",
        ))?;
        self.pixels[i] = pixel;
        Ok(())
    }

    pub fn pixels(&self) -> &[Pixel; Self::LEN] {
        &self.pixels
    }

    pub fn codes(&self) -> Vec<u8> {
        self.pixels.iter().map(|&p| p as u8).collect()
    }

    fn index(x: usize, y: usize) -> Option<usize> {
        (x < Self::WIDTH && y < Self::HEIGHT).then_some(y * Self::WIDTH + x)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<u8>> for Grid {
    type Error = WallError;

    fn try_from(codes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_codes(&codes)
    }
}

impl From<Grid> for Vec<u8> {
    fn from(grid: Grid) -> Self {
        grid.codes()
    }
}

// ── Message ──────────────────────────────────────────────────────

/// Payload of the `text` function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(rename = "text-top")]
    pub top: String,
    #[serde(rename = "text-bottom")]
    pub bottom: String,
    pub color: TextColor,
    pub inverted: bool,
    pub animation: String,
}

/// An outbound message in typed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum Message {
    Connect { status: String, udid: u32 },
    Disconnect,
    Break,
    Text(TextMessage),
    Draw { data: Grid },
    Tetris { action: TetrisAction },
}

impl Message {
    pub fn function(&self) -> Function {
        match self {
            Message::Connect { .. } => Function::Connect,
            Message::Disconnect => Function::Disconnect,
            Message::Break => Function::Break,
            Message::Text(_) => Function::Text,
            Message::Draw { .. } => Function::Draw,
            Message::Tetris { .. } => Function::Tetris,
        }
    }

    /// Serialize to the wire string stored in the outbound queue.
    pub fn to_wire(&self) -> Result<String, WallError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Encoders ─────────────────────────────────────────────────────

pub fn encode_connect(udid: u32) -> Result<String, WallError> {
    Message::Connect {
        status: STATUS_MENU.to_string(),
        udid,
    }
    .to_wire()
}

pub fn encode_disconnect() -> Result<String, WallError> {
    Message::Disconnect.to_wire()
}

pub fn encode_break() -> Result<String, WallError> {
    Message::Break.to_wire()
}

pub fn encode_text(
    top: &str,
    bottom: &str,
    color: TextColor,
    inverted: bool,
    animation: &str,
) -> Result<String, WallError> {
    Message::Text(TextMessage {
        top: top.to_string(),
        bottom: bottom.to_string(),
        color,
        inverted,
        animation: animation.to_string(),
    })
    .to_wire()
}

pub fn encode_tetris_action(action: TetrisAction) -> Result<String, WallError> {
    Message::Tetris { action }.to_wire()
}

pub fn encode_draw(grid: &Grid) -> Result<String, WallError> {
    Message::Draw { data: grid.clone() }.to_wire()
}

// ── Decoders ─────────────────────────────────────────────────────

/// Strict decode of an outbound-shaped message.
pub fn decode_message(raw: &str) -> Result<Message, WallError> {
    Ok(serde_json::from_str(raw)?)
}

/// The `function` of an inbound message, or `None` if the payload is not
/// a JSON object, lacks the field, or names an unknown function.
pub fn decode_function(raw: &str) -> Option<Function> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let name = value.get(KEY_FUNCTION)?.as_str()?;
    Function::try_from(name).ok()
}

/// `true` iff the payload carries `status == "success"`.
pub fn decode_status(raw: &str) -> bool {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get(KEY_STATUS)?.as_str().map(|s| s == STATUS_SUCCESS))
        .unwrap_or(false)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireGameState {
    score: u32,
    level: u32,
    is_running: bool,
    next_stone: Option<String>,
}

/// Decode the nested `gameState` object of a `tetris` message.
///
/// Missing or mistyped input yields `GameState::default()`. The current
/// stone is never on the wire and is left unset.
pub fn decode_game_state(raw: &str) -> GameState {
    let Some(wire) = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|mut v| v.get_mut(KEY_GAME_STATE).map(Value::take))
        .and_then(|gs| serde_json::from_value::<WireGameState>(gs).ok())
    else {
        return GameState::default();
    };

    GameState::new(
        wire.score,
        wire.level,
        wire.is_running,
        wire.next_stone.as_deref().and_then(Stone::from_letter),
    )
}
