//! Tetris game state reported by the wall.
//!
//! The wall only announces the *upcoming* stone. The stone that is
//! currently falling is the one announced by the previous update, so
//! consecutive states are folded through a [`GameTracker`].

use std::fmt;

use crate::error::WallError;

// ── Stone ────────────────────────────────────────────────────────

/// One of the seven tetrominoes.
///
/// The discriminants are the internal codes used by the remote; the
/// "unset" code (0) is modelled as `Option::<Stone>::None`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stone {
    I = 10,
    J = 20,
    L = 30,
    O = 40,
    S = 50,
    T = 60,
    Z = 70,
}

impl Stone {
    pub const ALL: [Stone; 7] = [
        Stone::I,
        Stone::J,
        Stone::L,
        Stone::O,
        Stone::S,
        Stone::T,
        Stone::Z,
    ];

    /// Map the single-letter wire code to a stone.
    ///
    /// Anything else yields `None` (unset), never an error.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "I" => Some(Stone::I),
            "J" => Some(Stone::J),
            "L" => Some(Stone::L),
            "O" => Some(Stone::O),
            "S" => Some(Stone::S),
            "T" => Some(Stone::T),
            "Z" => Some(Stone::Z),
            _ => None,
        }
    }

    /// The single-letter wire code.
    pub fn letter(&self) -> &'static str {
        match self {
            Stone::I => "I",
            Stone::J => "J",
            Stone::L => "L",
            Stone::O => "O",
            Stone::S => "S",
            Stone::T => "T",
            Stone::Z => "Z",
        }
    }

    /// The internal numeric code.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Stone {
    type Error = WallError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stone::ALL
            .into_iter()
            .find(|s| s.code() == value)
            .ok_or_else(|| WallError::UnknownVariant {
                type_name: "Stone",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

// ── GameState ────────────────────────────────────────────────────

/// A snapshot of the game as last reported by the wall.
///
/// `GameState::default()` is the sentinel produced when an inbound
/// `tetris` message carries no usable `gameState` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameState {
    pub score: u32,
    pub level: u32,
    pub running: bool,
    pub next_stone: Option<Stone>,
    pub curr_stone: Option<Stone>,
}

impl GameState {
    pub fn new(score: u32, level: u32, running: bool, next_stone: Option<Stone>) -> Self {
        Self {
            score,
            level,
            running,
            next_stone,
            curr_stone: None,
        }
    }

    /// `true` for the sentinel state.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Both stones are known, i.e. the game can be started.
    pub fn stones_known(&self) -> bool {
        self.next_stone.is_some() && self.curr_stone.is_some()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stone = |s: Option<Stone>| s.map_or("-", |s| s.letter());
        write!(
            f,
            "score={} level={} running={} current={} next={}",
            self.score,
            self.level,
            self.running,
            stone(self.curr_stone),
            stone(self.next_stone)
        )
    }
}

// ── GameTracker ──────────────────────────────────────────────────

/// Folds consecutive [`GameState`] updates.
///
/// Each new state's `curr_stone` is the previous state's `next_stone`.
/// Nothing is carried while there is no previous state or its next
/// stone is still unset.
#[derive(Debug, Default)]
pub struct GameTracker {
    last: Option<GameState>,
}

impl GameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `update` into the tracked state and return the result.
    pub fn apply(&mut self, mut update: GameState) -> GameState {
        if let Some(next) = self.last.and_then(|prev| prev.next_stone) {
            update.curr_stone = Some(next);
        }
        self.last = Some(update);
        update
    }

    /// The most recent folded state.
    pub fn last(&self) -> Option<&GameState> {
        self.last.as_ref()
    }

    /// Forget all history, e.g. at the start of a new session.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
