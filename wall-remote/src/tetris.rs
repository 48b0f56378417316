//! Line-oriented tetris controller.
//!
//! ```text
//! a | left      move left           start   start a game
//! d | right     move right          stop    quit the game
//! q | ccw       rotate anticlockwise
//! e | cw        rotate clockwise
//! ```

use std::time::Instant;

use wall_core::{GameState, TetrisAction};

use crate::throttle::{MOVE_INTERVAL, Throttle};

/// A command typed by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Move(TetrisAction),
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        let command = match input.trim().to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "a" | "left" => Command::Move(TetrisAction::Left),
            "d" | "right" => Command::Move(TetrisAction::Right),
            "q" | "ccw" => Command::Move(TetrisAction::CounterClockwise),
            "e" | "cw" => Command::Move(TetrisAction::Clockwise),
            _ => return None,
        };
        Some(command)
    }
}

/// Turns player commands into wire actions and tracks the last game
/// state reported by the wall.
#[derive(Debug)]
pub struct Controller {
    state: GameState,
    throttle: Throttle,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: GameState::default(),
            throttle: Throttle::new(MOVE_INTERVAL),
        }
    }

    /// Actions to send when the controller opens.
    pub fn open(&self) -> [TetrisAction; 1] {
        [TetrisAction::Init]
    }

    /// Actions to send when the controller closes.
    pub fn close(&self) -> [TetrisAction; 1] {
        [TetrisAction::Quit]
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Record a folded state from the wall.
    pub fn update(&mut self, state: GameState) {
        self.state = state;
    }

    /// Actions for `command`. Moves faster than the move interval are
    /// dropped.
    pub fn actions_at(&mut self, command: Command, now: Instant) -> Vec<TetrisAction> {
        match command {
            // a finished game leaves both stones known; re-init before restarting
            Command::Start if self.state.stones_known() => {
                vec![TetrisAction::Init, TetrisAction::Start]
            }
            Command::Start => vec![TetrisAction::Start],
            Command::Stop => vec![TetrisAction::Quit],
            Command::Move(action) if self.throttle.admit_at(now) => vec![action],
            Command::Move(_) => Vec::new(),
        }
    }
}
