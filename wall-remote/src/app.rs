//! Subcommand bodies, kept apart from argument parsing so they can run
//! against any line source.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use wall_core::codec::{encode_draw, encode_tetris_action};
use wall_core::{Event, Grid, Pixel, WallConfig, WallError};

use crate::paint::{Painter, parse_pixel, render_grid};
use crate::remote::Remote;
use crate::tetris::{Command, Controller};

/// Upper bound on waiting for a session to wind down.
pub const DISCONNECT_WAIT: Duration = Duration::from_secs(5);

/// What ended an interactive loop.
#[derive(Debug)]
enum Outcome {
    /// Input ran out or the user asked to leave.
    Done,
    /// The wall closed the session first.
    Ended,
}

/// Connect, send `message`, and disconnect again.
pub async fn send_once(config: &WallConfig, message: String) -> Result<(), WallError> {
    let mut remote = Remote::new(config)?;
    remote.connect().await?;
    remote.send(message);
    remote.disconnect(DISCONNECT_WAIT).await
}

/// Handle an engine event during an interactive loop.
fn on_event(event: Option<Event>) -> Result<Option<Outcome>, WallError> {
    match event {
        Some(Event::Disconnected) | None => {
            info!("wall ended the session");
            Ok(Some(Outcome::Ended))
        }
        Some(Event::Failure(reason)) => Err(reason.into()),
        Some(_) => Ok(None),
    }
}

// ── Tetris ───────────────────────────────────────────────────────

/// Play tetris with commands read from `input`, one per line.
pub async fn run_tetris<R>(remote: &mut Remote, input: R) -> Result<(), WallError>
where
    R: AsyncBufRead + Unpin,
{
    let mut controller = Controller::new();
    for action in controller.open() {
        remote.send(encode_tetris_action(action)?);
    }

    let mut lines = input.lines();
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break Outcome::Done;
                };
                if matches!(line.trim(), "exit" | "quit") {
                    break Outcome::Done;
                }
                let Some(command) = Command::parse(&line) else {
                    warn!(input = %line.trim(), "unknown tetris command");
                    continue;
                };
                for action in controller.actions_at(command, Instant::now()) {
                    remote.send(encode_tetris_action(action)?);
                }
            }
            event = remote.next_event() => {
                if let Some(Event::GameUpdate(state)) = event {
                    controller.update(state);
                    println!("{state}");
                    continue;
                }
                if let Some(outcome) = on_event(event)? {
                    break outcome;
                }
            }
            _ = tokio::signal::ctrl_c() => break Outcome::Done,
        }
    };

    if let Outcome::Done = outcome {
        for action in controller.close() {
            remote.send(encode_tetris_action(action)?);
        }
    }
    Ok(())
}

// ── Paint ────────────────────────────────────────────────────────

/// A line of paint input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaintCommand {
    Tap(usize, usize),
    Set(usize, usize, Pixel),
    Clear,
    Show,
    Done,
}

fn parse_paint(line: &str) -> Result<PaintCommand, WallError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let coord = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| WallError::from(format!("'{s}' is not a coordinate")))
    };
    match words.as_slice() {
        ["clear"] => Ok(PaintCommand::Clear),
        ["show"] => Ok(PaintCommand::Show),
        ["done"] | ["exit"] => Ok(PaintCommand::Done),
        [x, y] => Ok(PaintCommand::Tap(coord(x)?, coord(y)?)),
        [x, y, color] => Ok(PaintCommand::Set(coord(x)?, coord(y)?, parse_pixel(color)?)),
        _ => Err(format!("cannot parse '{}'", line.trim()).into()),
    }
}

/// Edit the wall pixel by pixel with commands read from `input`.
///
/// `x y` cycles a pixel, `x y <colour>` sets it, `clear` switches all
/// pixels off, `show` prints the grid and `done` ends the session.
pub async fn run_paint<R>(remote: &mut Remote, input: R, grid: Grid) -> Result<(), WallError>
where
    R: AsyncBufRead + Unpin,
{
    let mut painter = Painter::new(grid);
    remote.send(encode_draw(painter.grid())?);

    let mut lines = input.lines();
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break Outcome::Done;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let now = Instant::now();
                let edit = match parse_paint(&line) {
                    Ok(PaintCommand::Tap(x, y)) => painter.tap_at(x, y, now),
                    Ok(PaintCommand::Set(x, y, pixel)) => painter.set_at(x, y, pixel, now),
                    Ok(PaintCommand::Clear) => painter.clear_at(now),
                    Ok(PaintCommand::Show) => {
                        print!("{}", render_grid(painter.grid()));
                        continue;
                    }
                    Ok(PaintCommand::Done) => break Outcome::Done,
                    Err(e) => Err(e),
                };
                match edit {
                    Ok(Some(message)) => remote.send(message),
                    Ok(None) => {}
                    Err(e) => warn!("{e}"),
                }
            }
            event = remote.next_event() => {
                if let Some(outcome) = on_event(event)? {
                    break outcome;
                }
            }
            _ = tokio::signal::ctrl_c() => break Outcome::Done,
        }
    };

    if let Outcome::Done = outcome {
        if let Some(message) = painter.finish()? {
            remote.send(message);
        }
    }
    Ok(())
}
