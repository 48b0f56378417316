//! Drawing on the wall: grid text files and throttled pixel editing.
//!
//! A grid file holds 16 rows of 10 cells. Each cell is one character:
//!
//! ```text
//! .  0   off        g  2   green
//! r  1   red        b  3   blue
//! ```
//!
//! Whitespace inside a row is ignored, as are blank lines and lines
//! starting with `#`.

use std::time::Instant;

use wall_core::codec::encode_draw;
use wall_core::{Grid, Pixel, WallError};

use crate::throttle::{DRAW_INTERVAL, Throttle};

/// Parse a pixel colour by name or wire code.
pub fn parse_pixel(name: &str) -> Result<Pixel, WallError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" | "none" | "0" => Ok(Pixel::Off),
        "red" | "1" => Ok(Pixel::Red),
        "green" | "2" => Ok(Pixel::Green),
        "blue" | "3" => Ok(Pixel::Blue),
        other => Err(WallError::UnknownVariant {
            type_name: "Pixel",
            value: other.to_string(),
        }),
    }
}

fn parse_cell(cell: char) -> Result<Pixel, WallError> {
    match cell.to_ascii_lowercase() {
        '.' | '0' => Ok(Pixel::Off),
        'r' | '1' => Ok(Pixel::Red),
        'g' | '2' => Ok(Pixel::Green),
        'b' | '3' => Ok(Pixel::Blue),
        other => Err(WallError::UnknownVariant {
            type_name: "Pixel",
            value: other.to_string(),
        }),
    }
}

/// Parse the grid text format described in the module docs.
pub fn parse_grid(text: &str) -> Result<Grid, WallError> {
    let cells = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.chars().filter(|c| !c.is_whitespace()))
        .map(parse_cell)
        .collect::<Result<Vec<_>, _>>()?;

    let codes: Vec<u8> = cells.into_iter().map(|p| p as u8).collect();
    Grid::from_codes(&codes)
}

/// Parse a comma or whitespace separated list of 160 wire codes.
pub fn parse_codes(text: &str) -> Result<Grid, WallError> {
    let codes = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| WallError::from(format!("'{s}' is not a pixel code")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Grid::from_codes(&codes)
}

/// Render a grid in the text format accepted by [`parse_grid`].
pub fn render_grid(grid: &Grid) -> String {
    let mut out = String::with_capacity(Grid::LEN + Grid::HEIGHT);
    for row in grid.pixels().chunks(Grid::WIDTH) {
        for pixel in row {
            out.push(match pixel {
                Pixel::Off => '.',
                Pixel::Red => 'r',
                Pixel::Green => 'g',
                Pixel::Blue => 'b',
            });
        }
        out.push('\n');
    }
    out
}

// ── Painter ──────────────────────────────────────────────────────

/// Interactive pixel editor.
///
/// Every edit changes the local grid, but the grid is only sent when the
/// draw throttle admits it. Edits swallowed by the throttle leave the
/// painter dirty, and [`finish`](Self::finish) sends the final grid.
#[derive(Debug)]
pub struct Painter {
    grid: Grid,
    throttle: Throttle,
    dirty: bool,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(Grid::new())
    }
}

impl Painter {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            throttle: Throttle::new(DRAW_INTERVAL),
            dirty: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Advance the colour of the pixel at (`x`, `y`).
    pub fn tap_at(&mut self, x: usize, y: usize, now: Instant) -> Result<Option<String>, WallError> {
        let pixel = self.grid.get(x, y).unwrap_or_default().cycled();
        self.set_at(x, y, pixel, now)
    }

    /// Set the pixel at (`x`, `y`) to `pixel`.
    pub fn set_at(
        &mut self,
        x: usize,
        y: usize,
        pixel: Pixel,
        now: Instant,
    ) -> Result<Option<String>, WallError> {
        self.grid.set(x, y, pixel)?;
        self.edited(now)
    }

    /// Switch every pixel off.
    pub fn clear_at(&mut self, now: Instant) -> Result<Option<String>, WallError> {
        self.grid = Grid::new();
        self.edited(now)
    }

    /// The final grid if the wall has not seen the latest edit yet.
    pub fn finish(&mut self) -> Result<Option<String>, WallError> {
        if !self.dirty {
            return Ok(None);
        }
        self.dirty = false;
        encode_draw(&self.grid).map(Some)
    }

    fn edited(&mut self, now: Instant) -> Result<Option<String>, WallError> {
        if self.throttle.admit_at(now) {
            self.dirty = false;
            encode_draw(&self.grid).map(Some)
        } else {
            self.dirty = true;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wall_core::codec::decode_message;
    use wall_core::Message;

    fn sent_grid(raw: &str) -> Grid {
        match decode_message(raw).unwrap() {
            Message::Draw { data } => data,
            other => panic!("expected draw, got {other:?}"),
        }
    }

    #[test]
    fn grid_file_round_trip() {
        let mut grid = Grid::new();
        grid.set(0, 0, Pixel::Red).unwrap();
        grid.set(9, 15, Pixel::Blue).unwrap();
        let text = render_grid(&grid);
        assert_eq!(text.lines().count(), Grid::HEIGHT);
        assert_eq!(parse_grid(&text).unwrap(), grid);
    }

    #[test]
    fn grid_file_ignores_comments_and_spacing() {
        let mut text = String::from("# smiley\n\n");
        for _ in 0..Grid::HEIGHT {
            text.push_str(". . . . . g g g g g\n");
        }
        let grid = parse_grid(&text).unwrap();
        assert_eq!(grid.get(4, 0), Some(Pixel::Off));
        assert_eq!(grid.get(5, 7), Some(Pixel::Green));
    }

    #[test]
    fn grid_file_rejects_bad_shapes() {
        assert!(matches!(
            parse_grid("rrr\n"),
            Err(WallError::InvalidGrid { actual: 3, .. })
        ));
        let bad = "x".repeat(Grid::LEN);
        assert!(parse_grid(&bad).is_err());
    }

    #[test]
    fn code_list_parses() {
        let codes = vec!["2"; Grid::LEN].join(",");
        assert_eq!(parse_codes(&codes).unwrap(), Grid::filled(Pixel::Green));
        assert!(parse_codes("1,2,3").is_err());
        assert!(parse_codes("a").is_err());
    }

    #[test]
    fn pixel_names() {
        assert_eq!(parse_pixel("Red").unwrap(), Pixel::Red);
        assert_eq!(parse_pixel("3").unwrap(), Pixel::Blue);
        assert!(parse_pixel("purple").is_err());
    }

    #[test]
    fn painter_throttles_and_sends_the_final_grid() {
        let start = Instant::now();
        let mut painter = Painter::default();

        let first = painter.tap_at(0, 0, start).unwrap().expect("first edit is sent");
        assert_eq!(sent_grid(&first).get(0, 0), Some(Pixel::Red));

        let quick = painter
            .tap_at(0, 0, start + Duration::from_millis(50))
            .unwrap();
        assert!(quick.is_none());
        assert_eq!(painter.grid().get(0, 0), Some(Pixel::Green));

        let last = painter.finish().unwrap().expect("pending edit is flushed");
        assert_eq!(sent_grid(&last).get(0, 0), Some(Pixel::Green));
        assert!(painter.finish().unwrap().is_none());
    }

    #[test]
    fn painter_sends_again_after_the_interval() {
        let start = Instant::now();
        let mut painter = Painter::default();
        assert!(painter.set_at(1, 1, Pixel::Blue, start).unwrap().is_some());
        let later = start + DRAW_INTERVAL + Duration::from_millis(1);
        assert!(painter.clear_at(later).unwrap().is_some());
        assert!(painter.finish().unwrap().is_none());
    }

    #[test]
    fn painter_rejects_out_of_range_pixels() {
        let mut painter = Painter::default();
        assert!(painter.tap_at(10, 0, Instant::now()).is_err());
    }
}
