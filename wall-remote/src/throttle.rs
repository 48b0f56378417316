//! Rate limiting for interactive input.

use std::time::{Duration, Instant};

/// Minimum gap between two pixel edits sent to the wall.
pub const DRAW_INTERVAL: Duration = Duration::from_millis(250);
/// Minimum gap between two tetris moves sent to the wall.
pub const MOVE_INTERVAL: Duration = Duration::from_millis(200);

/// Admits at most one event per `interval`.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// `true` (and the window restarts) if more than `interval` has
    /// passed since the last admitted event.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        let open = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) > self.interval);
        if open {
            self.last = Some(now);
        }
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_is_admitted() {
        let mut throttle = Throttle::new(DRAW_INTERVAL);
        assert!(throttle.admit_at(Instant::now()));
    }

    #[test]
    fn events_inside_the_window_are_refused() {
        let start = Instant::now();
        let mut throttle = Throttle::new(MOVE_INTERVAL);
        assert!(throttle.admit_at(start));
        assert!(!throttle.admit_at(start + Duration::from_millis(100)));
        assert!(!throttle.admit_at(start + MOVE_INTERVAL));
        assert!(throttle.admit_at(start + Duration::from_millis(201)));
    }

    #[test]
    fn refused_events_do_not_extend_the_window() {
        let start = Instant::now();
        let mut throttle = Throttle::new(DRAW_INTERVAL);
        assert!(throttle.admit_at(start));
        assert!(!throttle.admit_at(start + Duration::from_millis(200)));
        assert!(throttle.admit_at(start + Duration::from_millis(260)));
    }
}
