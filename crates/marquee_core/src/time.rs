//! Presentation-clock time windows

use serde::{Deserialize, Serialize};

/// Presentation clock value in milliseconds
pub type ClockMs = f64;

/// A closed interval `[start, end]` on the presentation clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: ClockMs,
    pub end: ClockMs,
}

impl TimeWindow {
    pub const fn new(start: ClockMs, end: ClockMs) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Extend the window by `head` before its start and `tail` after its end
    pub fn padded(&self, head: f64, tail: f64) -> TimeWindow {
        TimeWindow {
            start: self.start - head,
            end: self.end + tail,
        }
    }

    /// Shift both ends by `offset`
    pub fn shifted(&self, offset: f64) -> TimeWindow {
        TimeWindow {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    pub fn contains(&self, t: ClockMs) -> bool {
        t >= self.start && t <= self.end
    }

    /// Gap between two windows, 0 when they intersect
    pub fn gap_to(&self, other: &TimeWindow) -> f64 {
        (other.start - self.end).max(self.start - other.end).max(0.0)
    }

    /// True when the windows intersect or sit within `proximity` of each other
    pub fn conflicts_with(&self, other: &TimeWindow, proximity: f64) -> bool {
        self.gap_to(other) <= proximity.max(0.0)
    }

    /// Intersection with `outer`, or `None` when the result would be empty
    pub fn clamp_to(&self, outer: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(outer.start);
        let end = self.end.min(outer.end);
        (start <= end).then_some(TimeWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_is_zero_for_intersecting_windows() {
        let a = TimeWindow::new(0.0, 100.0);
        let b = TimeWindow::new(50.0, 150.0);
        assert_eq!(a.gap_to(&b), 0.0);
        assert_eq!(b.gap_to(&a), 0.0);
    }

    #[test]
    fn proximity_turns_near_windows_into_conflicts() {
        let a = TimeWindow::new(0.0, 100.0);
        let b = TimeWindow::new(130.0, 200.0);
        assert_eq!(a.gap_to(&b), 30.0);
        assert!(!a.conflicts_with(&b, 10.0));
        assert!(a.conflicts_with(&b, 30.0));
        assert!(b.conflicts_with(&a, 50.0));
    }

    #[test]
    fn clamp_rejects_disjoint_windows() {
        let outer = TimeWindow::new(1000.0, 2000.0);
        assert_eq!(
            TimeWindow::new(900.0, 1500.0).clamp_to(&outer),
            Some(TimeWindow::new(1000.0, 1500.0))
        );
        assert_eq!(TimeWindow::new(2100.0, 2500.0).clamp_to(&outer), None);
    }
}
