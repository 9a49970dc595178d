//! Geometry primitives

use serde::{Deserialize, Serialize};

/// 2D point in output space (y grows downwards)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Move the point `amount` units along `direction`
    pub fn offset(self, direction: Direction, amount: f32) -> Self {
        let (dx, dy) = direction.unit();
        Self {
            x: self.x + dx * amount,
            y: self.y + dy * amount,
        }
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Direction of travel for entrance and exit motion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit vector for this direction
    pub const fn unit(self) -> (f32, f32) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_unit_vector() {
        let p = Point::new(5.0, 5.0);
        assert_eq!(p.offset(Direction::Left, 2.0), Point::new(3.0, 5.0));
        assert_eq!(p.offset(Direction::Up, 2.0), Point::new(5.0, 3.0));
        assert_eq!(p.offset(Direction::Down, -1.0), Point::new(5.0, 4.0));
    }

    #[test]
    fn opposite_directions_cancel() {
        for dir in [
            Direction::Left,
            Direction::Right,
            Direction::Up,
            Direction::Down,
        ] {
            let p = Point::ZERO.offset(dir, 7.0).offset(dir.opposite(), 7.0);
            assert!(p.distance_to(Point::ZERO) < 1e-6);
        }
    }
}
