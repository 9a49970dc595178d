//! Marquee Core
//!
//! Foundational types shared by the Marquee timeline engine and its hosts:
//!
//! - **Geometry**: points and directions of travel
//! - **Time**: presentation-clock windows in milliseconds
//! - **Entities**: identifiers and hierarchy levels
//! - **Errors**: configuration errors raised while validating entity records
//!
//! # Example
//!
//! ```rust
//! use marquee_core::{Direction, Point, TimeWindow};
//!
//! let window = TimeWindow::new(1000.0, 3000.0).padded(500.0, 250.0);
//! assert_eq!(window.start, 500.0);
//! assert_eq!(window.end, 3250.0);
//!
//! let p = Point::ZERO.offset(Direction::Right, 10.0);
//! assert_eq!(p, Point::new(10.0, 0.0));
//! ```

pub mod entity;
pub mod error;
pub mod geometry;
pub mod time;

pub use entity::{EntityId, HierarchyLevel};
pub use error::ConfigError;
pub use geometry::{Direction, Point};
pub use time::{ClockMs, TimeWindow};
