//! Session-level engine configuration
//!
//! Supplies defaults for optional entity fields and the tuning knobs of one
//! evaluation session. Deserializes from TOML or JSON; every field has a
//! default so partial tables are accepted.

use crate::easing::Easing;
use crate::phase::SeekPolicy;
use marquee_core::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rest position of line 0
    pub origin: Point,
    /// Default line capacity for top-level entities
    pub max_lines: u32,
    /// Vertical distance between consecutive lines
    pub line_spacing: f32,
    /// Default number of reveal slices per entity
    pub slice_count: u32,
    /// Default gap under which two windows still conflict
    pub proximity_threshold: f64,
    /// Backward jumps larger than this are treated as seeks.
    ///
    /// A tuning value for the host, not part of the correctness contract:
    /// every tick is recomputed from the clock either way.
    pub seek_threshold: f64,
    /// Forward jumps larger than this are treated as seeks
    pub max_tick_delta: f64,
    /// How long a line stays reserved after its window ends
    pub line_expiry: f64,
    /// Default easing for motion and slice shaping
    pub easing: Easing,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: Point::ZERO,
            max_lines: 4,
            line_spacing: 48.0,
            slice_count: 1,
            proximity_threshold: 0.0,
            seek_threshold: 100.0,
            max_tick_delta: 250.0,
            line_expiry: 1000.0,
            easing: Easing::EaseOutCubic,
        }
    }
}

impl EngineConfig {
    /// Seek policy for an entity with an optional threshold override
    pub fn seek_policy(&self, seek_threshold: Option<f64>) -> SeekPolicy {
        SeekPolicy::new(
            seek_threshold.unwrap_or(self.seek_threshold),
            self.max_tick_delta,
        )
    }

    pub fn with_max_lines(mut self, max_lines: u32) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_slice_count(mut self, slice_count: u32) -> Self {
        self.slice_count = slice_count;
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f32) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    pub fn with_seek_threshold(mut self, seek_threshold: f64) -> Self {
        self.seek_threshold = seek_threshold;
        self
    }
}
