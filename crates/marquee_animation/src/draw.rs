//! Draw instructions handed to the rendering backend

use crate::phase::{Phase, SliceProgression};
use marquee_core::{ClockMs, ConfigError, EntityId, HierarchyLevel, Point};
use serde::{Serialize, Serializer};

/// Visual state of one entity at one clock value
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawInstruction {
    pub entity: EntityId,
    pub level: HierarchyLevel,
    pub phase: Phase,
    pub position: Point,
    /// Opacity in `[0, 1]`
    pub alpha: f32,
    pub visible: bool,
    /// Line held by the owning top-level entity, if any
    pub line_index: Option<u32>,
    pub slice_progression: SliceProgression,
    /// Degrees
    pub rotation: f32,
}

/// An entity left out of a frame together with its subtree
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedEntity {
    pub entity: EntityId,
    #[serde(serialize_with = "serialize_display")]
    pub reason: ConfigError,
}

/// Everything produced by one evaluation
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Frame {
    pub clock: ClockMs,
    /// Parents precede their children
    pub instructions: Vec<DrawInstruction>,
    pub skipped: Vec<SkippedEntity>,
}

impl Frame {
    pub fn new(clock: ClockMs) -> Self {
        Self {
            clock,
            ..Default::default()
        }
    }

    pub fn get(&self, entity: &str) -> Option<&DrawInstruction> {
        self.instructions.iter().find(|i| i.entity.as_str() == entity)
    }

    pub fn visible(&self) -> impl Iterator<Item = &DrawInstruction> {
        self.instructions.iter().filter(|i| i.visible)
    }

    pub fn is_skipped(&self, entity: &str) -> bool {
        self.skipped.iter().any(|s| s.entity.as_str() == entity)
    }
}

fn serialize_display<S: Serializer>(value: &ConfigError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
