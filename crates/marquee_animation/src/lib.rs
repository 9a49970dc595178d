//! Marquee Timeline Animation Engine
//!
//! Computes the visual state of a hierarchy of timed entities at any point of
//! a presentation clock that may jump forward, backward, or repeat.
//!
//! # Features
//!
//! - **Line allocation**: overlapping top-level entities get separate lines,
//!   with oldest-wins reuse once capacity runs out
//! - **Velocity profiles**: entrance/exit displacement integrated from a
//!   speed curve, stateless in the elapsed time
//! - **Reveal phases**: staggered per-slice reveal and conceal derived from
//!   the clock, with seek detection and full rebuild
//! - **Scrub safety**: evaluating the same clock value always yields the same
//!   frame, whatever was evaluated before

pub mod config;
pub mod coordinator;
pub mod draw;
pub mod easing;
pub mod lines;
pub mod phase;
pub mod scene;
pub mod velocity;

pub use config::EngineConfig;
pub use coordinator::{EvaluationStats, TimelineCoordinator};
pub use draw::{DrawInstruction, Frame, SkippedEntity};
pub use easing::Easing;
pub use lines::{LineAllocator, LineAssignment};
pub use phase::{
    Phase, PhaseBounds, PhaseMachine, PhaseState, SeekPolicy, SliceProgression, SliceShape,
    TickKind,
};
pub use scene::{EntityConfig, EntitySpec, NodeKey, Scene, SceneNode};
pub use velocity::{distance, VelocityProfile};
