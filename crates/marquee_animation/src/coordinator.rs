//! Timeline coordinator
//!
//! Walks the entity hierarchy once per clock value. Top-level entities are
//! resolved first (line, motion, phase); their resolved window, position,
//! opacity and line are then handed down to groups and elements, whose own
//! windows are always derived from the parent's.
//!
//! A coordinator owns the line table and the phase caches of exactly one
//! playback or editing session. Create one per session and drop it (or call
//! [`TimelineCoordinator::reset`]) when the session ends.
//!
//! # Example
//!
//! ```rust
//! use marquee_animation::{EngineConfig, EntityConfig, Phase, Scene, TimelineCoordinator};
//!
//! let config = EngineConfig::default();
//! let scene = Scene::build(
//!     [EntityConfig::top("verse", 1000.0, 2000.0)
//!         .with_head(500.0)
//!         .with_tail(500.0)
//!         .with_speeds(4.0, 0.1)],
//!     &config,
//! );
//!
//! let mut timeline = TimelineCoordinator::new(config);
//! let frame = timeline.evaluate(&scene, 1500.0);
//! let verse = frame.get("verse").unwrap();
//! assert_eq!(verse.phase, Phase::Active);
//! assert_eq!(verse.line_index, Some(0));
//! ```

use crate::config::EngineConfig;
use crate::draw::{DrawInstruction, Frame, SkippedEntity};
use crate::easing::Easing;
use crate::lines::LineAllocator;
use crate::phase::{Phase, PhaseBounds, PhaseMachine, SliceProgression, SliceShape};
use crate::scene::{ChildSpec, EntitySpec, MotionSpec, NodeKey, Scene, SceneNode, TopSpec};
use crate::velocity::{effective_duration, VelocityProfile};
use marquee_core::{ClockMs, ConfigError, EntityId, Point};

/// Counters describing the most recent evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EvaluationStats {
    pub clock: ClockMs,
    /// Draw instructions produced
    pub evaluated: usize,
    /// Entities skipped together with their subtree
    pub skipped: usize,
    /// Entities whose phase cache was rebuilt after a seek
    pub seeks: usize,
    /// Whether the line table was rebuilt from scratch
    pub lines_rebuilt: bool,
    /// Evaluations since the session started
    pub evaluations: u64,
}

/// Progress of line allocation through the clock
#[derive(Clone, Copy, Debug, Default)]
struct AllocationCursor {
    /// Entities whose effective window starts at or before this are assigned
    through: Option<ClockMs>,
    /// Layout the table was built for
    fingerprint: Option<u64>,
}

/// Parameters a resolved entity passes to its children
#[derive(Clone, Copy, Debug)]
struct Resolved {
    bounds: PhaseBounds,
    position: Point,
    alpha: f64,
    visible: bool,
    line: Option<u32>,
    rotation: f32,
    easing: Easing,
    seek_threshold: Option<f64>,
}

/// Own contribution of an entity's motion
#[derive(Clone, Copy, Debug, PartialEq)]
struct MotionState {
    /// Signed distance along the direction of travel
    displacement: f64,
    alpha: f64,
}

/// Evaluates a [`Scene`] at arbitrary clock values for one session
#[derive(Debug)]
pub struct TimelineCoordinator {
    config: EngineConfig,
    lines: LineAllocator,
    phases: PhaseMachine,
    allocation: AllocationCursor,
    last_clock: Option<ClockMs>,
    stats: EvaluationStats,
}

impl TimelineCoordinator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            lines: LineAllocator::new(config.line_expiry),
            phases: PhaseMachine::new(),
            allocation: AllocationCursor::default(),
            last_clock: None,
            stats: EvaluationStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lines(&self) -> &LineAllocator {
        &self.lines
    }

    pub fn stats(&self) -> &EvaluationStats {
        &self.stats
    }

    pub fn last_clock(&self) -> Option<ClockMs> {
        self.last_clock
    }

    /// Cached phase of an entity after the last evaluation that touched it
    pub fn phase_of(&self, entity: &EntityId) -> Option<Phase> {
        self.phases.get(entity).map(|state| state.phase())
    }

    /// Discard all session caches
    pub fn reset(&mut self) {
        self.lines.reset();
        self.phases.reset();
        self.allocation = AllocationCursor::default();
        self.last_clock = None;
        self.stats = EvaluationStats::default();
    }

    /// Compute the visual state of every entity in `scene` at `now`
    ///
    /// The result depends only on `scene` and `now`, never on which clock
    /// values were evaluated before.
    pub fn evaluate(&mut self, scene: &Scene, now: ClockMs) -> Frame {
        let mut frame = Frame::new(now);
        if !now.is_finite() {
            tracing::warn!(now, "non-finite clock value, nothing evaluated");
            return frame;
        }

        if let Some(last) = self.last_clock {
            if now < last - self.config.seek_threshold {
                tracing::debug!(from = last, to = now, "backward seek");
            }
        }

        let evaluations = self.stats.evaluations + 1;
        let seeks_before = self.phases.seek_count();

        self.phases.retain(|id| scene.contains(id));
        let lines_rebuilt = self.sync_lines(scene, now);

        for &root in scene.roots() {
            self.evaluate_node(scene, root, None, now, &mut frame);
        }

        self.stats = EvaluationStats {
            clock: now,
            evaluated: frame.instructions.len(),
            skipped: frame.skipped.len(),
            seeks: (self.phases.seek_count() - seeks_before) as usize,
            lines_rebuilt,
            evaluations,
        };
        self.last_clock = Some(now);
        frame
    }

    /// Bring the line table up to `now`
    ///
    /// Top-level entities are assigned in (effective start, id) order with
    /// their own start as the allocation time, so the table at `now` is the
    /// same whether it was reached by playback, by a jump, or rebuilt after
    /// rewinding. Returns true when the table was rebuilt.
    fn sync_lines(&mut self, scene: &Scene, now: ClockMs) -> bool {
        let fingerprint = scene.layout_fingerprint();
        let rewound = self.allocation.through.is_some_and(|through| now < through);
        let relayout = self.allocation.fingerprint != Some(fingerprint);

        let rebuilt = rewound || relayout;
        if rebuilt {
            self.lines.reset();
            self.allocation = AllocationCursor {
                through: None,
                fingerprint: Some(fingerprint),
            };
        }

        let through = self.allocation.through;
        for (node, top) in scene.tops_by_entry() {
            let window = top.effective_window();
            if window.start > now {
                break;
            }
            if through.is_some_and(|through| window.start <= through) {
                continue;
            }
            self.lines
                .assign_line(&node.id, window, window.start, top.max_lines, top.proximity);
        }
        self.lines.expire(now);
        self.allocation.through = Some(now);
        rebuilt
    }

    fn evaluate_node(
        &mut self,
        scene: &Scene,
        key: NodeKey,
        parent: Option<&Resolved>,
        now: ClockMs,
        frame: &mut Frame,
    ) {
        let Some(node) = scene.node(key) else {
            return;
        };

        let resolved = match self.resolve(node, parent, now) {
            Ok((resolved, instruction)) => {
                frame.instructions.push(instruction);
                resolved
            }
            Err(reason) => {
                tracing::debug!(entity = %node.id, error = %reason, "entity skipped this tick");
                frame.skipped.push(SkippedEntity {
                    entity: node.id.clone(),
                    reason,
                });
                return;
            }
        };

        for &child in &node.children {
            self.evaluate_node(scene, child, Some(&resolved), now, frame);
        }
    }

    fn resolve(
        &mut self,
        node: &SceneNode,
        parent: Option<&Resolved>,
        now: ClockMs,
    ) -> Result<(Resolved, DrawInstruction), ConfigError> {
        let spec = node.spec.as_ref().map_err(Clone::clone)?;
        match (spec, parent) {
            (EntitySpec::Top(top), _) => Ok(self.resolve_top(node, top, now)),
            (EntitySpec::Group(child) | EntitySpec::Leaf(child), Some(parent)) => {
                self.resolve_child(node, child, parent, now)
            }
            (EntitySpec::Group(_) | EntitySpec::Leaf(_), None) => Err(ConfigError::MissingParent {
                entity: node.id.clone(),
                level: node.level,
            }),
        }
    }

    fn resolve_top(
        &mut self,
        node: &SceneNode,
        top: &TopSpec,
        now: ClockMs,
    ) -> (Resolved, DrawInstruction) {
        let bounds = PhaseBounds::new(top.window, top.head, top.tail);
        let shape = SliceShape::new(top.slice_count, top.motion.easing);
        let policy = self.config.seek_policy(top.seek_threshold);

        let sample = self.phases.evaluate(&node.id, now, bounds, shape, policy);
        let phase = sample.phase;
        let slices: SliceProgression = sample.slices.iter().copied().collect();

        let line = self.lines.line_of(&node.id);
        let origin = self.config.origin;
        let rest = Point::new(
            origin.x,
            origin.y + line.unwrap_or(0) as f32 * top.line_spacing,
        );
        let motion = motion_state(phase, &bounds, &top.motion, now);
        let position = rest.offset(top.motion.direction, motion.displacement as f32);

        let resolved = Resolved {
            bounds,
            position,
            alpha: motion.alpha,
            visible: phase.is_visible(),
            line,
            rotation: top.rotation,
            easing: top.motion.easing,
            seek_threshold: top.seek_threshold,
        };
        (resolved, instruction(node, phase, &resolved, slices))
    }

    fn resolve_child(
        &mut self,
        node: &SceneNode,
        child: &ChildSpec,
        parent: &Resolved,
        now: ClockMs,
    ) -> Result<(Resolved, DrawInstruction), ConfigError> {
        let window = child
            .offset
            .shifted(parent.bounds.window.start)
            .clamp_to(&parent.bounds.window)
            .ok_or_else(|| ConfigError::OutsideParent {
                entity: node.id.clone(),
            })?;
        let bounds = PhaseBounds::new(
            window,
            child.head.unwrap_or(parent.bounds.head),
            child.tail.unwrap_or(parent.bounds.tail),
        );
        let easing = child.easing.unwrap_or(parent.easing);
        let seek_threshold = child.seek_threshold.or(parent.seek_threshold);
        let shape = SliceShape::new(child.slice_count, easing);
        let policy = self.config.seek_policy(seek_threshold);

        let sample = self.phases.evaluate(&node.id, now, bounds, shape, policy);
        let phase = sample.phase;
        let slices: SliceProgression = sample.slices.iter().copied().collect();

        let (position, own) = match &child.motion {
            Some(motion) => {
                let state = motion_state(phase, &bounds, motion, now);
                (
                    parent.position.offset(motion.direction, state.displacement as f32),
                    state,
                )
            }
            None => (parent.position, fade_state(phase, &bounds, easing, now)),
        };

        let resolved = Resolved {
            bounds,
            position,
            alpha: parent.alpha * own.alpha,
            visible: parent.visible && phase.is_visible(),
            line: parent.line,
            rotation: parent.rotation + child.rotation,
            easing,
            seek_threshold,
        };
        Ok((resolved, instruction(node, phase, &resolved, slices)))
    }
}

fn instruction(
    node: &SceneNode,
    phase: Phase,
    resolved: &Resolved,
    slices: SliceProgression,
) -> DrawInstruction {
    DrawInstruction {
        entity: node.id.clone(),
        level: node.level,
        phase,
        position: resolved.position,
        alpha: resolved.alpha.clamp(0.0, 1.0) as f32,
        visible: resolved.visible,
        line_index: resolved.line,
        slice_progression: slices,
        rotation: resolved.rotation,
    }
}

/// Displacement and opacity from the entrance/exit velocity profiles
///
/// Entering: `-(total - distance(elapsed))`, closing in on the rest position.
/// Exiting: `+distance(elapsed)` with the mirrored profile over the tail.
fn motion_state(
    phase: Phase,
    bounds: &PhaseBounds,
    motion: &MotionSpec,
    now: ClockMs,
) -> MotionState {
    let entry = VelocityProfile::new(
        motion.initial_speed,
        motion.final_speed,
        bounds.head,
        motion.easing,
    );
    let exit = entry.mirrored(bounds.tail);
    match phase {
        Phase::PreEntry => MotionState {
            displacement: -entry.total_distance(),
            alpha: 0.0,
        },
        Phase::Entering => {
            let elapsed = now - bounds.entry_start();
            MotionState {
                displacement: entry.distance(elapsed) - entry.total_distance(),
                alpha: entry.progress(elapsed),
            }
        }
        Phase::Active => MotionState {
            displacement: 0.0,
            alpha: 1.0,
        },
        Phase::Exiting => {
            let elapsed = now - bounds.window.end;
            MotionState {
                displacement: exit.distance(elapsed),
                alpha: 1.0 - exit.progress(elapsed),
            }
        }
        Phase::PostExit => MotionState {
            displacement: exit.total_distance(),
            alpha: 0.0,
        },
    }
}

/// Opacity for entities that move with their parent
fn fade_state(phase: Phase, bounds: &PhaseBounds, easing: Easing, now: ClockMs) -> MotionState {
    let alpha = match phase {
        Phase::PreEntry | Phase::PostExit => 0.0,
        Phase::Active => 1.0,
        Phase::Entering => {
            easing.apply((now - bounds.entry_start()) / effective_duration(bounds.head))
        }
        Phase::Exiting => {
            1.0 - easing.apply((now - bounds.window.end) / effective_duration(bounds.tail))
        }
    };
    MotionState {
        displacement: 0.0,
        alpha,
    }
}
