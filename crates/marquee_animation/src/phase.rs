//! Reveal/conceal phase state machine
//!
//! An entity moves through five phases:
//!
//! ```text
//! pre-entry → entering → active → exiting → post-exit
//!           ^          ^        ^         ^
//!     start - head   start     end    end + tail
//! ```
//!
//! The phase is always derived from the clock and those four boundaries, never
//! from elapsed frames. The visual extent of an entity is split into slices,
//! each revealed (and later concealed) over its own staggered window:
//!
//! ```text
//! ratio = easing(clamp((now - slice_start) / slice_duration, 0, 1))
//! ```
//!
//! The slice progression is cached per entity so ordinary forward ticks can
//! skip slices that are already saturated. The cache never holds anything that
//! `(bounds, now)` does not determine: after a seek it is rebuilt from scratch
//! and the result matches a fresh computation bit for bit.

use crate::easing::Easing;
use crate::velocity::effective_duration;
use marquee_core::{ClockMs, EntityId, TimeWindow};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Per-slice reveal ratios, ordered along the entity's extent
pub type SliceProgression = SmallVec<[f32; 8]>;

/// Position of an entity within its own presentation window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    PreEntry,
    Entering,
    Active,
    Exiting,
    PostExit,
}

impl Phase {
    /// Phase of `bounds` at clock `now`
    pub fn at(now: ClockMs, bounds: &PhaseBounds) -> Phase {
        if now < bounds.entry_start() {
            Phase::PreEntry
        } else if now < bounds.window.start {
            Phase::Entering
        } else if now < bounds.window.end {
            Phase::Active
        } else if now < bounds.exit_end() {
            Phase::Exiting
        } else {
            Phase::PostExit
        }
    }

    pub fn is_visible(self) -> bool {
        matches!(self, Phase::Entering | Phase::Active | Phase::Exiting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PreEntry => "pre-entry",
            Phase::Entering => "entering",
            Phase::Active => "active",
            Phase::Exiting => "exiting",
            Phase::PostExit => "post-exit",
        }
    }
}

/// The four boundaries that decide an entity's phase
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseBounds {
    /// Window during which the entity is fully shown
    pub window: TimeWindow,
    /// Entrance duration before `window.start`
    pub head: f64,
    /// Exit duration after `window.end`
    pub tail: f64,
}

impl PhaseBounds {
    pub fn new(window: TimeWindow, head: f64, tail: f64) -> Self {
        Self {
            window,
            head: head.max(0.0),
            tail: tail.max(0.0),
        }
    }

    pub fn entry_start(&self) -> ClockMs {
        self.window.start - self.head
    }

    pub fn exit_end(&self) -> ClockMs {
        self.window.end + self.tail
    }

    /// `[start - head, start, end, end + tail]`
    pub fn boundaries(&self) -> [ClockMs; 4] {
        [
            self.entry_start(),
            self.window.start,
            self.window.end,
            self.exit_end(),
        ]
    }

    /// Whole window including entrance and exit
    pub fn effective_window(&self) -> TimeWindow {
        self.window.padded(self.head, self.tail)
    }
}

/// Slice layout and shaping
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceShape {
    pub count: u32,
    pub easing: Easing,
}

impl SliceShape {
    pub fn new(count: u32, easing: Easing) -> Self {
        Self {
            count: count.max(1),
            easing,
        }
    }
}

/// Reveal ratio of one slice at `now`
///
/// Slice `i` of `n` starts `i * span / (n + 1)` into the entrance (or exit)
/// and lasts `2 * span / (n + 1)`, so neighbouring slices overlap and the last
/// one finishes exactly at the phase boundary.
pub fn slice_ratio(now: ClockMs, bounds: &PhaseBounds, shape: SliceShape, index: u32) -> f32 {
    match Phase::at(now, bounds) {
        Phase::PreEntry | Phase::PostExit => 0.0,
        Phase::Active => 1.0,
        Phase::Entering => staggered(now, bounds.entry_start(), bounds.head, shape, index) as f32,
        Phase::Exiting => {
            (1.0 - staggered(now, bounds.window.end, bounds.tail, shape, index)) as f32
        }
    }
}

fn staggered(now: ClockMs, origin: ClockMs, span: f64, shape: SliceShape, index: u32) -> f64 {
    let n = shape.count as f64;
    let slice_start = origin + index as f64 * span / (n + 1.0);
    let slice_duration = effective_duration(2.0 * span / (n + 1.0));
    let t = ((now - slice_start) / slice_duration).clamp(0.0, 1.0);
    shape.easing.apply(t).clamp(0.0, 1.0)
}

/// Build the full slice progression at `now`
pub fn build_slices(now: ClockMs, bounds: &PhaseBounds, shape: SliceShape) -> SliceProgression {
    (0..shape.count)
        .map(|i| slice_ratio(now, bounds, shape, i))
        .collect()
}

/// How a clock value relates to the previously evaluated one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// No previous evaluation
    First,
    /// Same clock as last time
    Repeat,
    /// Ordinary playback advance
    Forward,
    /// Small backward step within the seek threshold
    Backstep,
    /// Discontinuous jump
    Seek,
}

/// Thresholds separating ordinary ticks from seeks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekPolicy {
    /// Backward jumps larger than this are seeks
    pub seek_threshold: f64,
    /// Forward jumps larger than this are seeks
    pub max_forward_delta: f64,
}

impl SeekPolicy {
    pub fn new(seek_threshold: f64, max_forward_delta: f64) -> Self {
        Self {
            seek_threshold: seek_threshold.max(0.0),
            max_forward_delta: max_forward_delta.max(0.0),
        }
    }

    pub fn classify(&self, last: Option<ClockMs>, now: ClockMs) -> TickKind {
        let Some(last) = last else {
            return TickKind::First;
        };
        if now == last {
            TickKind::Repeat
        } else if now < last - self.seek_threshold {
            TickKind::Seek
        } else if now < last {
            TickKind::Backstep
        } else if now - last > self.max_forward_delta {
            TickKind::Seek
        } else {
            TickKind::Forward
        }
    }
}

/// Cached phase and slice progression of one entity
#[derive(Clone, Debug)]
pub struct PhaseState {
    entity: EntityId,
    last_clock: Option<ClockMs>,
    phase: Phase,
    bounds: Option<PhaseBounds>,
    shape: Option<SliceShape>,
    slices: SliceProgression,
}

impl PhaseState {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            last_clock: None,
            phase: Phase::PreEntry,
            bounds: None,
            shape: None,
            slices: SliceProgression::new(),
        }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn slices(&self) -> &[f32] {
        &self.slices
    }

    pub fn last_clock(&self) -> Option<ClockMs> {
        self.last_clock
    }

    /// Bring the cached state to `now` and report how the tick was classified
    pub fn evaluate(
        &mut self,
        now: ClockMs,
        bounds: PhaseBounds,
        shape: SliceShape,
        policy: SeekPolicy,
    ) -> TickKind {
        let tick = policy.classify(self.last_clock, now);
        let layout_changed = self.bounds != Some(bounds) || self.shape != Some(shape);
        self.last_clock = Some(now);

        if layout_changed {
            self.rebuild(now, bounds, shape);
            return tick;
        }

        match tick {
            TickKind::Repeat => {}
            TickKind::Forward => self.advance(now, bounds, shape),
            TickKind::Seek => {
                tracing::debug!(entity = %self.entity, now, "seek detected, rebuilding slices");
                self.rebuild(now, bounds, shape);
            }
            TickKind::First | TickKind::Backstep => self.rebuild(now, bounds, shape),
        }
        tick
    }

    /// Discard the cache and recompute every slice from `now`
    fn rebuild(&mut self, now: ClockMs, bounds: PhaseBounds, shape: SliceShape) {
        self.phase = Phase::at(now, &bounds);
        self.slices = build_slices(now, &bounds, shape);
        self.bounds = Some(bounds);
        self.shape = Some(shape);
    }

    /// Forward tick: recompute only slices that can still change
    fn advance(&mut self, now: ClockMs, bounds: PhaseBounds, shape: SliceShape) {
        let phase = Phase::at(now, &bounds);
        if phase != self.phase {
            tracing::trace!(
                entity = %self.entity,
                from = self.phase.as_str(),
                to = phase.as_str(),
                "phase change"
            );
            self.phase = phase;
            self.slices = build_slices(now, &bounds, shape);
            return;
        }

        // Monotonic shaping keeps a saturated slice saturated for any later
        // clock within the same phase.
        let saturated = match phase {
            Phase::Entering if shape.easing.is_monotonic() => Some(1.0),
            Phase::Exiting if shape.easing.is_monotonic() => Some(0.0),
            Phase::Entering | Phase::Exiting => None,
            // Constant phases: nothing depends on `now`
            Phase::PreEntry | Phase::Active | Phase::PostExit => return,
        };

        for (i, ratio) in self.slices.iter_mut().enumerate() {
            if Some(*ratio) != saturated {
                *ratio = slice_ratio(now, &bounds, shape, i as u32);
            }
        }
    }
}

/// Phase states of every entity touched in a session
#[derive(Debug, Default)]
pub struct PhaseMachine {
    states: FxHashMap<EntityId, PhaseState>,
    seeks: u64,
}

/// Result of evaluating one entity
#[derive(Clone, Copy, Debug)]
pub struct PhaseSample<'a> {
    pub phase: Phase,
    pub slices: &'a [f32],
    pub tick: TickKind,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        entity: &EntityId,
        now: ClockMs,
        bounds: PhaseBounds,
        shape: SliceShape,
        policy: SeekPolicy,
    ) -> PhaseSample<'_> {
        let state = self
            .states
            .entry(entity.clone())
            .or_insert_with(|| PhaseState::new(entity.clone()));
        let tick = state.evaluate(now, bounds, shape, policy);
        if tick == TickKind::Seek {
            self.seeks += 1;
        }
        PhaseSample {
            phase: state.phase,
            slices: &state.slices,
            tick,
        }
    }

    pub fn get(&self, entity: &EntityId) -> Option<&PhaseState> {
        self.states.get(entity)
    }

    /// Keep only entities for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&EntityId) -> bool) {
        self.states.retain(|id, _| keep(id));
    }

    pub fn remove(&mut self, entity: &EntityId) -> Option<PhaseState> {
        self.states.remove(entity)
    }

    /// Total seeks detected across all entities
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    pub fn reset(&mut self) {
        self.states.clear();
        self.seeks = 0;
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> PhaseBounds {
        PhaseBounds::new(TimeWindow::new(1000.0, 2000.0), 500.0, 500.0)
    }

    fn policy() -> SeekPolicy {
        SeekPolicy::new(100.0, 250.0)
    }

    #[test]
    fn phase_follows_boundaries() {
        let b = bounds();
        assert_eq!(Phase::at(400.0, &b), Phase::PreEntry);
        assert_eq!(Phase::at(700.0, &b), Phase::Entering);
        assert_eq!(Phase::at(1500.0, &b), Phase::Active);
        assert_eq!(Phase::at(2200.0, &b), Phase::Exiting);
        assert_eq!(Phase::at(2600.0, &b), Phase::PostExit);
        assert_eq!(b.boundaries(), [500.0, 1000.0, 2000.0, 2500.0]);
    }

    #[test]
    fn boundaries_are_half_open() {
        let b = bounds();
        assert_eq!(Phase::at(500.0, &b), Phase::Entering);
        assert_eq!(Phase::at(1000.0, &b), Phase::Active);
        assert_eq!(Phase::at(2000.0, &b), Phase::Exiting);
        assert_eq!(Phase::at(2500.0, &b), Phase::PostExit);
    }

    #[test]
    fn slices_stagger_during_entrance() {
        let b = bounds();
        let shape = SliceShape::new(4, Easing::Linear);
        let slices = build_slices(700.0, &b, shape);
        assert_eq!(slices.len(), 4);
        assert!(slices.windows(2).all(|w| w[0] >= w[1]), "{slices:?}");
        assert!(slices[0] > 0.0);
        assert_eq!(slices[3], 0.0);

        // Last slice ends exactly at start
        let just_before = build_slices(999.999, &b, shape);
        assert!(just_before[3] > 0.99);
        assert!(build_slices(1000.0, &b, shape).iter().all(|r| *r == 1.0));
    }

    #[test]
    fn slices_conceal_during_exit() {
        let b = bounds();
        let shape = SliceShape::new(3, Easing::Linear);
        let slices = build_slices(2200.0, &b, shape);
        assert!(slices.iter().all(|r| (0.0..=1.0).contains(r)));
        assert!(slices[0] < slices[2]);
        assert!(build_slices(2600.0, &b, shape).iter().all(|r| *r == 0.0));
    }

    #[test]
    fn classify_distinguishes_ticks() {
        let p = policy();
        assert_eq!(p.classify(None, 0.0), TickKind::First);
        assert_eq!(p.classify(Some(100.0), 100.0), TickKind::Repeat);
        assert_eq!(p.classify(Some(100.0), 116.0), TickKind::Forward);
        assert_eq!(p.classify(Some(100.0), 60.0), TickKind::Backstep);
        assert_eq!(p.classify(Some(1000.0), 200.0), TickKind::Seek);
        assert_eq!(p.classify(Some(0.0), 5000.0), TickKind::Seek);
    }

    #[test]
    fn forward_ticks_match_fresh_state() {
        let b = bounds();
        let shape = SliceShape::new(6, Easing::EaseOutCubic);
        let mut state = PhaseState::new(EntityId::from("a"));

        let mut now = 300.0;
        while now < 2800.0 {
            state.evaluate(now, b, shape, policy());
            let mut fresh = PhaseState::new(EntityId::from("a"));
            fresh.evaluate(now, b, shape, policy());
            assert_eq!(state.phase(), fresh.phase(), "at {now}");
            assert_eq!(state.slices(), fresh.slices(), "at {now}");
            now += 16.0;
        }
    }

    #[test]
    fn seek_back_from_post_exit_restores_active() {
        let b = bounds();
        let shape = SliceShape::new(4, Easing::EaseOutCubic);
        let mut state = PhaseState::new(EntityId::from("a"));

        state.evaluate(2600.0, b, shape, policy());
        assert_eq!(state.phase(), Phase::PostExit);
        assert!(state.slices().iter().all(|r| *r == 0.0));

        let tick = state.evaluate(1500.0, b, shape, policy());
        assert_eq!(tick, TickKind::Seek);
        assert_eq!(state.phase(), Phase::Active);
        assert!(state.slices().iter().all(|r| *r == 1.0));
    }

    #[test]
    fn reentering_exit_rederives_partial_conceal() {
        let b = bounds();
        let shape = SliceShape::new(4, Easing::Linear);
        let mut state = PhaseState::new(EntityId::from("a"));

        state.evaluate(2600.0, b, shape, policy());
        state.evaluate(2200.0, b, shape, policy());
        assert_eq!(state.phase(), Phase::Exiting);
        assert!(state.slices().iter().any(|r| *r > 0.0));
        assert_eq!(state.slices(), build_slices(2200.0, &b, shape).as_slice());
    }

    #[test]
    fn overshooting_easing_recomputes_every_slice() {
        let b = bounds();
        let shape = SliceShape::new(3, Easing::CubicBezier(0.3, 1.6, 0.6, 1.0));
        let mut state = PhaseState::new(EntityId::from("a"));
        let mut now = 500.0;
        while now < 1000.0 {
            state.evaluate(now, b, shape, policy());
            assert_eq!(state.slices(), build_slices(now, &b, shape).as_slice());
            now += 10.0;
        }
    }

    #[test]
    fn machine_counts_seeks_and_prunes() {
        let mut machine = PhaseMachine::new();
        let b = bounds();
        let shape = SliceShape::new(1, Easing::Linear);
        let a = EntityId::from("a");
        let z = EntityId::from("z");

        machine.evaluate(&a, 2000.0, b, shape, policy());
        machine.evaluate(&z, 2000.0, b, shape, policy());
        let sample = machine.evaluate(&a, 100.0, b, shape, policy());
        assert_eq!(sample.tick, TickKind::Seek);
        assert_eq!(sample.phase, Phase::PreEntry);
        assert_eq!(machine.seek_count(), 1);

        machine.retain(|id| id.as_str() != "z");
        assert_eq!(machine.len(), 1);
        assert!(machine.get(&z).is_none());
    }
}
