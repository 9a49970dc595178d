//! Velocity-profile motion solver
//!
//! Entrance and exit motion is described by a speed curve rather than by
//! keyframed positions:
//!
//! ```text
//! velocity(t) = initial + (final - initial) * easing(t / duration)
//! ```
//!
//! The travelled distance is the integral of that curve. It is recomputed from
//! `elapsed` on every call, so scrubbing to any point needs no history.

use crate::easing::Easing;

/// Durations are floored to this value before dividing by them
pub const MIN_DURATION_MS: f64 = 1e-3;

/// Number of fixed integration steps spanning the full duration
pub const SUBDIVISIONS: usize = 100;

/// A speed curve over a fixed duration
///
/// Plain value: built fresh for each evaluation, never retained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityProfile {
    /// Speed at the start of the motion (units per millisecond)
    pub initial_speed: f64,
    /// Speed at the end of the motion (units per millisecond)
    pub final_speed: f64,
    /// Duration in milliseconds
    pub duration: f64,
    pub easing: Easing,
}

impl VelocityProfile {
    pub fn new(initial_speed: f64, final_speed: f64, duration: f64, easing: Easing) -> Self {
        Self {
            initial_speed,
            final_speed,
            duration,
            easing,
        }
    }

    /// The same curve played backwards in speed, used for exits
    pub fn mirrored(&self, duration: f64) -> Self {
        Self {
            initial_speed: self.final_speed,
            final_speed: self.initial_speed,
            duration,
            easing: self.easing,
        }
    }

    /// Instantaneous speed at `t` milliseconds into the motion
    pub fn velocity(&self, t: f64) -> f64 {
        let duration = effective_duration(self.duration);
        self.initial_speed
            + (self.final_speed - self.initial_speed) * self.easing.apply(t / duration)
    }

    /// Distance travelled after `elapsed` milliseconds
    pub fn distance(&self, elapsed: f64) -> f64 {
        distance(
            elapsed,
            self.duration,
            self.initial_speed,
            self.final_speed,
            self.easing,
        )
    }

    /// Distance travelled over the whole motion
    pub fn total_distance(&self) -> f64 {
        saturated_distance(
            effective_duration(self.duration),
            self.initial_speed,
            self.final_speed,
            self.easing,
        )
    }

    /// Fraction of the total distance covered after `elapsed`, in `[0, 1]`
    ///
    /// Falls back to the time fraction when the profile travels nowhere.
    pub fn progress(&self, elapsed: f64) -> f64 {
        let total = self.total_distance();
        if total.abs() < f64::EPSILON {
            return (elapsed / effective_duration(self.duration)).clamp(0.0, 1.0);
        }
        (self.distance(elapsed) / total).clamp(0.0, 1.0)
    }
}

/// Integral of the velocity curve over `[0, min(elapsed, duration)]`
///
/// Past the end of the motion the closed form
/// `duration * (initial + (final - initial) * easing.mean())` is returned
/// instead of re-integrating the saturated profile. `mean()` uses the same
/// grid, so the two agree at `elapsed == duration` up to rounding.
pub fn distance(
    elapsed: f64,
    duration: f64,
    initial_speed: f64,
    final_speed: f64,
    easing: Easing,
) -> f64 {
    // Also rejects NaN
    if !(elapsed > 0.0) {
        return 0.0;
    }

    let duration = effective_duration(duration);
    if elapsed >= duration {
        return saturated_distance(duration, initial_speed, final_speed, easing);
    }

    // Normalized time, sampled at exactly the points `Easing::mean` uses
    let velocity = |u: f64| initial_speed + (final_speed - initial_speed) * easing.apply(u);

    let h = 1.0 / SUBDIVISIONS as f64;
    let end = elapsed / duration;
    let whole = ((end / h).floor() as usize).min(SUBDIVISIONS - 1);

    let mut total = 0.0;
    for i in 0..whole {
        total += refined_trapezoid(&velocity, i as f64 * h, h);
    }

    let tail_start = whole as f64 * h;
    duration * (total + refined_trapezoid(&velocity, tail_start, end - tail_start))
}

fn saturated_distance(duration: f64, initial_speed: f64, final_speed: f64, easing: Easing) -> f64 {
    duration * (initial_speed + (final_speed - initial_speed) * easing.mean())
}

pub(crate) fn effective_duration(duration: f64) -> f64 {
    if duration.is_finite() {
        duration.max(MIN_DURATION_MS)
    } else {
        MIN_DURATION_MS
    }
}

/// One trapezoid step over `[a, a + h]`, Richardson-extrapolated against the
/// two-panel trapezoid on the same step
#[inline]
pub(crate) fn refined_trapezoid(f: &impl Fn(f64) -> f64, a: f64, h: f64) -> f64 {
    if h <= 0.0 {
        return 0.0;
    }
    let fa = f(a);
    let fm = f(a + 0.5 * h);
    let fb = f(a + h);
    let coarse = 0.5 * h * (fa + fb);
    let fine = 0.25 * h * (fa + 2.0 * fm + fb);
    fine + (fine - coarse) / 3.0
}
