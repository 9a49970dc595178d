//! Easing functions for velocity profiles and slice reveal shaping

use crate::velocity::{refined_trapezoid, SUBDIVISIONS};
use serde::{Deserialize, Serialize};

/// Easing function type
///
/// Maps normalized progress in `[0, 1]` to a shaped value with
/// `apply(0) == 0` and `apply(1) == 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }

    /// Average of the easing over `[0, 1]`
    ///
    /// Integrated on the same fixed grid as [`crate::velocity::distance`], so
    /// the saturated distance continues the integrated one without a step.
    /// Exact for the quadratic and cubic presets.
    pub fn mean(&self) -> f64 {
        let h = 1.0 / SUBDIVISIONS as f64;
        let curve = |t: f64| self.apply(t);
        (0..SUBDIVISIONS)
            .map(|i| refined_trapezoid(&curve, i as f64 * h, h))
            .sum()
    }

    /// Why the curve cannot be evaluated, if it cannot
    ///
    /// Bezier control points must be finite, and the abscissas `x1`, `x2`
    /// must lie in `[0, 1]` for the curve to be a function of time.
    pub fn check(&self) -> Result<(), &'static str> {
        match *self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
                    Err("cubic bezier control points must be finite")
                } else if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                    Err("cubic bezier x1 and x2 must lie in [0, 1]")
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Whether the curve never decreases over `[0, 1]`
    ///
    /// Presets always are. A bezier is when both control ordinates stay in
    /// `[0, 1]`; overshooting curves are not.
    pub fn is_monotonic(&self) -> bool {
        match self {
            Easing::CubicBezier(_, y1, _, y2) => {
                (0.0..=1.0).contains(y1) && (0.0..=1.0).contains(y2)
            }
            _ => true,
        }
    }
}

/// Cubic bezier easing, same curve as CSS `cubic-bezier()`
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t;

    // Solve for parameter `p` where bezier_x(p) == x using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-9 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-9 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..40 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-9 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}
