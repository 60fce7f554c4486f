#![forbid(unsafe_code)]

//! Time-based animation primitives.
//!
//! Animations produce normalized `f32` values in [0.0, 1.0] and are advanced
//! explicitly by the host via [`Animation::tick`]. Nothing here owns a timer:
//! elapsed time is accumulated as [`Duration`] so repeated small ticks never
//! drift.
//!
//! [`Stepped`] is the discrete variant used for volume fades: progress only
//! moves in whole steps of a fixed interval, so a fade of N steps writes at
//! most N distinct values regardless of how the host batches its ticks.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-based animation producing values in [0.0, 1.0].
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current output value, clamped to [0.0, 1.0].
    fn value(&self) -> f32;

    /// Reset the animation to its initial state.
    fn reset(&mut self);

    /// Time elapsed past completion.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// Stepped
// ---------------------------------------------------------------------------

/// Progress from 0.0 to 1.0 in `steps` discrete increments over a duration.
///
/// Step `k` becomes current once `k * interval` has elapsed, where
/// `interval = duration / steps`. [`Animation::value`] is the eased fraction
/// `k / steps`, so the final step always yields exactly 1.0.
#[derive(Debug, Clone, Copy)]
pub struct Stepped {
    elapsed: Duration,
    interval: Duration,
    steps: u32,
    easing: EasingFn,
}

impl Stepped {
    /// Create a stepped progression. `steps` is clamped to at least 1 and a
    /// zero duration completes on the first tick.
    pub fn new(duration: Duration, steps: u32) -> Self {
        let steps = steps.max(1);
        let interval = duration / steps;
        Self {
            elapsed: Duration::ZERO,
            interval: if interval.is_zero() {
                Duration::from_nanos(1)
            } else {
                interval
            },
            steps,
            easing: linear,
        }
    }

    /// Set the easing function.
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Index of the current step in `0..=steps`.
    pub fn step(&self) -> u32 {
        let reached = self.elapsed.as_nanos() / self.interval.as_nanos();
        u32::try_from(reached).unwrap_or(u32::MAX).min(self.steps)
    }

    /// Total number of steps.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Time between two consecutive steps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time accumulated so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Raw fraction of completed steps, before easing.
    pub fn raw_progress(&self) -> f32 {
        self.step() as f32 / self.steps as f32
    }
}

impl Animation for Stepped {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.step() >= self.steps
    }

    fn value(&self) -> f32 {
        (self.easing)(self.raw_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed
            .saturating_sub(self.interval.saturating_mul(self.steps))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
