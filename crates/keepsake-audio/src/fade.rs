#![forbid(unsafe_code)]

//! Stepped volume fades.
//!
//! A fade moves the output volume from its start value to a target in a
//! fixed number of discrete writes spread evenly over a fixed duration.
//! Step `k` of `N` writes `start + (target - start) * curve(k / N)`, clamped
//! to [0, 1]; the final step writes the target exactly.
//!
//! [`FadeTask::advance`] returns every write crossed by the elapsed time, so
//! a host that ticks coarsely still produces the same sequence of volumes as
//! one that ticks every interval.

use std::time::Duration;

use keepsake_core::animation::{Animation, EasingFn, Stepped, ease_in_out, linear};
use serde::Deserialize;

/// Shape of the interpolation between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    #[default]
    Linear,
    EaseInOut,
}

impl FadeCurve {
    fn easing(self) -> EasingFn {
        match self {
            FadeCurve::Linear => linear,
            FadeCurve::EaseInOut => ease_in_out,
        }
    }
}

/// Fade timing shared by every fade of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FadeOptions {
    /// Total fade duration in milliseconds.
    pub duration_ms: u64,
    /// Number of discrete volume writes.
    pub steps: u32,
    pub curve: FadeCurve,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            duration_ms: 800,
            steps: 30,
            curve: FadeCurve::Linear,
        }
    }
}

impl FadeOptions {
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// An in-flight fade.
#[derive(Debug, Clone)]
pub struct FadeTask {
    from: f32,
    to: f32,
    progress: Stepped,
    written: u32,
    cancelled: bool,
}

impl FadeTask {
    /// Start a fade from `from` to `to`. Both ends are clamped to [0, 1].
    #[must_use]
    pub fn new(from: f32, to: f32, options: FadeOptions) -> Self {
        Self {
            from: clamp_volume(from),
            to: clamp_volume(to),
            progress: Stepped::new(options.duration(), options.steps)
                .easing(options.curve.easing()),
            written: 0,
            cancelled: false,
        }
    }

    /// Volume the fade started from.
    #[must_use]
    pub fn start(&self) -> f32 {
        self.from
    }

    /// Volume the fade ends on.
    #[must_use]
    pub fn target(&self) -> f32 {
        self.to
    }

    /// Total number of writes.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.progress.steps()
    }

    /// Time between two writes.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.progress.interval()
    }

    /// Volume at step `k`.
    fn volume_at(&self, k: u32) -> f32 {
        let n = self.progress.steps();
        if k >= n {
            return self.to;
        }
        let mut probe = self.progress;
        probe.reset();
        probe.tick(probe.interval().saturating_mul(k));
        clamp_volume(self.from + (self.to - self.from) * probe.value())
    }

    /// Advance by `dt` and return the volume writes that became due, in order.
    pub fn advance(&mut self, dt: Duration) -> Vec<f32> {
        if self.cancelled || self.is_done() {
            return Vec::new();
        }
        self.progress.tick(dt);
        let reached = self.progress.step();
        let writes = ((self.written + 1)..=reached)
            .map(|k| self.volume_at(k))
            .collect();
        self.written = reached;
        writes
    }

    /// Whether the final write has been issued.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.written >= self.progress.steps()
    }

    /// Stop the fade where it is; later advances write nothing.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Time until the next write, or `None` when finished.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        if self.cancelled || self.is_done() {
            return None;
        }
        let next = self.progress.interval().saturating_mul(self.written + 1);
        Some(next.saturating_sub(self.progress.elapsed()))
    }
}

/// Clamp to the valid volume range; NaN becomes silence.
#[must_use]
pub fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_nanos(26_666_666);

    #[test]
    fn thirty_writes_ending_on_target() {
        let mut fade = FadeTask::new(0.0, 0.6, FadeOptions::default());
        let mut writes = Vec::new();
        while !fade.is_done() {
            writes.extend(fade.advance(Duration::from_millis(5)));
        }
        assert_eq!(writes.len(), 30);
        assert_eq!(*writes.last().unwrap(), 0.6);
        assert!((writes[14] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn coarse_ticks_produce_same_writes() {
        let mut fine = FadeTask::new(1.0, 0.0, FadeOptions::default());
        let mut coarse = fine.clone();
        let mut a = Vec::new();
        for _ in 0..200 {
            a.extend(fine.advance(Duration::from_millis(4)));
        }
        let mut b = coarse.advance(Duration::from_millis(300));
        b.extend(coarse.advance(Duration::from_secs(1)));
        assert_eq!(a, b);
    }

    #[test]
    fn nothing_due_before_first_interval() {
        let mut fade = FadeTask::new(0.0, 1.0, FadeOptions::default());
        assert!(fade.advance(Duration::from_millis(20)).is_empty());
        assert_eq!(fade.advance(Duration::from_millis(7)).len(), 1);
    }

    #[test]
    fn cancel_stops_writes() {
        let mut fade = FadeTask::new(0.0, 1.0, FadeOptions::default());
        fade.advance(STEP * 3);
        fade.cancel();
        assert!(fade.advance(Duration::from_secs(2)).is_empty());
        assert!(!fade.is_done());
        assert_eq!(fade.next_due(), None);
    }

    #[test]
    fn endpoints_are_clamped() {
        let fade = FadeTask::new(-2.0, 7.0, FadeOptions::default());
        assert_eq!(fade.start(), 0.0);
        assert_eq!(fade.target(), 1.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn next_due_counts_down() {
        let opts = FadeOptions {
            duration_ms: 100,
            steps: 10,
            ..FadeOptions::default()
        };
        let mut fade = FadeTask::new(0.0, 1.0, opts);
        assert_eq!(fade.next_due(), Some(Duration::from_millis(10)));
        fade.advance(Duration::from_millis(4));
        assert_eq!(fade.next_due(), Some(Duration::from_millis(6)));
        fade.advance(Duration::from_millis(100));
        assert_eq!(fade.next_due(), None);
    }

    #[test]
    fn ease_in_out_curve_hits_target() {
        let opts = FadeOptions {
            curve: FadeCurve::EaseInOut,
            ..FadeOptions::default()
        };
        let mut fade = FadeTask::new(0.2, 0.8, opts);
        let writes = fade.advance(Duration::from_secs(1));
        assert_eq!(writes.len(), 30);
        assert_eq!(*writes.last().unwrap(), 0.8);
        assert!(writes.windows(2).all(|w| w[1] >= w[0]));
    }
}
