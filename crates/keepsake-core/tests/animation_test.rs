//! Integration tests for the animation module.

use keepsake_core::animation::*;
use proptest::prelude::*;
use std::time::Duration;

#[test]
fn stepped_tracks_thirty_steps_over_800ms() {
    let mut s = Stepped::new(Duration::from_millis(800), 30);
    let mut seen = Vec::new();
    while !s.is_complete() {
        s.tick(Duration::from_millis(1));
        seen.push(s.step());
    }
    seen.dedup();
    assert_eq!(seen.len(), 31, "0..=30 each observed once: {seen:?}");
    assert_eq!(s.value(), 1.0);
}

#[test]
fn easing_functions_are_monotonic() {
    for easing in [linear, ease_in, ease_out, ease_in_out] {
        let mut prev = 0.0f32;
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            let v = easing(t);
            assert!(v >= prev - 0.001, "easing should be monotonic at t={t}");
            prev = v;
        }
    }
}

proptest! {
    #[test]
    fn stepped_value_stays_in_unit_range(
        duration_ms in 0u64..5_000,
        steps in 0u32..120,
        ticks in proptest::collection::vec(0u64..400, 0..64),
    ) {
        let mut s = Stepped::new(Duration::from_millis(duration_ms), steps);
        let mut prev = s.step();
        for t in ticks {
            s.tick(Duration::from_millis(t));
            let v = s.value();
            prop_assert!((0.0..=1.0).contains(&v));
            prop_assert!(s.step() >= prev, "steps never go backwards");
            prop_assert!(s.step() <= s.steps());
            prev = s.step();
        }
    }

    #[test]
    fn stepped_batching_does_not_change_outcome(
        steps in 1u32..60,
        split in 1u64..800,
    ) {
        let total = Duration::from_millis(800);
        let mut whole = Stepped::new(total, steps);
        whole.tick(total);

        let mut parts = Stepped::new(total, steps);
        parts.tick(Duration::from_millis(split.min(800)));
        parts.tick(total.saturating_sub(Duration::from_millis(split.min(800))));

        prop_assert_eq!(whole.step(), parts.step());
        prop_assert!(parts.is_complete());
    }
}
