#![forbid(unsafe_code)]

//! Page scroll state: the shared lock, the progress bar and parallax.

use bitflags::bitflags;

bitflags! {
    /// Why scrolling is currently locked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LockReason: u8 {
        /// The invitation envelope has not been opened yet.
        const INVITATION = 0b01;
        /// The lightbox modal is showing.
        const LIGHTBOX   = 0b10;
    }
}

/// Page-wide scroll lock held by any number of independent reasons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollLock {
    held: LockReason,
}

impl ScrollLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `reason`. Returns `true` if scrolling just became locked.
    pub fn acquire(&mut self, reason: LockReason) -> bool {
        let was = self.is_locked();
        self.held.insert(reason);
        !was && self.is_locked()
    }

    /// Drop `reason`. Returns `true` if scrolling just became unlocked.
    pub fn release(&mut self, reason: LockReason) -> bool {
        let was = self.is_locked();
        self.held.remove(reason);
        was && !self.is_locked()
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.held.is_empty()
    }

    /// Reasons currently held.
    #[must_use]
    pub fn reasons(&self) -> LockReason {
        self.held
    }
}

/// Scroll progress in percent, clamped to [0, 100].
///
/// Returns 0 when the document fits inside the viewport.
#[must_use]
pub fn scroll_progress(scroll_top: f32, scroll_height: f32, viewport_height: f32) -> f32 {
    let scrollable = scroll_height - viewport_height;
    if scrollable.is_nan() || scrollable <= 0.0 {
        return 0.0;
    }
    (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
}

/// Parallax strength applied to the element-center offset.
pub const PARALLAX_FACTOR: f32 = 0.3;

/// Percent of background movement per pixel of scaled offset.
const PARALLAX_PERCENT_PER_PX: f32 = 0.04;

/// Background Y position in percent for a parallax section.
///
/// `50%` when the element is centered in the viewport, shifting by
/// `offset * factor * 0.04` percent as it moves away.
#[must_use]
pub fn parallax_position(rect_top: f32, rect_height: f32, viewport_height: f32, factor: f32) -> f32 {
    let center = rect_top + rect_height / 2.0 - viewport_height / 2.0;
    50.0 + center * factor * PARALLAX_PERCENT_PER_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_flips_only_on_edges() {
        let mut lock = ScrollLock::new();
        assert!(lock.acquire(LockReason::INVITATION));
        assert!(!lock.acquire(LockReason::LIGHTBOX));
        assert!(!lock.release(LockReason::LIGHTBOX));
        assert!(lock.is_locked());
        assert!(lock.release(LockReason::INVITATION));
        assert!(!lock.is_locked());
    }

    #[test]
    fn releasing_unheld_reason_is_noop() {
        let mut lock = ScrollLock::new();
        assert!(!lock.release(LockReason::LIGHTBOX));
        assert_eq!(lock.reasons(), LockReason::empty());
    }

    #[test]
    fn double_acquire_single_release() {
        let mut lock = ScrollLock::new();
        lock.acquire(LockReason::LIGHTBOX);
        lock.acquire(LockReason::LIGHTBOX);
        assert!(lock.release(LockReason::LIGHTBOX));
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(scroll_progress(0.0, 2000.0, 800.0), 0.0);
        assert_eq!(scroll_progress(600.0, 2000.0, 800.0), 50.0);
        assert_eq!(scroll_progress(5000.0, 2000.0, 800.0), 100.0);
        assert_eq!(scroll_progress(100.0, 500.0, 800.0), 0.0);
        assert_eq!(scroll_progress(0.0, 800.0, 800.0), 0.0);
    }

    #[test]
    fn parallax_centered_is_fifty() {
        assert_eq!(parallax_position(300.0, 200.0, 800.0, PARALLAX_FACTOR), 50.0);
    }

    #[test]
    fn parallax_below_center_moves_down() {
        // center offset = 600 + 100 - 400 = 300 -> 300 * 0.3 * 0.04 = 3.6
        let y = parallax_position(600.0, 200.0, 800.0, PARALLAX_FACTOR);
        assert!((y - 53.6).abs() < 1e-4);
    }
}
