#![forbid(unsafe_code)]

//! Scroll-triggered reveal scheduling.
//!
//! [`RevealScheduler`] tracks a set of targets and flips each one to visible
//! the first time an intersection batch reports it inside the (margin
//! adjusted) viewport. The presentation layer plays the actual transition.
//!
//! # Invariants
//!
//! 1. A target transitions pending -> visible at most once.
//! 2. A visible target is no longer observed; later entries for it are ignored.
//! 3. Duplicate entries inside one batch reveal the target once.
//! 4. Targets in the intro section are visible at registration and never observed.

use std::collections::HashMap;

use keepsake_core::geometry::Rect;
use serde::Deserialize;

/// Observer options shared by every target of one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RevealOptions {
    /// Fraction of the target area that must be visible, in [0, 1].
    pub threshold: f32,
    /// Bottom component of the root margin in pixels. Negative values make
    /// targets reveal slightly before they fully enter.
    pub root_margin_bottom: f32,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            threshold: 0.12,
            root_margin_bottom: -60.0,
        }
    }
}

impl RevealOptions {
    /// Threshold clamped to [0, 1]; non-finite values fall back to 0.
    #[must_use]
    pub fn effective_threshold(&self) -> f32 {
        if self.threshold.is_finite() {
            self.threshold.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// A target declared by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevealSpec {
    /// Element identifier.
    pub id: String,
    /// Whether the element sits in the intro section (visible from the start).
    #[serde(default)]
    pub intro: bool,
}

impl RevealSpec {
    /// A regular, observed target.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intro: false,
        }
    }

    /// A target that is visible immediately.
    pub fn intro(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intro: true,
        }
    }
}

/// One entry of an intersection batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    /// Element identifier.
    pub id: String,
    /// Whether any part of the element intersects the root.
    pub is_intersecting: bool,
    /// Visible fraction of the element, in [0, 1].
    pub ratio: f32,
}

impl IntersectionEntry {
    /// Build an entry from a native observer report.
    pub fn new(id: impl Into<String>, is_intersecting: bool, ratio: f32) -> Self {
        Self {
            id: id.into(),
            is_intersecting,
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    /// Measure an entry geometrically from element bounds and the viewport.
    ///
    /// The viewport is shrunk (or grown) by `options.root_margin_bottom`
    /// before intersecting. Zero-area elements count as fully visible when
    /// they lie on or inside the root.
    pub fn measure(
        id: impl Into<String>,
        bounds: Rect,
        viewport: Rect,
        options: &RevealOptions,
    ) -> Self {
        let root = viewport.extend_bottom(options.root_margin_bottom);
        if bounds.is_empty() {
            let inside = bounds.x >= root.x
                && bounds.x <= root.right()
                && bounds.y >= root.y
                && bounds.y <= root.bottom();
            return Self::new(id, inside, if inside { 1.0 } else { 0.0 });
        }
        match bounds.intersection_opt(&root) {
            Some(visible) => Self::new(id, true, visible.area() / bounds.area()),
            None => Self::new(id, false, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
struct RevealTarget {
    visited: bool,
    observed: bool,
}

/// Tracks reveal targets and their one-way visibility state.
#[derive(Debug, Clone, Default)]
pub struct RevealScheduler {
    options: RevealOptions,
    targets: HashMap<String, RevealTarget>,
    order: Vec<String>,
}

impl RevealScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new(options: RevealOptions) -> Self {
        Self {
            options,
            targets: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Observer options in use.
    #[must_use]
    pub fn options(&self) -> &RevealOptions {
        &self.options
    }

    /// Register targets. Returns the ids that became visible immediately
    /// (intro targets seen for the first time).
    ///
    /// Registering an id that is already known keeps its state, so the page
    /// can re-scan after layout changes without replaying reveals.
    pub fn register<I>(&mut self, specs: I) -> Vec<String>
    where
        I: IntoIterator<Item = RevealSpec>,
    {
        let mut revealed = Vec::new();
        for spec in specs {
            if self.targets.contains_key(&spec.id) {
                continue;
            }
            let target = if spec.intro {
                revealed.push(spec.id.clone());
                RevealTarget {
                    visited: true,
                    observed: false,
                }
            } else {
                RevealTarget {
                    visited: false,
                    observed: true,
                }
            };
            self.order.push(spec.id.clone());
            self.targets.insert(spec.id, target);
        }
        keepsake_core::debug!(
            targets = self.targets.len(),
            immediate = revealed.len(),
            "reveal targets registered"
        );
        revealed
    }

    /// Process one intersection batch. Returns newly revealed ids in batch order.
    pub fn on_intersections(&mut self, batch: &[IntersectionEntry]) -> Vec<String> {
        let threshold = self.options.effective_threshold();
        let mut revealed = Vec::new();
        for entry in batch {
            let Some(target) = self.targets.get_mut(&entry.id) else {
                keepsake_core::trace!(id = %entry.id, "intersection for unknown target");
                continue;
            };
            if target.visited || !target.observed {
                continue;
            }
            if entry.is_intersecting && entry.ratio >= threshold {
                target.visited = true;
                target.observed = false;
                revealed.push(entry.id.clone());
            }
        }
        if !revealed.is_empty() {
            keepsake_core::debug!(count = revealed.len(), "targets revealed");
        }
        revealed
    }

    /// Whether `id` has been revealed.
    #[must_use]
    pub fn is_visible(&self, id: &str) -> bool {
        self.targets.get(id).is_some_and(|t| t.visited)
    }

    /// Whether `id` is still being observed.
    #[must_use]
    pub fn is_observing(&self, id: &str) -> bool {
        self.targets.get(id).is_some_and(|t| t.observed)
    }

    /// Ids still waiting for their first intersection, in registration order.
    pub fn observed_ids(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|id| self.is_observing(id))
            .map(String::as_str)
    }

    /// Number of targets still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.targets.values().filter(|t| !t.visited).count()
    }

    /// Total number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no targets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
