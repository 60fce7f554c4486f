#![forbid(unsafe_code)]

//! Floating background particles.
//!
//! A fixed population of small dots drifts upward and fades out; each dot
//! respawns at the bottom edge once it is invisible or has left the top.
//! The field is advanced one display frame at a time by the host, which asks
//! [`ParticleField::is_frame_pending`] whether to schedule another frame.
//! Resizing and hiding the page cancel the pending frame.

use serde::{Deserialize, Serialize};

/// Particles above this y coordinate respawn.
const TOP_EXIT: f32 = -20.0;
/// Respawned particles start this far below the bottom edge.
const BOTTOM_SPAWN_OFFSET: f32 = 10.0;

/// Field configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParticleOptions {
    /// Number of particles.
    pub count: usize,
    /// PRNG seed; equal seeds give equal fields.
    pub seed: u64,
}

impl Default for ParticleOptions {
    fn default() -> Self {
        Self {
            count: 60,
            seed: 0x5eed_0214,
        }
    }
}

/// Palette of the particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleColor {
    Gold,
    Rose,
    Blush,
    White,
}

impl ParticleColor {
    const ALL: [ParticleColor; 4] = [
        ParticleColor::Gold,
        ParticleColor::Rose,
        ParticleColor::Blush,
        ParticleColor::White,
    ];

    /// RGB triple used when painting.
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            ParticleColor::Gold => (201, 169, 110),
            ParticleColor::Rose => (212, 160, 160),
            ParticleColor::Blush => (232, 213, 196),
            ParticleColor::White => (255, 255, 255),
        }
    }

    /// CSS `rgba()` string at `opacity`.
    #[must_use]
    pub fn css(self, opacity: f32) -> String {
        let (r, g, b) = self.rgb();
        format!("rgba({r}, {g}, {b}, {:.3})", opacity.clamp(0.0, 1.0))
    }
}

/// One dot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub opacity: f32,
    pub color: ParticleColor,
    /// Opacity lost per frame.
    pub lifespan: f32,
}

/// xorshift64, same recurrence as the stagger jitter generator.
#[derive(Debug, Clone)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // Avoid the all-zero fixed point.
        Self {
            state: seed.wrapping_add(1).max(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform in [0, 1).
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// The animated field.
#[derive(Debug, Clone)]
pub struct ParticleField {
    width: f32,
    height: f32,
    options: ParticleOptions,
    particles: Vec<Particle>,
    rng: XorShift64,
    visible: bool,
    frame_pending: bool,
    frames: u64,
}

impl ParticleField {
    /// Populate a field of `width` x `height` pixels and request the first frame.
    ///
    /// Initial particles are spread over the whole height.
    #[must_use]
    pub fn new(width: f32, height: f32, options: ParticleOptions) -> Self {
        let mut field = Self {
            width: width.max(0.0),
            height: height.max(0.0),
            options,
            particles: Vec::with_capacity(options.count),
            rng: XorShift64::new(options.seed),
            visible: true,
            frame_pending: false,
            frames: 0,
        };
        field.populate();
        field.frame_pending = true;
        field
    }

    fn spawn(&mut self, y: f32) -> Particle {
        let rng = &mut self.rng;
        let x = rng.next_f32() * self.width;
        let size = rng.next_f32() * 4.0 + 1.0;
        let speed_x = (rng.next_f32() - 0.5) * 0.4;
        let speed_y = rng.next_f32() * -0.6 - 0.2;
        let opacity = rng.next_f32() * 0.5 + 0.1;
        let color = ParticleColor::ALL[(rng.next_u64() % 4) as usize];
        let lifespan = rng.next_f32() * 0.005 + 0.002;
        Particle {
            x,
            y,
            size,
            speed_x,
            speed_y,
            opacity,
            color,
            lifespan,
        }
    }

    fn populate(&mut self) {
        self.particles.clear();
        for _ in 0..self.options.count {
            let y = self.rng.next_f32() * self.height;
            let p = self.spawn(y);
            self.particles.push(p);
        }
    }

    /// Advance every particle by one frame if a frame is pending.
    ///
    /// Returns `true` if the field moved. The next frame is requested
    /// automatically while the page is visible.
    pub fn frame(&mut self) -> bool {
        if !self.frame_pending {
            return false;
        }
        self.frame_pending = false;
        let respawn_y = self.height + BOTTOM_SPAWN_OFFSET;
        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            p.x += p.speed_x;
            p.y += p.speed_y;
            p.opacity -= p.lifespan;
            if p.opacity <= 0.0 || p.y < TOP_EXIT {
                self.particles[i] = self.spawn(respawn_y);
            }
        }
        self.frames += 1;
        self.frame_pending = self.visible;
        true
    }

    /// Ask for a frame. Ignored while hidden.
    pub fn request_frame(&mut self) {
        if self.visible {
            self.frame_pending = true;
        }
    }

    /// Cancel the pending frame.
    pub fn cancel_frame(&mut self) {
        self.frame_pending = false;
    }

    /// Cancel the pending frame, take the new bounds and restart.
    ///
    /// Existing particles keep their positions; respawns use the new bounds.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.cancel_frame();
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        keepsake_core::debug!(width, height, "particle field resized");
        self.request_frame();
    }

    /// Pause on hidden, resume on visible.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.request_frame();
        } else {
            self.cancel_frame();
        }
    }

    #[must_use]
    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Frames advanced since creation.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> ParticleField {
        ParticleField::new(400.0, 800.0, ParticleOptions::default())
    }

    #[test]
    fn spawns_configured_count_within_ranges() {
        let f = field();
        assert_eq!(f.particles().len(), 60);
        for p in f.particles() {
            assert!((1.0..5.0).contains(&p.size));
            assert!((-0.2..0.2).contains(&p.speed_x));
            assert!((-0.8..=-0.2).contains(&p.speed_y));
            assert!((0.1..0.6).contains(&p.opacity));
            assert!((0.002..0.007).contains(&p.lifespan));
            assert!((0.0..400.0).contains(&p.x));
            assert!((0.0..800.0).contains(&p.y));
        }
    }

    #[test]
    fn same_seed_same_field() {
        let a = field();
        let b = field();
        assert_eq!(a.particles(), b.particles());
        let c = ParticleField::new(400.0, 800.0, ParticleOptions { seed: 7, ..Default::default() });
        assert_ne!(a.particles(), c.particles());
    }

    #[test]
    fn frame_moves_particles_up_and_fades() {
        let mut f = field();
        let before = f.particles()[0];
        assert!(f.frame());
        let after = f.particles()[0];
        assert!(after.y < before.y || after.y > 800.0);
        assert!(after.opacity < before.opacity || after.y > 800.0);
        assert_eq!(f.frames(), 1);
        assert!(f.is_frame_pending());
    }

    #[test]
    fn faded_particles_respawn_below_bottom() {
        let mut f = ParticleField::new(100.0, 100.0, ParticleOptions { count: 1, seed: 3 });
        let mut respawned = false;
        for _ in 0..2_000 {
            f.frame();
            let p = f.particles()[0];
            assert!(p.opacity > 0.0);
            assert!(p.y >= TOP_EXIT);
            if p.y > 100.0 {
                respawned = true;
            }
        }
        assert!(respawned);
    }

    #[test]
    fn hidden_cancels_and_visible_resumes() {
        let mut f = field();
        f.set_visible(false);
        assert!(!f.is_frame_pending());
        assert!(!f.frame());
        f.request_frame();
        assert!(!f.is_frame_pending());
        f.set_visible(true);
        assert!(f.frame());
    }

    #[test]
    fn resize_rebounds_respawns() {
        let mut f = ParticleField::new(400.0, 800.0, ParticleOptions { count: 4, seed: 9 });
        let before = f.particles().to_vec();
        f.resize(50.0, 60.0);
        assert_eq!(f.size(), (50.0, 60.0));
        assert!(f.is_frame_pending());
        assert_eq!(f.particles(), before.as_slice());
        for _ in 0..2_000 {
            f.frame();
        }
        assert!(f.particles().iter().all(|p| p.y <= 70.0));
    }

    #[test]
    fn css_color() {
        assert_eq!(ParticleColor::White.css(0.5), "rgba(255, 255, 255, 0.500)");
    }
}
