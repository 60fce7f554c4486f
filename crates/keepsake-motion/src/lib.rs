#![forbid(unsafe_code)]

//! Motion components of the invitation page.
//!
//! Each component is an owned state object driven by the host: it receives
//! observer batches, clock readings or key presses and answers with the
//! updates a presentation layer should apply. None of them schedule timers
//! themselves; they report when they want to run again.
//!
//! - [`reveal::RevealScheduler`] - one-way visibility on viewport entry
//! - [`countdown::CountdownEngine`] - change-detected countdown digits
//! - [`lightbox::LightboxNavigator`] - wraparound gallery modal
//! - [`scroll`] - shared scroll lock, progress bar and parallax
//! - [`particles::ParticleField`] - floating particles frame loop

pub mod countdown;
pub mod lightbox;
pub mod particles;
pub mod reveal;
pub mod scroll;

pub use countdown::{CountdownDisplay, CountdownEngine, CountdownUpdate, Evaluation, TimeUnit};
pub use lightbox::{GalleryItem, LightboxEvent, LightboxNavigator};
pub use particles::{ParticleField, ParticleOptions};
pub use reveal::{IntersectionEntry, RevealOptions, RevealScheduler, RevealSpec};
pub use scroll::{LockReason, ScrollLock};
