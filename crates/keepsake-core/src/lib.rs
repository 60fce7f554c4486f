#![forbid(unsafe_code)]

//! Core: clocks, input events, geometry, and animation primitives shared by
//! every Keepsake component.

pub mod animation;
pub mod clock;
pub mod event;
pub mod geometry;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, info_span, trace, warn};
