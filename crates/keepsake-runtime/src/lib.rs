#![forbid(unsafe_code)]

//! Page runtime for Keepsake.
//!
//! [`Page`] owns every component of the invitation page and is driven by
//! the host the same way a step program is: the host delivers
//! [`PageEvent`]s, advances virtual time with [`Page::advance`], and drains
//! the resulting [`Effect`]s to apply them to the presentation layer.
//!
//! ```text
//! host ──PageEvent──▶ Page ──▶ components ──▶ Effect outbox ──drain──▶ host
//!   └──advance(dt)──▶ TimerQueue / fade / particle frame
//! ```

pub mod config;
pub mod effect;
pub mod hooks;
pub mod page;
pub mod state_persistence;
pub mod timer;

pub use config::{ConfigError, PageConfig};
pub use effect::{Control, Effect, PageEvent, ParallaxProbe, ScrollMetrics};
pub use hooks::{Hook, HookSet};
pub use page::{LoadingPhase, PARTICLE_FRAME, Page};
pub use state_persistence::{
    FileStorage, MemoryStorage, PreferenceStore, StorageBackend, StorageError, StorageResult,
};
pub use timer::{TimerId, TimerQueue};
