#![forbid(unsafe_code)]

//! Background music for the invitation page.
//!
//! [`AudioPlayer`] is the transport state machine. It drives an
//! implementation of [`PlaybackEngine`] (the actual audio element) and
//! smooths every start, stop and track change with a [`FadeTask`]. The host
//! forwards engine outcomes as [`PlaybackSignal`]s and advances time with
//! [`AudioPlayer::advance`]; observable changes are drained as
//! [`PlayerEvent`]s.

pub mod engine;
pub mod fade;
pub mod player;
pub mod track;

pub use engine::{EngineCall, PlaybackEngine, PlaybackError, PlaybackSignal, RecordingEngine};
pub use fade::{FadeCurve, FadeOptions, FadeTask};
pub use player::{AudioPlayer, PlayerEvent, PlayerState};
pub use track::{Playlist, Track};
