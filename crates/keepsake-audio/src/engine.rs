#![forbid(unsafe_code)]

//! The seam between the player and the actual audio output.
//!
//! An engine accepts commands synchronously. Starting playback is
//! asynchronous on real hosts (a browser resolves or rejects a promise), so
//! the outcome is reported back to the player as a [`PlaybackSignal`].

use serde::Serialize;

use crate::track::Track;

/// Reasons an engine refuses a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The host forbids starting audio without a user gesture.
    #[error("playback not allowed: {0}")]
    NotAllowed(String),
    /// The source could not be decoded or fetched.
    #[error("unsupported source {src:?}")]
    Unsupported { src: String },
    /// Any other engine failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Asynchronous outcome reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// A previously requested start succeeded.
    Ready,
    /// A previously requested start was refused.
    Rejected(PlaybackError),
    /// The current track played to its end.
    Ended,
}

/// Audio output driven by the player.
pub trait PlaybackEngine {
    /// Point the output at `track` and rewind.
    fn load(&mut self, track: &Track) -> Result<(), PlaybackError>;

    /// Request playback of the loaded source. Success is confirmed later by
    /// [`PlaybackSignal::Ready`]; an immediate `Err` counts as a rejection.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pause output, keeping the position.
    fn pause(&mut self);

    /// Set output volume in [0, 1].
    fn set_volume(&mut self, volume: f32);
}

impl<E: PlaybackEngine + ?Sized> PlaybackEngine for Box<E> {
    fn load(&mut self, track: &Track) -> Result<(), PlaybackError> {
        (**self).load(track)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume);
    }
}

/// A command received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum EngineCall {
    Load { src: String },
    Play,
    Pause,
    SetVolume { volume: f32 },
}

/// An engine that only records commands. Used by headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    refuse_play: Option<PlaybackError>,
    volume: f32,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `play` fail synchronously with `err`.
    #[must_use]
    pub fn refusing(err: PlaybackError) -> Self {
        Self {
            refuse_play: Some(err),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Take the recorded calls.
    pub fn drain_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    /// Last volume written.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl PlaybackEngine for RecordingEngine {
    fn load(&mut self, track: &Track) -> Result<(), PlaybackError> {
        self.calls.push(EngineCall::Load {
            src: track.src.clone(),
        });
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.calls.push(EngineCall::Play);
        match &self.refuse_play {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.calls.push(EngineCall::Pause);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.calls.push(EngineCall::SetVolume { volume });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut engine = RecordingEngine::new();
        engine.load(&Track::new("A", "B", "a.mp3")).unwrap();
        engine.set_volume(0.0);
        engine.play().unwrap();
        engine.pause();
        assert_eq!(
            engine.drain_calls(),
            vec![
                EngineCall::Load { src: "a.mp3".into() },
                EngineCall::SetVolume { volume: 0.0 },
                EngineCall::Play,
                EngineCall::Pause,
            ]
        );
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn refusing_engine_errors_on_play() {
        let mut engine = RecordingEngine::refusing(PlaybackError::NotAllowed("gesture".into()));
        assert_eq!(
            engine.play(),
            Err(PlaybackError::NotAllowed("gesture".into()))
        );
    }

    #[test]
    fn boxed_engine_forwards() {
        let mut engine: Box<RecordingEngine> = Box::default();
        engine.set_volume(0.4);
        assert_eq!(engine.volume(), 0.4);
    }

    #[test]
    fn error_messages() {
        let err = PlaybackError::Unsupported { src: "x.ogg".into() };
        assert_eq!(err.to_string(), "unsupported source \"x.ogg\"");
    }
}
