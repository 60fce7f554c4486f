#![forbid(unsafe_code)]

//! Transport state machine.
//!
//! ```text
//! Stopped --play/select--> Loading --Ready--> FadingIn --done--> Playing
//! Playing --pause--> FadingOut --done--> Stopped
//! Playing --next/prev/select/Ended--> FadingOut --done--> Loading(i) --> ...
//! Loading --pause--> Stopped
//! Loading --Rejected--> Stopped
//! ```
//!
//! While a fade runs every transport request is ignored; a volume change
//! only updates the preferred level used by the next fade-in.

use std::time::Duration;

use serde::Serialize;

use crate::engine::{PlaybackEngine, PlaybackError, PlaybackSignal};
use crate::fade::{FadeOptions, FadeTask, clamp_volume};
use crate::track::{Playlist, Track};

/// Coarse transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Stopped,
    /// Waiting for the engine to confirm a start.
    Loading,
    Playing,
    FadingIn,
    FadingOut,
}

/// Observable change for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Highlight `index` in the playlist and show its metadata.
    TrackChanged {
        index: usize,
        title: String,
        artist: String,
    },
    /// Play/pause iconography.
    PlayingChanged { playing: bool },
    /// Output volume written to the engine.
    VolumeChanged { volume: f32 },
    /// The engine refused to start.
    PlaybackRejected { reason: String },
    /// The player panel was shown or hidden.
    PanelToggled { open: bool },
}

/// What to do once a fade-out completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterFade {
    Stop,
    Load(usize),
}

/// Playlist transport with fades, driving a [`PlaybackEngine`].
#[derive(Debug)]
pub struct AudioPlayer<E> {
    engine: E,
    playlist: Playlist,
    fade_options: FadeOptions,
    index: usize,
    state: PlayerState,
    playing: bool,
    volume: f32,
    preferred_volume: f32,
    fade: Option<FadeTask>,
    after_fade: Option<AfterFade>,
    loaded: Option<usize>,
    panel_open: bool,
    events: Vec<PlayerEvent>,
}

impl<E: PlaybackEngine> AudioPlayer<E> {
    /// Create a stopped player positioned on the first track.
    ///
    /// `preferred_volume` is the level fades in to (the volume slider value).
    pub fn new(engine: E, playlist: Playlist, fade_options: FadeOptions, preferred_volume: f32) -> Self {
        Self {
            engine,
            playlist,
            fade_options,
            index: 0,
            state: PlayerState::Stopped,
            playing: false,
            volume: 0.0,
            preferred_volume: clamp_volume(preferred_volume),
            fade: None,
            after_fade: None,
            loaded: None,
            panel_open: false,
            events: Vec::new(),
        }
    }

    // -- accessors ----------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// The playing flag shown by the play/pause control.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether a fade holds the transport lock.
    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.index)
    }

    /// Current output volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Level the next fade-in ends on.
    #[must_use]
    pub fn preferred_volume(&self) -> f32 {
        self.preferred_volume
    }

    #[must_use]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    /// Whether any source has been handed to the engine yet.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.loaded.is_some()
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Take queued events in emission order.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Time until the active fade's next write.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.fade.as_ref().and_then(FadeTask::next_due)
    }

    // -- transport ----------------------------------------------------------

    /// Start or resume the current track.
    pub fn play(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        match self.state {
            PlayerState::Stopped if self.loaded == Some(self.index) => self.request_start(),
            PlayerState::Stopped => self.load(self.index, true),
            other => {
                keepsake_core::debug!(state = ?other, "play ignored");
            }
        }
    }

    /// Fade out and stop. Cancels a pending start.
    pub fn pause(&mut self) {
        match self.state {
            PlayerState::Playing => self.fade_out(AfterFade::Stop),
            PlayerState::Loading => {
                self.engine.pause();
                self.set_state(PlayerState::Stopped);
                self.set_playing(false);
            }
            other => {
                keepsake_core::debug!(state = ?other, "pause ignored");
            }
        }
    }

    /// Pause when the playing flag is set, play otherwise.
    ///
    /// Returns `false` when the request was ignored: an empty playlist, a
    /// start already pending, or a fade holding the transport lock.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            let accepted = matches!(self.state, PlayerState::Playing | PlayerState::Loading);
            self.pause();
            accepted
        } else {
            let accepted = !self.playlist.is_empty() && self.state == PlayerState::Stopped;
            self.play();
            accepted
        }
    }

    /// Advance to the following track, wrapping to the first.
    pub fn next(&mut self) {
        self.change_track(self.index as isize + 1, false);
    }

    /// Go back to the preceding track, wrapping to the last.
    pub fn prev(&mut self) {
        self.change_track(self.index as isize - 1, false);
    }

    /// Jump to `index` (wrapped) and start playing it.
    pub fn select(&mut self, index: isize) {
        self.change_track(index, true);
    }

    /// Set the preferred volume. Written through immediately unless a fade
    /// is running.
    pub fn set_volume(&mut self, volume: f32) {
        self.preferred_volume = clamp_volume(volume);
        if self.fade.is_none() {
            self.write_volume(self.preferred_volume);
        } else {
            keepsake_core::trace!(volume = self.preferred_volume, "volume deferred until fade ends");
        }
    }

    /// Show or hide the player panel. The first opening starts the first
    /// track if nothing has been loaded yet.
    pub fn toggle_panel(&mut self) {
        self.panel_open = !self.panel_open;
        self.events.push(PlayerEvent::PanelToggled {
            open: self.panel_open,
        });
        if self.panel_open && self.loaded.is_none() && !self.playlist.is_empty() {
            self.load(0, true);
        }
    }

    /// Hide the panel if shown.
    pub fn close_panel(&mut self) {
        if self.panel_open {
            self.panel_open = false;
            self.events.push(PlayerEvent::PanelToggled { open: false });
        }
    }

    /// Apply an asynchronous engine outcome.
    pub fn on_signal(&mut self, signal: PlaybackSignal) {
        match (signal, self.state) {
            (PlaybackSignal::Ready, PlayerState::Loading) => {
                self.set_playing(true);
                self.set_state(PlayerState::FadingIn);
                self.fade = Some(FadeTask::new(self.volume, self.preferred_volume, self.fade_options));
            }
            (PlaybackSignal::Rejected(err), PlayerState::Loading) => self.reject(err),
            (PlaybackSignal::Ended, PlayerState::Playing) => self.next(),
            (signal, state) => {
                keepsake_core::debug!(?signal, ?state, "stale playback signal");
            }
        }
    }

    /// Advance the active fade by `dt`, writing every volume step that
    /// became due and running the completion action.
    pub fn advance(&mut self, dt: Duration) {
        let (writes, done) = match self.fade.as_mut() {
            Some(fade) => (fade.advance(dt), fade.is_done()),
            None => return,
        };
        for v in writes {
            self.write_volume(v);
        }
        if done {
            self.fade = None;
            self.finish_fade();
        }
    }

    /// Cancel any running fade, pause the engine and reset to `Stopped`.
    pub fn stop(&mut self) {
        if let Some(fade) = self.fade.as_mut() {
            fade.cancel();
        }
        self.fade = None;
        self.after_fade = None;
        if self.state != PlayerState::Stopped {
            self.engine.pause();
            self.set_state(PlayerState::Stopped);
        }
        self.set_playing(false);
    }

    // -- internals ----------------------------------------------------------

    fn change_track(&mut self, target: isize, autoplay: bool) {
        let Some(index) = self.playlist.wrap(target) else {
            return;
        };
        match self.state {
            PlayerState::Playing => self.fade_out(AfterFade::Load(index)),
            PlayerState::Loading => self.load(index, true),
            PlayerState::Stopped => self.load(index, autoplay),
            PlayerState::FadingIn | PlayerState::FadingOut => {
                keepsake_core::debug!(requested = index, "track change ignored during fade");
            }
        }
    }

    fn load(&mut self, index: usize, autoplay: bool) {
        let Some(track) = self.playlist.get(index) else {
            return;
        };
        self.index = index;
        let track = track.clone();
        if let Err(err) = self.engine.load(&track) {
            self.loaded = None;
            self.reject(err);
            return;
        }
        self.loaded = Some(index);
        keepsake_core::debug!(index, title = %track.title, autoplay, "track loaded");
        self.events.push(PlayerEvent::TrackChanged {
            index,
            title: track.title,
            artist: track.artist,
        });
        self.write_volume(0.0);
        if autoplay {
            self.request_start();
        } else {
            self.set_state(PlayerState::Stopped);
        }
    }

    fn request_start(&mut self) {
        self.set_state(PlayerState::Loading);
        if let Err(err) = self.engine.play() {
            self.reject(err);
        }
    }

    fn reject(&mut self, err: PlaybackError) {
        keepsake_core::warn!(error = %err, index = self.index, "playback rejected");
        self.fade = None;
        self.after_fade = None;
        self.set_state(PlayerState::Stopped);
        self.set_playing(false);
        self.events.push(PlayerEvent::PlaybackRejected {
            reason: err.to_string(),
        });
    }

    fn fade_out(&mut self, after: AfterFade) {
        self.after_fade = Some(after);
        self.fade = Some(FadeTask::new(self.volume, 0.0, self.fade_options));
        self.set_state(PlayerState::FadingOut);
    }

    fn finish_fade(&mut self) {
        match self.state {
            PlayerState::FadingIn => self.set_state(PlayerState::Playing),
            PlayerState::FadingOut => {
                self.engine.pause();
                match self.after_fade.take() {
                    Some(AfterFade::Load(index)) => self.load(index, true),
                    Some(AfterFade::Stop) | None => {
                        self.set_state(PlayerState::Stopped);
                        self.set_playing(false);
                    }
                }
            }
            _ => {}
        }
    }

    fn write_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.volume = volume;
        self.engine.set_volume(volume);
        self.events.push(PlayerEvent::VolumeChanged { volume });
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.events.push(PlayerEvent::PlayingChanged { playing });
        }
    }

    fn set_state(&mut self, next: PlayerState) {
        if self.state != next {
            keepsake_core::debug!(from = ?self.state, to = ?next, "player state");
            self.state = next;
        }
    }
}
