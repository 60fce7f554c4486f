#![forbid(unsafe_code)]

//! Page inputs and outputs.

use keepsake_audio::{PlaybackSignal, PlayerEvent};
use keepsake_core::event::KeyEvent;
use keepsake_forms::{FieldError, RsvpField, RsvpSubmission};
use keepsake_motion::{CountdownUpdate, IntersectionEntry, LightboxEvent};
use serde::Serialize;

/// A clickable control on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    OpenInvitation,
    TogglePlay,
    NextTrack,
    PrevTrack,
    /// A playlist entry.
    SelectTrack(usize),
    TogglePanel,
    ClosePanel,
    /// The volume slider moved to a value in [0, 1].
    SetVolume(f32),
    /// A gallery thumbnail.
    GalleryItem(usize),
    LightboxClose,
    LightboxPrev,
    LightboxNext,
}

/// A layer whose background follows the scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxProbe {
    pub id: String,
    /// Element top relative to the viewport.
    pub rect_top: f32,
    pub rect_height: f32,
}

/// Document scroll geometry at one scroll event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub viewport_height: f32,
    pub parallax: Vec<ParallaxProbe>,
}

/// Everything the host can tell the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The document and its assets finished loading.
    Load,
    Click(Control),
    /// A touch anywhere on the page.
    Touch,
    Key(KeyEvent),
    /// A key pressed while a gallery thumbnail had focus.
    GalleryKey { index: usize, key: KeyEvent },
    Intersections(Vec<IntersectionEntry>),
    Scroll(ScrollMetrics),
    Resize { width: f32, height: f32 },
    /// The tab became visible or hidden.
    Visibility { visible: bool },
    Playback(PlaybackSignal),
    FieldInput { field: RsvpField, value: String },
    FieldBlur(RsvpField),
    Submit,
}

impl PageEvent {
    /// Whether this is a direct user gesture (click, touch or key).
    #[must_use]
    pub fn is_user_gesture(&self) -> bool {
        matches!(
            self,
            PageEvent::Click(_) | PageEvent::Touch | PageEvent::Key(_) | PageEvent::GalleryKey { .. }
        )
    }
}

/// A visible consequence for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Start the loading screen's exit transition.
    LoadingHidden,
    /// Remove the loading screen entirely.
    LoadingRemoved,
    /// Page scrolling was locked or unlocked.
    ScrollLock { locked: bool },
    /// Show the main content below the cover.
    MainContentShown,
    /// Smooth-scroll `target` to the top of the viewport.
    ScrollTo { target: String },
    /// Report intersections for these targets.
    ObserveTargets { ids: Vec<String> },
    /// Play the reveal transition on `id`.
    Revealed { id: String },
    Countdown { update: CountdownUpdate },
    Player { event: PlayerEvent },
    /// Autoplay was refused; a gesture may be needed.
    PlaybackBlocked { reason: String },
    Lightbox { event: LightboxEvent },
    /// Scroll progress bar width in percent.
    Progress { percent: f32 },
    /// Background Y position of a parallax layer in percent.
    Parallax { id: String, position: f32 },
    /// The particle canvas should be repainted.
    ParticlesFrame { frame: u64 },
    /// Show (`Some`) or clear (`None`) the inline error of a field.
    FieldError {
        field: RsvpField,
        message: Option<String>,
    },
    RsvpBlocked { errors: Vec<FieldError> },
    /// Replace the form with the success panel.
    RsvpSubmitted { record: RsvpSubmission },
}
