#![forbid(unsafe_code)]

//! Presentation hooks.
//!
//! A hook is a place in the host's presentation layer that a component
//! needs in order to run: the countdown slots, the playlist, the gallery.
//! The host declares which hooks its page actually has; components whose
//! hooks are missing are skipped at init with a warning instead of failing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic presentation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    LoadingScreen,
    OpenInvitation,
    MainContent,
    ProgressBar,
    Parallax,
    RevealTargets,
    CountdownSlots,
    Transport,
    Playlist,
    VolumeSlider,
    Gallery,
    Lightbox,
    ParticlesCanvas,
    RsvpForm,
}

impl Hook {
    pub const ALL: [Hook; 14] = [
        Hook::LoadingScreen,
        Hook::OpenInvitation,
        Hook::MainContent,
        Hook::ProgressBar,
        Hook::Parallax,
        Hook::RevealTargets,
        Hook::CountdownSlots,
        Hook::Transport,
        Hook::Playlist,
        Hook::VolumeSlider,
        Hook::Gallery,
        Hook::Lightbox,
        Hook::ParticlesCanvas,
        Hook::RsvpForm,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Hook::LoadingScreen => "loading_screen",
            Hook::OpenInvitation => "open_invitation",
            Hook::MainContent => "main_content",
            Hook::ProgressBar => "progress_bar",
            Hook::Parallax => "parallax",
            Hook::RevealTargets => "reveal_targets",
            Hook::CountdownSlots => "countdown_slots",
            Hook::Transport => "transport",
            Hook::Playlist => "playlist",
            Hook::VolumeSlider => "volume_slider",
            Hook::Gallery => "gallery",
            Hook::Lightbox => "lightbox",
            Hook::ParticlesCanvas => "particles_canvas",
            Hook::RsvpForm => "rsvp_form",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hooks a page provides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookSet(BTreeSet<Hook>);

impl HookSet {
    /// No hooks at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every hook.
    #[must_use]
    pub fn all() -> Self {
        Hook::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn with(mut self, hook: Hook) -> Self {
        self.0.insert(hook);
        self
    }

    #[must_use]
    pub fn without(mut self, hook: Hook) -> Self {
        self.0.remove(&hook);
        self
    }

    #[must_use]
    pub fn contains(&self, hook: Hook) -> bool {
        self.0.contains(&hook)
    }

    /// The subset of `required` that is absent.
    #[must_use]
    pub fn missing(&self, required: &[Hook]) -> Vec<Hook> {
        required.iter().copied().filter(|h| !self.contains(*h)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Hook> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Hook> for HookSet {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
