#![forbid(unsafe_code)]

//! Tracks and the ordered playlist.

use serde::{Deserialize, Serialize};

/// An immutable playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Source URL or path handed to the engine.
    pub src: String,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            src: src.into(),
        }
    }

    /// "Title - Artist" as shown in the now-playing line.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// Ordered, immutable sequence of tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Wrap a possibly negative or overflowing index into range.
    ///
    /// Returns `None` for an empty playlist.
    #[must_use]
    pub fn wrap(&self, index: isize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some(index.rem_euclid(self.tracks.len() as isize) as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

impl FromIterator<Track> for Playlist {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
