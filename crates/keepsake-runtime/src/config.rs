#![forbid(unsafe_code)]

//! Page configuration.
//!
//! Everything the page needs to know about its content and timing comes
//! from one JSON document. Every section is optional and falls back to the
//! defaults below, so `{}` is a valid (if empty) page.
//!
//! ```json
//! {
//!   "countdown": { "target": "2027-02-14T10:00:00+01:00" },
//!   "playlist": [{ "title": "Perfect", "artist": "Ed Sheeran", "src": "perfect.mp3" }],
//!   "gallery": [{ "caption": "First date", "visual": "photo-1.jpg" }],
//!   "fade": { "duration_ms": 800, "steps": 30 },
//!   "music": { "storage_key": "music-enabled", "autoplay_on_open": true }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use keepsake_audio::{FadeOptions, Playlist};
use keepsake_motion::countdown::{self, CountdownEngine, CountdownError, DEFAULT_MESSAGE};
use keepsake_motion::{GalleryItem, ParticleOptions, RevealOptions, RevealSpec};
use serde::Deserialize;

/// Errors raised while loading or checking a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Countdown(#[from] CountdownError),
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

/// Countdown section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// RFC 3339 instant; an offset-less value is read as UTC.
    pub target: String,
    /// Shown once the target is reached.
    pub message: String,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            target: "2027-02-14T10:00:00+01:00".to_string(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

/// Music section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Key of the persisted "music enabled" flag.
    pub storage_key: String,
    /// Start the first track when the invitation is opened.
    pub autoplay_on_open: bool,
    /// Initial volume slider value.
    pub initial_volume: f32,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            storage_key: "music-enabled".to_string(),
            autoplay_on_open: true,
            initial_volume: 0.5,
        }
    }
}

/// Loading screen timings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Delay between the load signal and hiding.
    pub hide_delay_ms: u64,
    /// Hide at the latest this long after init.
    pub fallback_ms: u64,
    /// Delay between hiding and removal.
    pub remove_delay_ms: u64,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            hide_delay_ms: 600,
            fallback_ms: 3_000,
            remove_delay_ms: 700,
        }
    }
}

/// Invitation-open follow-ups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    /// Delay before reveal targets are re-scanned.
    pub rescan_delay_ms: u64,
    /// Delay before scrolling to `scroll_target`.
    pub scroll_delay_ms: u64,
    /// Section scrolled into view after opening.
    pub scroll_target: String,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            rescan_delay_ms: 100,
            scroll_delay_ms: 400,
            scroll_target: "couple".to_string(),
        }
    }
}

/// Initial viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// The whole page configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub countdown: CountdownConfig,
    pub playlist: Playlist,
    pub gallery: Vec<GalleryItem>,
    pub reveal: RevealOptions,
    pub reveal_targets: Vec<RevealSpec>,
    pub fade: FadeOptions,
    pub particles: ParticleOptions,
    pub music: MusicConfig,
    pub loading: LoadingConfig,
    pub invitation: InvitationConfig,
    pub viewport: ViewportConfig,
}

impl PageConfig {
    /// Parse and check a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and check a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        keepsake_core::debug!(
            path = %path.display(),
            tracks = config.playlist.len(),
            gallery = config.gallery.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        countdown::parse_target(&self.countdown.target)?;
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            return Err(ConfigError::InvalidOption {
                option: "reveal.threshold",
                reason: format!("{} is outside [0, 1]", self.reveal.threshold),
            });
        }
        if self.fade.steps == 0 {
            return Err(ConfigError::InvalidOption {
                option: "fade.steps",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.music.initial_volume) {
            return Err(ConfigError::InvalidOption {
                option: "music.initial_volume",
                reason: format!("{} is outside [0, 1]", self.music.initial_volume),
            });
        }
        if self.music.storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "music.storage_key",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build the countdown engine described by this configuration.
    pub fn countdown_engine(&self) -> Result<CountdownEngine, ConfigError> {
        Ok(CountdownEngine::parse(&self.countdown.target)?.with_message(self.countdown.message.clone()))
    }
}

impl LoadingConfig {
    pub(crate) fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub(crate) fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    pub(crate) fn remove_delay(&self) -> Duration {
        Duration::from_millis(self.remove_delay_ms)
    }
}

impl InvitationConfig {
    pub(crate) fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }

    pub(crate) fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}
