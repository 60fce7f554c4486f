#![forbid(unsafe_code)]

//! Scripted page visits.
//!
//! A scenario is a JSON list of steps: host events and virtual-time
//! advances. Running it against a [`PageConfig`] produces a transcript of
//! every effect and engine call, stamped with the virtual time it happened
//! at, so a visit can be checked into a repository and diffed.
//!
//! ```json
//! {
//!   "start": "2027-02-13T09:00:00Z",
//!   "steps": [
//!     { "do": "load" },
//!     { "do": "advance", "ms": 600 },
//!     { "do": "click", "control": "open_invitation" },
//!     { "do": "key", "key": "ArrowRight" },
//!     { "do": "input", "field": "name", "value": "Ana" },
//!     { "do": "submit" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use keepsake_audio::{EngineCall, PlaybackError, PlaybackSignal, RecordingEngine};
use keepsake_core::clock::ManualClock;
use keepsake_core::event::{KeyCode, KeyEvent};
use keepsake_forms::RsvpField;
use keepsake_motion::IntersectionEntry;
use keepsake_runtime::{
    Control, Effect, Hook, HookSet, Page, PageConfig, PageEvent, ParallaxProbe, ScrollMetrics,
    StorageBackend,
};
use serde::{Deserialize, Serialize};

/// Errors raised while loading or running a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid start instant {input:?}: {source}")]
    Start {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("step {index}: unknown key {key:?}")]
    UnknownKey { index: usize, key: String },
}

/// A clickable control, as written in scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSpec {
    OpenInvitation,
    TogglePlay,
    NextTrack,
    PrevTrack,
    SelectTrack(usize),
    TogglePanel,
    ClosePanel,
    SetVolume(f32),
    GalleryItem(usize),
    LightboxClose,
    LightboxPrev,
    LightboxNext,
}

impl From<ControlSpec> for Control {
    fn from(spec: ControlSpec) -> Self {
        match spec {
            ControlSpec::OpenInvitation => Control::OpenInvitation,
            ControlSpec::TogglePlay => Control::TogglePlay,
            ControlSpec::NextTrack => Control::NextTrack,
            ControlSpec::PrevTrack => Control::PrevTrack,
            ControlSpec::SelectTrack(i) => Control::SelectTrack(i),
            ControlSpec::TogglePanel => Control::TogglePanel,
            ControlSpec::ClosePanel => Control::ClosePanel,
            ControlSpec::SetVolume(v) => Control::SetVolume(v),
            ControlSpec::GalleryItem(i) => Control::GalleryItem(i),
            ControlSpec::LightboxClose => Control::LightboxClose,
            ControlSpec::LightboxPrev => Control::LightboxPrev,
            ControlSpec::LightboxNext => Control::LightboxNext,
        }
    }
}

/// Engine outcome reported by the scripted host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSpec {
    Ready,
    Ended,
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntrySpec {
    pub id: String,
    #[serde(default = "default_ratio")]
    pub ratio: f32,
}

fn default_ratio() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeSpec {
    pub id: String,
    pub top: f32,
    pub height: f32,
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum Step {
    Load,
    Click {
        control: ControlSpec,
    },
    Touch,
    /// A DOM key name such as `"Escape"` or `"ArrowLeft"`.
    Key {
        key: String,
    },
    GalleryKey {
        index: usize,
        key: String,
    },
    /// Targets entering the viewport.
    Intersect {
        entries: Vec<EntrySpec>,
    },
    Scroll {
        top: f32,
        height: f32,
        viewport: f32,
        #[serde(default)]
        parallax: Vec<ProbeSpec>,
    },
    Resize {
        width: f32,
        height: f32,
    },
    Visibility {
        visible: bool,
    },
    Playback {
        signal: SignalSpec,
    },
    Input {
        field: RsvpField,
        value: String,
    },
    Blur {
        field: RsvpField,
    },
    Submit,
    Advance {
        ms: u64,
    },
}

/// A scripted visit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    /// Wall-clock instant the visit starts at. Defaults to now.
    #[serde(default)]
    pub start: Option<String>,
    /// Hooks the page provides. Defaults to every hook.
    #[serde(default)]
    pub hooks: Option<HookSet>,
    /// Make the engine refuse every start with this reason.
    #[serde(default)]
    pub refuse_playback: Option<String>,
    /// Confirm every successful start with a ready signal.
    #[serde(default = "default_true")]
    pub auto_ready: bool,
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    fn start_instant(&self) -> Result<DateTime<Utc>, ScenarioError> {
        match &self.start {
            None => Ok(Utc::now()),
            Some(input) => DateTime::parse_from_rfc3339(input)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|source| ScenarioError::Start {
                    input: input.clone(),
                    source,
                }),
        }
    }
}

/// What a transcript line records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Effect(Effect),
    Engine(EngineCall),
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// Virtual milliseconds since the visit started.
    pub at_ms: u64,
    #[serde(flatten)]
    pub record: Record,
}

/// Transcript filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Keep particle repaint effects (one every display frame).
    pub include_frames: bool,
}

struct Runner {
    page: Page<RecordingEngine>,
    clock: ManualClock,
    auto_ready: bool,
    options: RunOptions,
    transcript: Vec<TranscriptEntry>,
}

impl Runner {
    fn record(&mut self) {
        let at_ms = self.page.elapsed().as_millis() as u64;
        let mut confirm = false;
        if let Some(player) = self.page.player_mut() {
            for call in player.engine_mut().drain_calls() {
                confirm |= call == EngineCall::Play;
                self.transcript.push(TranscriptEntry {
                    at_ms,
                    record: Record::Engine(call),
                });
            }
        }
        for effect in self.page.drain_effects() {
            if matches!(effect, Effect::ParticlesFrame { .. }) && !self.options.include_frames {
                continue;
            }
            if matches!(effect, Effect::PlaybackBlocked { .. }) {
                confirm = false;
            }
            self.transcript.push(TranscriptEntry {
                at_ms,
                record: Record::Effect(effect),
            });
        }
        if confirm && self.auto_ready {
            self.page.handle(PageEvent::Playback(PlaybackSignal::Ready));
            self.record();
        }
    }

    fn advance(&mut self, total: Duration) {
        let mut left = total;
        while !left.is_zero() {
            let step = self.page.next_deadline().map_or(left, |d| d.min(left));
            let step = if step.is_zero() { left } else { step };
            self.clock.advance(step);
            self.page.advance(step);
            left -= step;
            self.record();
        }
    }
}

fn key_event(index: usize, name: &str) -> Result<KeyEvent, ScenarioError> {
    KeyCode::from_key_name(name)
        .map(KeyEvent::new)
        .ok_or_else(|| ScenarioError::UnknownKey {
            index,
            key: name.to_string(),
        })
}

fn to_event(index: usize, step: &Step) -> Result<Option<PageEvent>, ScenarioError> {
    let event = match step {
        Step::Load => PageEvent::Load,
        Step::Click { control } => PageEvent::Click((*control).into()),
        Step::Touch => PageEvent::Touch,
        Step::Key { key } => PageEvent::Key(key_event(index, key)?),
        Step::GalleryKey { index: item, key } => PageEvent::GalleryKey {
            index: *item,
            key: key_event(index, key)?,
        },
        Step::Intersect { entries } => PageEvent::Intersections(
            entries
                .iter()
                .map(|e| IntersectionEntry::new(e.id.clone(), e.ratio > 0.0, e.ratio))
                .collect(),
        ),
        Step::Scroll {
            top,
            height,
            viewport,
            parallax,
        } => PageEvent::Scroll(ScrollMetrics {
            scroll_top: *top,
            scroll_height: *height,
            viewport_height: *viewport,
            parallax: parallax
                .iter()
                .map(|p| ParallaxProbe {
                    id: p.id.clone(),
                    rect_top: p.top,
                    rect_height: p.height,
                })
                .collect(),
        }),
        Step::Resize { width, height } => PageEvent::Resize {
            width: *width,
            height: *height,
        },
        Step::Visibility { visible } => PageEvent::Visibility { visible: *visible },
        Step::Playback { signal } => PageEvent::Playback(match signal {
            SignalSpec::Ready => PlaybackSignal::Ready,
            SignalSpec::Ended => PlaybackSignal::Ended,
            SignalSpec::Rejected(reason) => {
                PlaybackSignal::Rejected(PlaybackError::NotAllowed(reason.clone()))
            }
        }),
        Step::Input { field, value } => PageEvent::FieldInput {
            field: *field,
            value: value.clone(),
        },
        Step::Blur { field } => PageEvent::FieldBlur(*field),
        Step::Submit => PageEvent::Submit,
        Step::Advance { .. } => return Ok(None),
    };
    Ok(Some(event))
}

/// Run `scenario` against a page built from `config`.
pub fn run(
    config: PageConfig,
    scenario: &Scenario,
    storage: Box<dyn StorageBackend>,
    options: RunOptions,
) -> Result<Vec<TranscriptEntry>, ScenarioError> {
    let start = scenario.start_instant()?;
    let clock = ManualClock::new(start);
    let engine = match &scenario.refuse_playback {
        Some(reason) => RecordingEngine::refusing(PlaybackError::NotAllowed(reason.clone())),
        None => RecordingEngine::new(),
    };
    let hooks = scenario.hooks.clone().unwrap_or_else(HookSet::all);
    if !hooks.contains(Hook::Transport) {
        tracing::debug!("scenario page has no transport");
    }
    let page = Page::new(config, hooks, engine, storage, Box::new(clock.clone()));
    let mut runner = Runner {
        page,
        clock,
        auto_ready: scenario.auto_ready,
        options,
        transcript: Vec::new(),
    };
    runner.page.init();
    runner.record();

    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::trace!(index, ?step, "scenario step");
        match to_event(index, step)? {
            Some(event) => {
                runner.page.handle(event);
                runner.record();
            }
            None => {
                if let Step::Advance { ms } = step {
                    runner.advance(Duration::from_millis(*ms));
                }
            }
        }
    }
    tracing::info!(
        steps = scenario.steps.len(),
        records = runner.transcript.len(),
        elapsed_ms = runner.page.elapsed().as_millis() as u64,
        "scenario finished"
    );
    Ok(runner.transcript)
}
