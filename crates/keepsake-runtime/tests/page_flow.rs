//! End-to-end page scenarios driven through virtual time.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use keepsake_audio::{
    EngineCall, PlaybackError, PlaybackSignal, PlayerEvent, PlayerState, RecordingEngine,
};
use keepsake_core::clock::ManualClock;
use keepsake_core::event::{KeyCode, KeyEvent};
use keepsake_forms::rsvp::{EMAIL_INVALID, NAME_REQUIRED};
use keepsake_forms::RsvpField;
use keepsake_motion::countdown::{CountdownUpdate, TimeUnit};
use keepsake_motion::{IntersectionEntry, LightboxEvent};
use keepsake_runtime::{
    Control, Effect, Hook, HookSet, LoadingPhase, MemoryStorage, Page, PageConfig, PageEvent,
    ParallaxProbe, ScrollMetrics,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const CONFIG: &str = r#"{
    "countdown": { "target": "2027-02-14T10:00:00Z" },
    "playlist": [
        { "title": "Perfect", "artist": "Ed Sheeran", "src": "perfect.mp3" },
        { "title": "All of Me", "artist": "John Legend", "src": "all-of-me.mp3" },
        { "title": "A Thousand Years", "artist": "Christina Perri", "src": "a-thousand-years.mp3" }
    ],
    "gallery": [
        { "caption": "First date", "visual": "1.jpg" },
        { "caption": "Paris", "visual": "2.jpg" },
        { "caption": "Proposal", "visual": "3.jpg" },
        { "caption": "Beach", "visual": "4.jpg" },
        { "caption": "Family", "visual": "5.jpg" },
        { "caption": "Home", "visual": "6.jpg" }
    ],
    "reveal_targets": [
        { "id": "hero", "intro": true },
        { "id": "story" },
        { "id": "couple" }
    ],
    "fade": { "duration_ms": 300, "steps": 3 }
}"#;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 2, 13, 9, 58, 59).unwrap()
}

fn config() -> PageConfig {
    PageConfig::from_json(CONFIG).unwrap()
}

fn page_with(config: PageConfig, hooks: HookSet, engine: RecordingEngine) -> (Page<RecordingEngine>, ManualClock) {
    let clock = ManualClock::new(start());
    let mut page = Page::new(
        config,
        hooks,
        engine,
        Box::new(MemoryStorage::new()),
        Box::new(clock.clone()),
    );
    page.init();
    (page, clock)
}

fn page(hooks: HookSet) -> (Page<RecordingEngine>, ManualClock) {
    page_with(config(), hooks, RecordingEngine::new())
}

/// Advance clock and page together, stopping at every deadline.
fn run_for(page: &mut Page<RecordingEngine>, clock: &ManualClock, total: Duration) {
    let mut left = total;
    while !left.is_zero() {
        let step = page.next_deadline().map_or(left, |d| d.min(left));
        let step = if step.is_zero() { left } else { step };
        clock.advance(step);
        page.advance(step);
        left -= step;
    }
}

fn no_effects() -> Vec<Effect> {
    Vec::new()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn press(code: KeyCode) -> PageEvent {
    PageEvent::Key(KeyEvent::new(code))
}

#[test]
fn init_locks_scroll_reveals_intro_and_starts_countdown() {
    let (mut page, _clock) = page(HookSet::all().without(Hook::ParticlesCanvas));
    let effects = page.drain_effects();
    assert_eq!(
        effects[..3].to_vec(),
        vec![
            Effect::ScrollLock { locked: true },
            Effect::Revealed { id: "hero".into() },
            Effect::ObserveTargets {
                ids: vec!["story".into(), "couple".into()]
            },
        ]
    );
    let countdown: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Countdown {
                update: CountdownUpdate::DigitChanged { unit, value, .. },
            } => Some((*unit, *value)),
            _ => None,
        })
        .collect();
    assert_eq!(
        countdown,
        vec![
            (TimeUnit::Days, 1),
            (TimeUnit::Hours, 0),
            (TimeUnit::Minutes, 1),
            (TimeUnit::Seconds, 1),
        ]
    );
    assert!(page.is_scroll_locked());
    assert_eq!(page.loading_phase(), LoadingPhase::Visible);
}

#[test]
fn loading_screen_hides_after_load_then_removes() {
    let (mut page, clock) = page(HookSet::empty().with(Hook::LoadingScreen));
    page.handle(PageEvent::Load);
    run_for(&mut page, &clock, ms(599));
    assert_eq!(page.drain_effects(), no_effects());
    run_for(&mut page, &clock, ms(1));
    assert_eq!(page.drain_effects(), vec![Effect::LoadingHidden]);
    run_for(&mut page, &clock, ms(700));
    assert_eq!(page.drain_effects(), vec![Effect::LoadingRemoved]);
    run_for(&mut page, &clock, ms(5_000));
    assert_eq!(page.drain_effects(), no_effects());
    assert_eq!(page.loading_phase(), LoadingPhase::Removed);
}

#[test]
fn loading_screen_fallback_without_load() {
    let (mut page, clock) = page(HookSet::empty().with(Hook::LoadingScreen));
    run_for(&mut page, &clock, ms(2_999));
    assert_eq!(page.loading_phase(), LoadingPhase::Visible);
    run_for(&mut page, &clock, ms(1));
    assert_eq!(page.drain_effects(), vec![Effect::LoadingHidden]);
    page.handle(PageEvent::Load);
    run_for(&mut page, &clock, ms(700));
    assert_eq!(page.drain_effects(), vec![Effect::LoadingRemoved]);
}

#[test]
fn lightbox_close_keeps_invitation_lock() {
    let hooks = HookSet::empty()
        .with(Hook::OpenInvitation)
        .with(Hook::Gallery)
        .with(Hook::Lightbox);
    let (mut page, clock) = page(hooks);
    assert_eq!(page.drain_effects(), vec![Effect::ScrollLock { locked: true }]);

    page.handle(PageEvent::Click(Control::GalleryItem(2)));
    page.handle(press(KeyCode::Escape));
    let effects = page.drain_effects();
    assert!(matches!(effects[0], Effect::Lightbox { event: LightboxEvent::Opened { index: 2, .. } }));
    assert_eq!(effects[1], Effect::Lightbox { event: LightboxEvent::Closed });
    assert_eq!(effects.len(), 2);
    assert!(page.is_scroll_locked());

    page.handle(PageEvent::Click(Control::OpenInvitation));
    assert_eq!(page.drain_effects(), vec![Effect::ScrollLock { locked: false }]);
    run_for(&mut page, &clock, ms(400));
    assert_eq!(page.drain_effects(), vec![Effect::ScrollTo { target: "couple".into() }]);

    page.handle(PageEvent::Click(Control::GalleryItem(0)));
    page.handle(press(KeyCode::Left));
    page.handle(PageEvent::Click(Control::LightboxClose));
    let effects = page.drain_effects();
    assert!(matches!(effects[0], Effect::Lightbox { event: LightboxEvent::Opened { index: 0, .. } }));
    assert_eq!(effects[1], Effect::ScrollLock { locked: true });
    assert!(matches!(effects[2], Effect::Lightbox { event: LightboxEvent::Opened { index: 5, .. } }));
    assert_eq!(effects[3], Effect::Lightbox { event: LightboxEvent::Closed });
    assert_eq!(effects[4], Effect::ScrollLock { locked: false });
    assert!(!page.is_scroll_locked());
}

#[test]
fn opening_invitation_starts_first_track_with_fade_in() {
    let hooks = HookSet::empty()
        .with(Hook::OpenInvitation)
        .with(Hook::MainContent)
        .with(Hook::Transport);
    let (mut page, clock) = page(hooks);
    page.drain_effects();

    page.handle(PageEvent::Click(Control::OpenInvitation));
    assert_eq!(
        page.drain_effects(),
        vec![
            Effect::ScrollLock { locked: false },
            Effect::MainContentShown,
            Effect::Player {
                event: PlayerEvent::TrackChanged {
                    index: 0,
                    title: "Perfect".into(),
                    artist: "Ed Sheeran".into(),
                }
            },
            Effect::Player {
                event: PlayerEvent::VolumeChanged { volume: 0.0 }
            },
        ]
    );
    let player = page.player().unwrap();
    assert_eq!(
        player.engine().calls().to_vec(),
        vec![
            EngineCall::Load { src: "perfect.mp3".into() },
            EngineCall::SetVolume { volume: 0.0 },
            EngineCall::Play,
        ]
    );

    page.handle(PageEvent::Playback(PlaybackSignal::Ready));
    run_for(&mut page, &clock, ms(400));
    let effects = page.drain_effects();
    assert_eq!(
        effects[0],
        Effect::Player {
            event: PlayerEvent::PlayingChanged { playing: true }
        }
    );
    let volumes: Vec<f32> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Player {
                event: PlayerEvent::VolumeChanged { volume },
            } => Some(*volume),
            _ => None,
        })
        .collect();
    assert_eq!(volumes.len(), 3);
    assert_eq!(volumes.last().copied(), Some(0.5));
    assert!(effects.contains(&Effect::ScrollTo { target: "couple".into() }));
    assert!(page.player().unwrap().is_playing());
}

#[test]
fn first_gesture_starts_music_once_when_autoplay_on_open_is_off() {
    let mut config = config();
    config.music.autoplay_on_open = false;
    let hooks = HookSet::empty().with(Hook::OpenInvitation).with(Hook::Transport);
    let engine = RecordingEngine::refusing(PlaybackError::NotAllowed("no gesture yet".into()));
    let (mut page, _clock) = page_with(config, hooks, engine);
    page.drain_effects();

    // Locked pages never autoplay.
    page.handle(PageEvent::Touch);
    assert_eq!(page.drain_effects(), no_effects());

    page.handle(PageEvent::Click(Control::OpenInvitation));
    let effects = page.drain_effects();
    assert!(effects.contains(&Effect::PlaybackBlocked {
        reason: "playback not allowed: no gesture yet".into()
    }));

    page.handle(PageEvent::Touch);
    assert_eq!(page.drain_effects(), no_effects());
    let plays = page
        .player()
        .unwrap()
        .engine()
        .calls()
        .iter()
        .filter(|c| **c == EngineCall::Play)
        .count();
    assert_eq!(plays, 1);
}

#[test]
fn missing_hooks_degrade_without_effects() {
    let (mut page, clock) = page(HookSet::empty());
    assert!(page.is_invitation_open());
    page.handle(PageEvent::Click(Control::TogglePlay));
    page.handle(PageEvent::Click(Control::GalleryItem(1)));
    page.handle(PageEvent::Submit);
    page.handle(PageEvent::Intersections(vec![IntersectionEntry::new("story", true, 1.0)]));
    run_for(&mut page, &clock, ms(5_000));
    assert!(page.player().is_none());
    assert!(page.lightbox().is_none());
    assert_eq!(page.drain_effects(), no_effects());
}

#[test]
fn countdown_ticks_to_terminal_state_and_stops() {
    let mut config = config();
    config.countdown.target = "2027-02-13T09:59:01.500Z".into();
    let (mut page, clock) = page_with(
        config,
        HookSet::empty().with(Hook::CountdownSlots),
        RecordingEngine::new(),
    );
    assert_eq!(page.drain_effects().len(), 4);

    run_for(&mut page, &clock, ms(3_000));
    let effects = page.drain_effects();
    let seconds: Vec<u64> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Countdown {
                update: CountdownUpdate::DigitChanged { unit: TimeUnit::Seconds, value, .. },
            } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(seconds, vec![1, 0]);
    assert!(matches!(
        effects.last(),
        Some(Effect::Countdown { update: CountdownUpdate::Finished { .. } })
    ));
    assert_eq!(page.next_deadline(), None);
    assert!(page.countdown().unwrap().is_finished());
}

#[test]
fn intersections_reveal_once() {
    let (mut page, _clock) = page(HookSet::empty().with(Hook::RevealTargets));
    page.drain_effects();
    let batch = vec![
        IntersectionEntry::new("story", true, 0.5),
        IntersectionEntry::new("couple", true, 0.05),
        IntersectionEntry::new("story", true, 0.9),
    ];
    page.handle(PageEvent::Intersections(batch.clone()));
    assert_eq!(page.drain_effects(), vec![Effect::Revealed { id: "story".into() }]);
    page.handle(PageEvent::Intersections(batch));
    assert_eq!(page.drain_effects(), no_effects());
}

#[test]
fn scroll_updates_progress_and_parallax() {
    let (mut page, _clock) = page(HookSet::empty().with(Hook::ProgressBar).with(Hook::Parallax));
    let metrics = ScrollMetrics {
        scroll_top: 200.0,
        scroll_height: 1_800.0,
        viewport_height: 800.0,
        parallax: vec![ParallaxProbe {
            id: "hero".into(),
            rect_top: 300.0,
            rect_height: 200.0,
        }],
    };
    page.handle(PageEvent::Scroll(metrics.clone()));
    assert_eq!(
        page.drain_effects(),
        vec![
            Effect::Progress { percent: 20.0 },
            Effect::Parallax { id: "hero".into(), position: 50.0 },
        ]
    );
    page.handle(PageEvent::Scroll(metrics));
    assert_eq!(
        page.drain_effects(),
        vec![Effect::Parallax { id: "hero".into(), position: 50.0 }]
    );
}

#[test]
fn particle_frames_pause_while_hidden() {
    let (mut page, clock) = page(HookSet::empty().with(Hook::ParticlesCanvas));
    run_for(&mut page, &clock, ms(48));
    assert_eq!(
        page.drain_effects(),
        vec![
            Effect::ParticlesFrame { frame: 1 },
            Effect::ParticlesFrame { frame: 2 },
            Effect::ParticlesFrame { frame: 3 },
        ]
    );
    page.handle(PageEvent::Visibility { visible: false });
    run_for(&mut page, &clock, ms(200));
    assert_eq!(page.drain_effects(), no_effects());
    assert_eq!(page.next_deadline(), None);

    page.handle(PageEvent::Visibility { visible: true });
    page.handle(PageEvent::Resize { width: 320.0, height: 640.0 });
    run_for(&mut page, &clock, ms(16));
    assert_eq!(page.drain_effects(), vec![Effect::ParticlesFrame { frame: 4 }]);
    assert_eq!(page.particles().unwrap().size(), (320.0, 640.0));
}

#[test]
fn rsvp_blur_and_submit() {
    let (mut page, clock) = page(HookSet::empty().with(Hook::RsvpForm));
    page.handle(PageEvent::FieldBlur(RsvpField::Name));
    assert_eq!(
        page.drain_effects(),
        vec![Effect::FieldError {
            field: RsvpField::Name,
            message: Some(NAME_REQUIRED.into()),
        }]
    );

    for (field, value) in [(RsvpField::Email, "a@b"), (RsvpField::Attendance, "yes")] {
        page.handle(PageEvent::FieldInput { field, value: value.into() });
    }
    page.handle(PageEvent::Submit);
    let effects = page.drain_effects();
    let Some(Effect::RsvpBlocked { errors }) = effects.first() else {
        panic!("expected blocked submission, got {effects:?}");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[1].message, EMAIL_INVALID);

    page.handle(PageEvent::FieldInput {
        field: RsvpField::Name,
        value: "Ana Souza".into(),
    });
    page.handle(PageEvent::FieldInput {
        field: RsvpField::Email,
        value: "ana@example.com".into(),
    });
    page.handle(PageEvent::FieldBlur(RsvpField::Email));
    assert_eq!(
        page.drain_effects(),
        vec![Effect::FieldError { field: RsvpField::Email, message: None }]
    );
    clock.advance(ms(1_250));
    page.handle(PageEvent::Submit);
    let effects = page.drain_effects();
    let Some(Effect::RsvpSubmitted { record }) = effects.first() else {
        panic!("expected submission, got {effects:?}");
    };
    assert_eq!(record.form.name, "Ana Souza");
    assert_eq!(record.submitted_at, start() + chrono::TimeDelta::milliseconds(1_250));

    page.handle(PageEvent::Submit);
    assert_eq!(page.drain_effects(), no_effects());
    assert!(page.rsvp().unwrap().is_submitted());
}

#[test]
fn media_keys_drive_transport() {
    let mut stored = BTreeMap::new();
    stored.insert("music-enabled".to_string(), json!(false));
    let mut page = Page::new(
        config(),
        HookSet::empty().with(Hook::Transport),
        RecordingEngine::new(),
        Box::new(MemoryStorage::with_entries(stored)),
        Box::new(ManualClock::new(start())),
    );
    page.init();
    assert!(!page.is_music_enabled());

    page.handle(press(KeyCode::MediaNextTrack));
    assert_eq!(page.player().unwrap().current_index(), 1);
    page.handle(press(KeyCode::MediaPrevTrack));
    page.handle(press(KeyCode::MediaPrevTrack));
    assert_eq!(page.player().unwrap().current_index(), 2);
    assert!(!page.player().unwrap().is_playing());
}

#[test]
fn toggle_swallowed_by_fade_in_keeps_preference() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(start());
    let mut page = Page::new(
        config(),
        HookSet::empty().with(Hook::OpenInvitation).with(Hook::Transport),
        RecordingEngine::new(),
        Box::new(storage.clone()),
        Box::new(clock.clone()),
    );
    page.init();
    page.handle(PageEvent::Click(Control::OpenInvitation));
    page.handle(PageEvent::Playback(PlaybackSignal::Ready));
    run_for(&mut page, &clock, ms(50));
    assert_eq!(page.player().unwrap().state(), PlayerState::FadingIn);

    page.handle(PageEvent::Click(Control::TogglePlay));
    run_for(&mut page, &clock, ms(1_000));
    assert_eq!(page.player().unwrap().state(), PlayerState::Playing);
    assert!(page.player().unwrap().is_playing());
    assert!(page.is_music_enabled());
    assert_eq!(page.preferences().get_bool("music-enabled"), None);
    assert_eq!(storage.snapshot().get("music-enabled"), None);

    // Once the fade is done the same control pauses and is remembered.
    page.handle(PageEvent::Click(Control::TogglePlay));
    assert_eq!(page.player().unwrap().state(), PlayerState::FadingOut);
    assert!(!page.is_music_enabled());
    assert_eq!(storage.snapshot().get("music-enabled"), Some(&json!(false)));
}
