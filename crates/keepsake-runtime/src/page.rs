#![forbid(unsafe_code)]

//! The page controller.
//!
//! [`Page`] owns one instance of every component and routes host input to
//! them. Nothing here blocks or spawns: deferred work sits in a
//! [`TimerQueue`] that only moves when the host calls [`Page::advance`], so
//! a whole visit can be replayed deterministically.
//!
//! # Lifecycle
//!
//! ```text
//! new ─▶ init ─┬─▶ handle(event)* ─▶ drain_effects
//!              └─▶ advance(dt)*   ─▶ drain_effects
//! ```
//!
//! `init` starts each component independently. A component whose hooks are
//! missing from the [`HookSet`] is skipped with a warning and every later
//! input aimed at it is ignored.
//!
//! # Invariants
//!
//! 1. Page scrolling is locked while the invitation is closed or the
//!    lightbox is open, and unlocked only when neither holds.
//! 2. The loading screen is hidden at most once and removed after hiding.
//! 3. Music starts on its own at most once per gesture path, and never when
//!    the visitor's stored preference disabled it.
//! 4. Effects are drained in the order their causes happened.

use std::time::Duration;

use keepsake_audio::{AudioPlayer, PlaybackEngine, PlayerEvent, PlayerState};
use keepsake_core::clock::Clock;
use keepsake_core::event::{KeyCode, KeyEvent};
use keepsake_forms::{RsvpController, RsvpField, SubmitOutcome};
use keepsake_motion::scroll::{PARALLAX_FACTOR, parallax_position, scroll_progress};
use keepsake_motion::{
    CountdownEngine, IntersectionEntry, LightboxEvent, LightboxNavigator, LockReason,
    ParticleField, RevealScheduler, ScrollLock,
};

use crate::config::PageConfig;
use crate::effect::{Control, Effect, PageEvent, ScrollMetrics};
use crate::hooks::{Hook, HookSet};
use crate::state_persistence::{PreferenceStore, StorageBackend};
use crate::timer::{TimerId, TimerQueue};

/// Display frame cadence of the particle canvas.
pub const PARTICLE_FRAME: Duration = Duration::from_millis(16);

/// Deferred page work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageTimer {
    CountdownTick,
    HideLoading,
    RemoveLoading,
    RescanReveal,
    ScrollToTarget,
    ParticleFrame,
}

/// Where the loading screen is in its exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingPhase {
    /// The page has no loading screen.
    Absent,
    Visible,
    Hidden,
    Removed,
}

/// Headless invitation page.
pub struct Page<E> {
    config: PageConfig,
    hooks: HookSet,
    clock: Box<dyn Clock>,
    preferences: PreferenceStore,
    timers: TimerQueue<PageTimer>,
    scroll_lock: ScrollLock,
    engine: Option<E>,
    reveal: Option<RevealScheduler>,
    countdown: Option<CountdownEngine>,
    player: Option<AudioPlayer<E>>,
    lightbox: Option<LightboxNavigator>,
    particles: Option<ParticleField>,
    rsvp: Option<RsvpController>,
    loading: LoadingPhase,
    load_seen: bool,
    initialized: bool,
    invitation_open: bool,
    music_enabled: bool,
    music_started: bool,
    last_progress: Option<f32>,
    particle_timer: Option<TimerId>,
    effects: Vec<Effect>,
}

impl<E: PlaybackEngine> Page<E> {
    /// Build a page. Nothing runs until [`init`](Self::init).
    pub fn new(
        config: PageConfig,
        hooks: HookSet,
        engine: E,
        storage: Box<dyn StorageBackend>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            hooks,
            clock,
            preferences: PreferenceStore::new(storage),
            timers: TimerQueue::new(),
            scroll_lock: ScrollLock::new(),
            engine: Some(engine),
            reveal: None,
            countdown: None,
            player: None,
            lightbox: None,
            particles: None,
            rsvp: None,
            loading: LoadingPhase::Absent,
            load_seen: false,
            initialized: false,
            invitation_open: false,
            music_enabled: true,
            music_started: false,
            last_progress: None,
            particle_timer: None,
            effects: Vec::new(),
        }
    }

    /// Start every component whose hooks are present. Never fails; calling
    /// it again does nothing.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        let span = keepsake_core::info_span!("page_init");
        let _guard = span.enter();

        if let Err(err) = self.preferences.load() {
            keepsake_core::warn!(error = %err, "preferences unreadable, using defaults");
        }
        self.music_enabled = self
            .preferences
            .get_bool(&self.config.music.storage_key)
            .unwrap_or(true);

        if self.requires("loading screen", &[Hook::LoadingScreen]) {
            self.loading = LoadingPhase::Visible;
            self.timers
                .schedule(self.config.loading.fallback(), PageTimer::HideLoading);
        }

        if self.requires("invitation", &[Hook::OpenInvitation]) {
            if self.scroll_lock.acquire(LockReason::INVITATION) {
                self.effects.push(Effect::ScrollLock { locked: true });
            }
        } else {
            self.invitation_open = true;
        }

        if self.requires("reveal", &[Hook::RevealTargets]) {
            self.reveal = Some(RevealScheduler::new(self.config.reveal));
            self.scan_reveal_targets();
        }

        if self.requires("countdown", &[Hook::CountdownSlots]) {
            match self.config.countdown_engine() {
                Ok(engine) => {
                    self.countdown = Some(engine);
                    self.tick_countdown();
                }
                Err(err) => {
                    keepsake_core::warn!(error = %err, "countdown skipped");
                }
            }
        }

        if self.requires("music player", &[Hook::Transport]) {
            if self.config.playlist.is_empty() {
                keepsake_core::warn!("music player skipped: empty playlist");
            } else if let Some(engine) = self.engine.take() {
                self.player = Some(AudioPlayer::new(
                    engine,
                    self.config.playlist.clone(),
                    self.config.fade,
                    self.config.music.initial_volume,
                ));
            }
        }

        if self.requires("lightbox", &[Hook::Gallery, Hook::Lightbox]) {
            self.lightbox = Some(LightboxNavigator::new(self.config.gallery.clone()));
        }

        if self.requires("particles", &[Hook::ParticlesCanvas]) {
            let viewport = self.config.viewport;
            self.particles = Some(ParticleField::new(
                viewport.width,
                viewport.height,
                self.config.particles,
            ));
            self.sync_particle_timer();
        }

        if self.requires("rsvp", &[Hook::RsvpForm]) {
            self.rsvp = Some(RsvpController::new());
        }

        keepsake_core::info!(
            music_enabled = self.music_enabled,
            player = self.player.is_some(),
            countdown = self.countdown.is_some(),
            lightbox = self.lightbox.is_some(),
            "page initialized"
        );
    }

    /// Route one host event. Initializes the page first if needed.
    pub fn handle(&mut self, event: PageEvent) {
        self.init();
        let gesture = event.is_user_gesture();
        match event {
            PageEvent::Load => self.on_load(),
            PageEvent::Click(control) => self.on_click(control),
            PageEvent::Touch => {}
            PageEvent::Key(key) => self.on_key(&key),
            PageEvent::GalleryKey { index, key } => {
                if let Some(lightbox) = self.lightbox.as_mut() {
                    lightbox.activate_item(index, &key);
                }
            }
            PageEvent::Intersections(batch) => self.on_intersections(&batch),
            PageEvent::Scroll(metrics) => self.on_scroll(&metrics),
            PageEvent::Resize { width, height } => self.on_resize(width, height),
            PageEvent::Visibility { visible } => {
                if let Some(field) = self.particles.as_mut() {
                    field.set_visible(visible);
                }
                self.sync_particle_timer();
            }
            PageEvent::Playback(signal) => {
                if let Some(player) = self.player.as_mut() {
                    player.on_signal(signal);
                }
            }
            PageEvent::FieldInput { field, value } => {
                if let Some(rsvp) = self.rsvp.as_mut() {
                    rsvp.set_field(field, value);
                }
            }
            PageEvent::FieldBlur(field) => self.on_blur(field),
            PageEvent::Submit => self.on_submit(),
        }
        if gesture {
            self.start_music_on_gesture();
        }
        self.collect();
    }

    /// Move virtual time forward by `dt`, firing due timers and advancing
    /// the active fade in between so their effects interleave in time order.
    pub fn advance(&mut self, dt: Duration) {
        self.init();
        let start = self.timers.now();
        let limit = start.saturating_add(dt);
        let mut cursor = start;
        while let Some((due, timer)) = self.timers.pop_due(limit) {
            self.advance_player(due.saturating_sub(cursor));
            cursor = cursor.max(due);
            self.fire(timer);
            self.collect();
        }
        self.advance_player(limit.saturating_sub(cursor));
        self.timers.settle(limit);
        self.collect();
    }

    /// Time until something is due: a timer or the next fade step.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let fade = self.player.as_ref().and_then(AudioPlayer::next_due);
        match (self.timers.next_deadline(), fade) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Take queued effects in emission order.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // -- accessors ----------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    #[must_use]
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Virtual time since the page was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.timers.now()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_lock.is_locked()
    }

    #[must_use]
    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }

    #[must_use]
    pub fn is_invitation_open(&self) -> bool {
        self.invitation_open
    }

    #[must_use]
    pub fn is_music_enabled(&self) -> bool {
        self.music_enabled
    }

    #[must_use]
    pub fn loading_phase(&self) -> LoadingPhase {
        self.loading
    }

    #[must_use]
    pub fn player(&self) -> Option<&AudioPlayer<E>> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut AudioPlayer<E>> {
        self.player.as_mut()
    }

    #[must_use]
    pub fn lightbox(&self) -> Option<&LightboxNavigator> {
        self.lightbox.as_ref()
    }

    #[must_use]
    pub fn reveal(&self) -> Option<&RevealScheduler> {
        self.reveal.as_ref()
    }

    #[must_use]
    pub fn countdown(&self) -> Option<&CountdownEngine> {
        self.countdown.as_ref()
    }

    #[must_use]
    pub fn particles(&self) -> Option<&ParticleField> {
        self.particles.as_ref()
    }

    #[must_use]
    pub fn rsvp(&self) -> Option<&RsvpController> {
        self.rsvp.as_ref()
    }

    #[must_use]
    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    // -- init helpers -------------------------------------------------------

    fn requires(&self, component: &'static str, hooks: &[Hook]) -> bool {
        let missing = self.hooks.missing(hooks);
        if missing.is_empty() {
            return true;
        }
        let missing: Vec<&str> = missing.iter().map(|h| h.as_str()).collect();
        keepsake_core::warn!(component, missing = ?missing, "component skipped: hooks missing");
        false
    }

    // -- input --------------------------------------------------------------

    fn on_load(&mut self) {
        if self.load_seen || self.loading != LoadingPhase::Visible {
            return;
        }
        self.load_seen = true;
        self.timers
            .schedule(self.config.loading.hide_delay(), PageTimer::HideLoading);
    }

    fn on_click(&mut self, control: Control) {
        match control {
            Control::OpenInvitation => self.open_invitation(),
            Control::TogglePlay => self.toggle_music(),
            Control::NextTrack => self.with_player(|p| p.next()),
            Control::PrevTrack => self.with_player(|p| p.prev()),
            Control::SelectTrack(index) => {
                self.with_player(|p| p.select(index as isize));
            }
            Control::TogglePanel => self.with_player(|p| p.toggle_panel()),
            Control::ClosePanel => self.with_player(|p| p.close_panel()),
            Control::SetVolume(volume) => self.with_player(|p| p.set_volume(volume)),
            Control::GalleryItem(index) => {
                if let Some(lightbox) = self.lightbox.as_mut() {
                    lightbox.open(index as isize);
                }
            }
            Control::LightboxClose => self.with_lightbox(LightboxNavigator::close),
            Control::LightboxPrev => self.with_lightbox(LightboxNavigator::prev),
            Control::LightboxNext => self.with_lightbox(LightboxNavigator::next),
        }
    }

    fn on_key(&mut self, key: &KeyEvent) {
        if let Some(lightbox) = self.lightbox.as_mut()
            && lightbox.handle_key(key)
        {
            return;
        }
        if !key.is_press() {
            return;
        }
        match key.code {
            KeyCode::MediaPlayPause => self.toggle_music(),
            KeyCode::MediaNextTrack => self.with_player(|p| p.next()),
            KeyCode::MediaPrevTrack => self.with_player(|p| p.prev()),
            _ => {}
        }
    }

    fn on_intersections(&mut self, batch: &[IntersectionEntry]) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        for id in reveal.on_intersections(batch) {
            self.effects.push(Effect::Revealed { id });
        }
    }

    fn on_scroll(&mut self, metrics: &ScrollMetrics) {
        if self.hooks.contains(Hook::ProgressBar) {
            let percent = scroll_progress(
                metrics.scroll_top,
                metrics.scroll_height,
                metrics.viewport_height,
            );
            if self.last_progress != Some(percent) {
                self.last_progress = Some(percent);
                self.effects.push(Effect::Progress { percent });
            }
        }
        if self.hooks.contains(Hook::Parallax) {
            for probe in &metrics.parallax {
                let position = parallax_position(
                    probe.rect_top,
                    probe.rect_height,
                    metrics.viewport_height,
                    PARALLAX_FACTOR,
                );
                self.effects.push(Effect::Parallax {
                    id: probe.id.clone(),
                    position,
                });
            }
        }
    }

    fn on_resize(&mut self, width: f32, height: f32) {
        self.config.viewport.width = width;
        self.config.viewport.height = height;
        if let Some(field) = self.particles.as_mut() {
            if let Some(id) = self.particle_timer.take() {
                self.timers.cancel(id);
            }
            field.resize(width, height);
        }
        self.sync_particle_timer();
    }

    fn on_blur(&mut self, field: RsvpField) {
        let Some(rsvp) = self.rsvp.as_mut() else {
            return;
        };
        let message = rsvp.blur(field).map(|e| e.message);
        self.effects.push(Effect::FieldError { field, message });
    }

    fn on_submit(&mut self) {
        let now = self.clock.now();
        let Some(rsvp) = self.rsvp.as_mut() else {
            return;
        };
        match rsvp.submit(now) {
            SubmitOutcome::Blocked(errors) => self.effects.push(Effect::RsvpBlocked { errors }),
            SubmitOutcome::Submitted(record) => self.effects.push(Effect::RsvpSubmitted { record }),
            SubmitOutcome::Ignored => {
                keepsake_core::debug!("rsvp already submitted");
            }
        }
    }

    // -- flows --------------------------------------------------------------

    fn open_invitation(&mut self) {
        if self.invitation_open {
            return;
        }
        self.invitation_open = true;
        keepsake_core::info!("invitation opened");
        if self.scroll_lock.release(LockReason::INVITATION) {
            self.effects.push(Effect::ScrollLock {
                locked: self.scroll_lock.is_locked(),
            });
        }
        if self.hooks.contains(Hook::MainContent) {
            self.effects.push(Effect::MainContentShown);
        }
        if self.reveal.is_some() {
            self.timers
                .schedule(self.config.invitation.rescan_delay(), PageTimer::RescanReveal);
        }
        self.timers
            .schedule(self.config.invitation.scroll_delay(), PageTimer::ScrollToTarget);
        if self.config.music.autoplay_on_open && self.music_enabled
            && let Some(player) = self.player.as_mut()
            && !player.is_playing()
        {
            player.select(0);
        }
    }

    /// The first gesture after opening starts the first track if nothing
    /// else has started playback yet.
    fn start_music_on_gesture(&mut self) {
        if self.music_started || !self.invitation_open || !self.music_enabled {
            return;
        }
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if player.state() == PlayerState::Stopped && !player.is_playing() {
            keepsake_core::debug!("starting music on first gesture");
            player.select(0);
            self.music_started = true;
        }
    }

    /// Explicit play/pause. Persists the visitor's choice once the player
    /// accepts it; a toggle swallowed by the fade lock changes nothing.
    fn toggle_music(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let enable = !player.is_playing();
        if !player.toggle() {
            keepsake_core::debug!(enable, "toggle ignored, preference kept");
            return;
        }
        self.music_enabled = enable;
        let key = self.config.music.storage_key.clone();
        self.preferences.set_bool(key, enable);
        if let Err(err) = self.preferences.flush() {
            keepsake_core::warn!(error = %err, "music preference not saved");
        }
    }

    fn with_player(&mut self, f: impl FnOnce(&mut AudioPlayer<E>)) {
        match self.player.as_mut() {
            Some(player) => f(player),
            None => {
                keepsake_core::trace!("no music player");
            }
        }
    }

    fn with_lightbox(&mut self, f: impl FnOnce(&mut LightboxNavigator)) {
        if let Some(lightbox) = self.lightbox.as_mut() {
            f(lightbox);
        }
    }

    // -- time ---------------------------------------------------------------

    fn advance_player(&mut self, dt: Duration) {
        if dt.is_zero() {
            return;
        }
        if let Some(player) = self.player.as_mut() {
            player.advance(dt);
        }
    }

    fn fire(&mut self, timer: PageTimer) {
        keepsake_core::trace!(?timer, at_ms = self.timers.now().as_millis() as u64, "timer fired");
        match timer {
            PageTimer::CountdownTick => self.tick_countdown(),
            PageTimer::HideLoading => self.hide_loading(),
            PageTimer::RemoveLoading => {
                if self.loading == LoadingPhase::Hidden {
                    self.loading = LoadingPhase::Removed;
                    self.effects.push(Effect::LoadingRemoved);
                }
            }
            PageTimer::RescanReveal => self.scan_reveal_targets(),
            PageTimer::ScrollToTarget => self.effects.push(Effect::ScrollTo {
                target: self.config.invitation.scroll_target.clone(),
            }),
            PageTimer::ParticleFrame => {
                self.particle_timer = None;
                if let Some(field) = self.particles.as_mut()
                    && field.frame()
                {
                    self.effects.push(Effect::ParticlesFrame {
                        frame: field.frames(),
                    });
                }
                self.sync_particle_timer();
            }
        }
    }

    fn tick_countdown(&mut self) {
        let now = self.clock.now();
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        let evaluation = countdown.evaluate(now);
        self.effects.extend(
            evaluation
                .updates
                .into_iter()
                .map(|update| Effect::Countdown { update }),
        );
        if let Some(next_in) = evaluation.next_in {
            self.timers.schedule(next_in, PageTimer::CountdownTick);
        }
    }

    fn hide_loading(&mut self) {
        if self.loading != LoadingPhase::Visible {
            return;
        }
        self.loading = LoadingPhase::Hidden;
        self.timers.cancel_where(|t| *t == PageTimer::HideLoading);
        self.effects.push(Effect::LoadingHidden);
        self.timers
            .schedule(self.config.loading.remove_delay(), PageTimer::RemoveLoading);
    }

    fn scan_reveal_targets(&mut self) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        let immediate = reveal.register(self.config.reveal_targets.iter().cloned());
        let ids: Vec<String> = reveal.observed_ids().map(str::to_owned).collect();
        for id in immediate {
            self.effects.push(Effect::Revealed { id });
        }
        if !ids.is_empty() {
            self.effects.push(Effect::ObserveTargets { ids });
        }
    }

    fn sync_particle_timer(&mut self) {
        let pending = self
            .particles
            .as_ref()
            .is_some_and(ParticleField::is_frame_pending);
        match (pending, self.particle_timer) {
            (true, None) => {
                self.particle_timer = Some(self.timers.schedule(PARTICLE_FRAME, PageTimer::ParticleFrame));
            }
            (false, Some(id)) => {
                self.timers.cancel(id);
                self.particle_timer = None;
            }
            _ => {}
        }
    }

    /// Move component events into the outbox, applying their side effects
    /// on the scroll lock.
    fn collect(&mut self) {
        if let Some(player) = self.player.as_mut() {
            for event in player.drain_events() {
                let effect = match event {
                    PlayerEvent::PlaybackRejected { reason } => Effect::PlaybackBlocked { reason },
                    event => Effect::Player { event },
                };
                self.effects.push(effect);
            }
        }
        if let Some(lightbox) = self.lightbox.as_mut() {
            for event in lightbox.drain_events() {
                let flipped = match event {
                    LightboxEvent::Opened { .. } => self.scroll_lock.acquire(LockReason::LIGHTBOX),
                    LightboxEvent::Closed => self.scroll_lock.release(LockReason::LIGHTBOX),
                };
                self.effects.push(Effect::Lightbox { event });
                if flipped {
                    self.effects.push(Effect::ScrollLock {
                        locked: self.scroll_lock.is_locked(),
                    });
                }
            }
        }
    }
}
