#![forbid(unsafe_code)]

//! Text summaries printed by the `keepsake` binary.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use keepsake_motion::countdown::{CountdownEngine, CountdownUpdate, TimeUnit};
use keepsake_runtime::PageConfig;

/// One line describing the countdown at `now`, e.g.
/// `"001 days 00 hours 01 minutes 01 seconds"`, or the finish message.
#[must_use]
pub fn countdown_line(engine: &mut CountdownEngine, now: DateTime<Utc>) -> String {
    let mut parts = Vec::with_capacity(TimeUnit::ALL.len());
    for update in engine.evaluate(now).updates {
        match update {
            CountdownUpdate::DigitChanged { unit, text, .. } => {
                parts.push(format!("{text} {}", unit_label(unit)));
            }
            CountdownUpdate::Finished { message, .. } => return message,
        }
    }
    parts.join(" ")
}

fn unit_label(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Days => "days",
        TimeUnit::Hours => "hours",
        TimeUnit::Minutes => "minutes",
        TimeUnit::Seconds => "seconds",
    }
}

/// Multi-line overview of a configuration.
#[must_use]
pub fn config_summary(config: &PageConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "countdown target: {}", config.countdown.target);
    let _ = writeln!(out, "playlist: {} tracks", config.playlist.len());
    for (i, track) in config.playlist.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, track.label());
    }
    let _ = writeln!(out, "gallery: {} items", config.gallery.len());
    let intro = config.reveal_targets.iter().filter(|t| t.intro).count();
    let _ = writeln!(
        out,
        "reveal targets: {} ({} intro), threshold {}",
        config.reveal_targets.len(),
        intro,
        config.reveal.threshold
    );
    let _ = writeln!(
        out,
        "fade: {} ms in {} steps",
        config.fade.duration_ms, config.fade.steps
    );
    let _ = writeln!(out, "particles: {}", config.particles.count);
    let _ = write!(
        out,
        "music: key {:?}, autoplay on open {}",
        config.music.storage_key, config.music.autoplay_on_open
    );
    out
}
