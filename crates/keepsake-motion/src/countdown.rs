#![forbid(unsafe_code)]

//! Countdown to a fixed instant.
//!
//! [`CountdownEngine`] decomposes the time remaining until its target into
//! days, hours, minutes and seconds, and reports only the units whose
//! displayed value changed since the previous evaluation. Each evaluation
//! also returns the delay until the next one, aligned just past the next
//! whole-second boundary so rescheduling never accumulates drift.
//!
//! # Example
//!
//! ```rust
//! use keepsake_motion::countdown::{CountdownEngine, CountdownUpdate};
//! use chrono::{TimeZone, Utc};
//!
//! let mut engine = CountdownEngine::parse("2027-02-14T10:00:00+01:00").unwrap();
//! let now = Utc.with_ymd_and_hms(2027, 2, 14, 8, 59, 0).unwrap();
//! let eval = engine.evaluate(now);
//! assert_eq!(eval.updates.len(), 4);
//! assert!(eval.next_in.is_some());
//! ```

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;

/// Message shown once the target instant has passed.
pub const DEFAULT_MESSAGE: &str = "Today is the day! Congratulations!";

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Errors raised while configuring a countdown.
#[derive(Debug, thiserror::Error)]
pub enum CountdownError {
    /// The target is neither RFC 3339 nor a naive `YYYY-MM-DDTHH:MM:SS`.
    #[error("invalid countdown target {input:?}: {source}")]
    InvalidTarget {
        /// Input as given.
        input: String,
        /// Parser failure.
        #[source]
        source: chrono::ParseError,
    },
}

/// One displayed unit of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// All units, largest first.
    pub const ALL: [TimeUnit; 4] = [
        TimeUnit::Days,
        TimeUnit::Hours,
        TimeUnit::Minutes,
        TimeUnit::Seconds,
    ];

    const fn index(self) -> usize {
        match self {
            TimeUnit::Days => 0,
            TimeUnit::Hours => 1,
            TimeUnit::Minutes => 2,
            TimeUnit::Seconds => 3,
        }
    }
}

/// Zero-padded text for all four units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownDisplay {
    pub days: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

/// A change the presentation layer should apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CountdownUpdate {
    /// A unit's displayed value changed (flip animation trigger).
    DigitChanged {
        unit: TimeUnit,
        value: u64,
        text: String,
    },
    /// The target was reached. Emitted exactly once.
    Finished {
        display: CountdownDisplay,
        message: String,
    },
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// Changes since the previous evaluation, largest unit first.
    pub updates: Vec<CountdownUpdate>,
    /// Delay until the next evaluation; `None` once finished.
    pub next_in: Option<Duration>,
}

/// Split whole seconds into `[days, hours, minutes, seconds]`.
#[must_use]
pub fn decompose(total_secs: u64) -> [u64; 4] {
    [
        total_secs / SECS_PER_DAY,
        (total_secs % SECS_PER_DAY) / SECS_PER_HOUR,
        (total_secs % SECS_PER_HOUR) / SECS_PER_MINUTE,
        total_secs % SECS_PER_MINUTE,
    ]
}

/// Parse a target instant. Accepts RFC 3339; an offset-less timestamp is
/// read as UTC.
pub fn parse_target(input: &str) -> Result<DateTime<FixedOffset>, CountdownError> {
    let input = input.trim();
    match DateTime::parse_from_rfc3339(input) {
        Ok(dt) => Ok(dt),
        Err(rfc_err) => NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| CountdownError::InvalidTarget {
                input: input.to_string(),
                source: rfc_err,
            }),
    }
}

/// Countdown state: target, last emitted snapshot and terminal flag.
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    target: DateTime<FixedOffset>,
    message: String,
    widths: [usize; 4],
    previous: [Option<u64>; 4],
    finished: bool,
}

impl CountdownEngine {
    /// Create an engine counting down to `target`.
    #[must_use]
    pub fn new(target: DateTime<FixedOffset>) -> Self {
        Self {
            target,
            message: DEFAULT_MESSAGE.to_string(),
            widths: [3, 2, 2, 2],
            previous: [None; 4],
            finished: false,
        }
    }

    /// Create an engine from a textual target (see [`parse_target`]).
    pub fn parse(target: &str) -> Result<Self, CountdownError> {
        parse_target(target).map(Self::new)
    }

    /// Replace the terminal message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Override the zero-pad width of one unit.
    #[must_use]
    pub fn with_width(mut self, unit: TimeUnit, width: usize) -> Self {
        self.widths[unit.index()] = width;
        self
    }

    /// The configured target.
    #[must_use]
    pub fn target(&self) -> DateTime<FixedOffset> {
        self.target
    }

    /// The terminal message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the terminal state has been emitted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Zero-padded text for `value` in `unit`.
    #[must_use]
    pub fn format(&self, unit: TimeUnit, value: u64) -> String {
        format!("{value:0width$}", width = self.widths[unit.index()])
    }

    /// Evaluate the countdown at `now`.
    ///
    /// Once finished, further calls return an empty evaluation even if `now`
    /// moves backwards.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Evaluation {
        if self.finished {
            return Evaluation::default();
        }
        let remaining = self.target.with_timezone(&Utc) - now;
        let remaining_ms = remaining.num_milliseconds();
        if remaining_ms <= 0 {
            self.finished = true;
            let display = CountdownDisplay {
                days: self.format(TimeUnit::Days, 0),
                hours: self.format(TimeUnit::Hours, 0),
                minutes: self.format(TimeUnit::Minutes, 0),
                seconds: self.format(TimeUnit::Seconds, 0),
            };
            keepsake_core::info!(target_instant = %self.target, "countdown finished");
            return Evaluation {
                updates: vec![CountdownUpdate::Finished {
                    display,
                    message: self.message.clone(),
                }],
                next_in: None,
            };
        }

        let remaining_ms = remaining_ms.unsigned_abs();
        let values = decompose(remaining_ms / 1000);
        let mut updates = Vec::new();
        for unit in TimeUnit::ALL {
            let idx = unit.index();
            let value = values[idx];
            if self.previous[idx] != Some(value) {
                self.previous[idx] = Some(value);
                updates.push(CountdownUpdate::DigitChanged {
                    unit,
                    value,
                    text: self.format(unit, value),
                });
            }
        }
        // Land 1 ms past the boundary where the floored seconds change.
        let next_in = Duration::from_millis(remaining_ms % 1000 + 1);
        keepsake_core::trace!(
            remaining_ms,
            changed = updates.len(),
            next_in_ms = next_in.as_millis() as u64,
            "countdown evaluated"
        );
        Evaluation {
            updates,
            next_in: Some(next_in),
        }
    }

    /// The most recently emitted values, if every unit has been emitted.
    #[must_use]
    pub fn snapshot(&self) -> Option<[u64; 4]> {
        let [d, h, m, s] = self.previous;
        Some([d?, h?, m?, s?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn target() -> DateTime<FixedOffset> {
        parse_target("2027-02-14T10:00:00+01:00").unwrap()
    }

    fn before(secs: i64) -> DateTime<Utc> {
        target().with_timezone(&Utc) - TimeDelta::seconds(secs)
    }

    #[test]
    fn parse_accepts_offsetless_timestamp_as_utc() {
        let t = parse_target("2027-02-14T09:00:00").unwrap();
        assert_eq!(t.with_timezone(&Utc), Utc.with_ymd_and_hms(2027, 2, 14, 9, 0, 0).unwrap());
        assert_eq!(t.with_timezone(&Utc), target().with_timezone(&Utc));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_target("next tuesday"),
            Err(CountdownError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn decompose_chains_modulo() {
        assert_eq!(decompose(90_061), [1, 1, 1, 1]);
        assert_eq!(decompose(59), [0, 0, 0, 59]);
        assert_eq!(decompose(86_400), [1, 0, 0, 0]);
    }

    #[test]
    fn first_evaluation_emits_every_unit() {
        let mut engine = CountdownEngine::new(target());
        let eval = engine.evaluate(before(90_061));
        assert_eq!(
            eval.updates,
            vec![
                CountdownUpdate::DigitChanged { unit: TimeUnit::Days, value: 1, text: "001".into() },
                CountdownUpdate::DigitChanged { unit: TimeUnit::Hours, value: 1, text: "01".into() },
                CountdownUpdate::DigitChanged { unit: TimeUnit::Minutes, value: 1, text: "01".into() },
                CountdownUpdate::DigitChanged { unit: TimeUnit::Seconds, value: 1, text: "01".into() },
            ]
        );
    }

    #[test]
    fn only_changed_units_are_emitted() {
        let mut engine = CountdownEngine::new(target());
        engine.evaluate(before(90_061));
        let eval = engine.evaluate(before(90_060));
        assert_eq!(
            eval.updates,
            vec![CountdownUpdate::DigitChanged {
                unit: TimeUnit::Seconds,
                value: 0,
                text: "00".into()
            }]
        );
        let eval = engine.evaluate(before(90_060));
        assert!(eval.updates.is_empty());
    }

    #[test]
    fn next_in_lands_past_second_boundary() {
        let mut engine = CountdownEngine::new(target());
        let now = before(10) + TimeDelta::milliseconds(250);
        let eval = engine.evaluate(now);
        assert_eq!(eval.next_in, Some(Duration::from_millis(751)));

        let now = now + TimeDelta::milliseconds(751);
        let eval = engine.evaluate(now);
        assert_eq!(eval.next_in, Some(Duration::from_millis(1000)));
    }

    #[test]
    fn past_target_finishes_immediately() {
        let mut engine = CountdownEngine::new(target()).with_message("Married!");
        let eval = engine.evaluate(before(-5));
        assert_eq!(eval.next_in, None);
        assert_eq!(
            eval.updates,
            vec![CountdownUpdate::Finished {
                display: CountdownDisplay {
                    days: "000".into(),
                    hours: "00".into(),
                    minutes: "00".into(),
                    seconds: "00".into(),
                },
                message: "Married!".into(),
            }]
        );
        assert!(engine.is_finished());
    }

    #[test]
    fn finished_is_terminal_even_if_clock_rewinds() {
        let mut engine = CountdownEngine::new(target());
        engine.evaluate(before(0));
        let eval = engine.evaluate(before(3_600));
        assert_eq!(eval, Evaluation::default());
    }

    #[test]
    fn custom_width() {
        let engine = CountdownEngine::new(target()).with_width(TimeUnit::Days, 2);
        assert_eq!(engine.format(TimeUnit::Days, 5), "05");
        assert_eq!(engine.format(TimeUnit::Days, 1234), "1234");
    }

    #[test]
    fn snapshot_after_first_evaluation() {
        let mut engine = CountdownEngine::new(target());
        assert_eq!(engine.snapshot(), None);
        engine.evaluate(before(3_725));
        assert_eq!(engine.snapshot(), Some([0, 1, 2, 5]));
    }
}
