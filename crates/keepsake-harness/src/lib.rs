#![forbid(unsafe_code)]

//! Tools for exercising Keepsake pages outside a browser.
//!
//! - [`scenario`] replays scripted visits and records transcripts.
//! - [`report`] renders human-readable summaries for the command line.

pub mod report;
pub mod scenario;

pub use scenario::{RunOptions, Scenario, ScenarioError, TranscriptEntry, run};
