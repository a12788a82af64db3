//! Configuration module
//!
//! Handles target windows, coordinate profiles, keyword tables, colors and
//! timings. Every literal the automation depends on lives here and can be
//! replaced from a JSON file.

pub mod priorities;
pub mod settings;

use std::path::PathBuf;

pub use settings::{
    chord_label, DetectionSettings, JournalSettings, Key, LayoutSettings, PlayStateSettings, PurpleSettings,
    SelectionSettings, Settings, TargetSettings, TimingSettings, TriggerStrictness,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Profile '{profile}' is missing anchor '{anchor}'")]
    MissingAnchor { profile: String, anchor: String },
    #[error("Anchor '{anchor}' in profile '{profile}' must be a {expected}")]
    AnchorKind {
        profile: String,
        anchor: String,
        expected: &'static str,
    },
    #[error("Target '{target}' has {slots} perk slots, expected 2 or 3")]
    InvalidSlots { target: String, slots: usize },
    #[error("Target '{target}' needs {slots} perk slots but profile '{profile}' only defines {available}")]
    SlotsUnavailable {
        target: String,
        profile: String,
        slots: usize,
        available: usize,
    },
    #[error("Purple penalty {penalty} must be greater than {minimum}")]
    PenaltyTooSmall { penalty: u32, minimum: u32 },
    #[error("Priority list '{0}' has no rules")]
    EmptyPriorityList(String),
    #[error("No targets configured")]
    NoTargets,
}
