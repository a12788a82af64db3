//! Perk Sentry - automatic perk selection for idle tower-defense emulators
//!
//! This library watches one or more emulator windows for the "new perk"
//! bar, reads the offered perks with OCR, ranks them against keyword
//! tables, avoids purple-background perks and clicks the best one.
//!
//! ## Desktop access
//!
//! Capture, OCR, input and window lookup are capability traits in the
//! `desktop` and `vision` modules. `Desktop::detect` picks what the host
//! offers and falls back to a no-op backend.

pub mod ai;
pub mod config;
pub mod desktop;
pub mod game;
pub mod journal;
pub mod vision;

use image::Rgb;

use crate::ai::{DecisionEngine, PerkRank};
use crate::config::{ConfigError, Settings};
use crate::desktop::{AbortFlag, Desktop};
use crate::game::Monitor;
use crate::journal::DecisionJournal;
use crate::vision::{PurpleMatch, VisionSystem};

/// Decision engine and vision settings, built once from `Settings`
pub struct PerkSentry {
    pub vision: VisionSystem,
    pub engine: DecisionEngine,
    pub settings: Settings,
}

impl PerkSentry {
    /// Validate the settings and build the engine
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            vision: VisionSystem::new(&settings)?,
            engine: DecisionEngine::new(&settings),
            settings,
        })
    }

    /// Rank OCR text the way it would be ranked in `window`.
    ///
    /// Returns the rank and the name of the list used.
    pub fn rank(&self, text: &str, window: &str) -> (PerkRank, &str) {
        (self.engine.rank(text, window), self.engine.list_for(window).name.as_str())
    }

    /// Every purple heuristic the color triggers
    pub fn classify(&self, color: Rgb<u8>) -> Vec<PurpleMatch> {
        self.vision.classifier().matches(color)
    }

    /// Turn into a monitor over the configured targets
    pub fn into_monitor(self, desktop: Desktop, journal: DecisionJournal, abort: AbortFlag) -> Result<Monitor, ConfigError> {
        Monitor::new(self.settings, desktop, journal, abort)
    }
}
