//! User settings
//!
//! Defines all configurable options for the automation. Defaults reproduce
//! the calibrated layout of a 1920x1080 emulator window.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::ai::matcher::{PerkRank, PriorityBook};
use crate::vision::layout::{AdState, Anchor, Point, ProfileResolver, Region};
use crate::vision::ocr::normalize_text;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Monitored emulator windows, by exact title
    pub targets: Vec<TargetSettings>,
    /// Coordinate profiles and ad detection
    pub layout: LayoutSettings,
    /// Keyword rule lists
    pub priorities: PriorityBook,
    /// Purple penalty and exemptions
    pub selection: SelectionSettings,
    /// Purple card colors
    pub purple: PurpleSettings,
    /// Play/pause button detection
    pub play_state: PlayStateSettings,
    /// Perk bar and wave detection
    pub detection: DetectionSettings,
    /// Screen timing settings
    pub timings: TimingSettings,
    /// Decision journal files
    pub journal: JournalSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            targets: vec![
                TargetSettings {
                    name: "Daddy Bluestack".to_string(),
                    slots: 2,
                    align_first_perk_y: None,
                    ocr_threshold: None,
                },
                TargetSettings {
                    name: "Maximus Bluestack".to_string(),
                    slots: 3,
                    align_first_perk_y: Some(265),
                    ocr_threshold: None,
                },
            ],
            layout: LayoutSettings::default(),
            priorities: PriorityBook::default(),
            selection: SelectionSettings::default(),
            purple: PurpleSettings::default(),
            play_state: PlayStateSettings::default(),
            detection: DetectionSettings::default(),
            timings: TimingSettings::default(),
            journal: JournalSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file and validate them.
    ///
    /// Missing sections fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings = serde_json::from_str(&raw)?;
        settings.priorities.normalize();
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Check the invariants the automation relies on.
    ///
    /// Shadowed priority rules are only logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let minimum = PerkRank::UNRANKED.value() - 1;
        if self.selection.penalty <= minimum {
            return Err(ConfigError::PenaltyTooSmall {
                penalty: self.selection.penalty,
                minimum,
            });
        }

        for list in self.priorities.lists() {
            if list.is_empty() {
                return Err(ConfigError::EmptyPriorityList(list.name.clone()));
            }
            for (earlier, later) in list.shadowed_rules() {
                log::warn!(
                    "Priority list '{}': rule {} ('{}') shadows rule {} ('{}')",
                    list.name,
                    earlier + 1,
                    list.rules[earlier].canonical_text(),
                    later + 1,
                    list.rules[later].canonical_text()
                );
            }
        }

        let resolver = ProfileResolver::from_layout(&self.layout)?;
        for target in &self.targets {
            if !(2..=3).contains(&target.slots) {
                return Err(ConfigError::InvalidSlots {
                    target: target.name.clone(),
                    slots: target.slots,
                });
            }
            for ad_state in [AdState::Showing, AdState::Absent] {
                let profile = resolver.resolve(ad_state);
                if profile.perk_slots.len() < target.slots {
                    return Err(ConfigError::SlotsUnavailable {
                        target: target.name.clone(),
                        profile: profile.name,
                        slots: target.slots,
                        available: profile.perk_slots.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Keep only the named targets; names without a configured entry get
    /// default target settings
    pub fn select_targets(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let selected = names
            .iter()
            .map(|name| {
                self.targets
                    .iter()
                    .find(|t| &t.name == name)
                    .cloned()
                    .unwrap_or_else(|| TargetSettings::named(name))
            })
            .collect();
        self.targets = selected;
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One monitored window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Exact window title
    pub name: String,
    /// Number of perk cards offered (2 or 3)
    #[serde(default = "default_slots")]
    pub slots: usize,
    /// Move the perk cards so the first text region starts at this y
    #[serde(default)]
    pub align_first_perk_y: Option<i32>,
    /// Binarize OCR captures at this gray level
    #[serde(default)]
    pub ocr_threshold: Option<u8>,
}

fn default_slots() -> usize {
    2
}

impl TargetSettings {
    /// Settings for a window with no dedicated calibration
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slots: default_slots(),
            align_first_perk_y: None,
            ocr_threshold: Some(180),
        }
    }
}

/// Coordinate profiles as raw anchor maps, decoded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub with_ad: BTreeMap<String, Anchor>,
    pub no_ad: BTreeMap<String, Anchor>,
    /// Two pixels that share a color unless an ad covers one of them
    pub ad_probes: [Point; 2],
    /// Profile used when the probes cannot be captured
    pub fallback: AdState,
}

fn anchors(points: &[(&str, (i32, i32))], regions: &[(&str, (i32, i32), (i32, i32))]) -> BTreeMap<String, Anchor> {
    let points = points
        .iter()
        .map(|(name, (x, y))| (name.to_string(), Anchor::Point(Point(*x, *y))));
    let regions = regions.iter().map(|(name, (x1, y1), (x2, y2))| {
        (
            name.to_string(),
            Anchor::Region(Region(Point(*x1, *y1), Point(*x2, *y2))),
        )
    });
    points.chain(regions).collect()
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            with_ad: anchors(
                &[
                    ("play_pause", (1135, 28)),
                    ("new_perk_bar", (1128, 74)),
                    ("perk_option_1", (1133, 242)),
                    ("perk_option_2", (1138, 345)),
                    ("perk_option_3", (1135, 448)),
                    ("close_x", (1329, 132)),
                ],
                &[
                    ("play_pause_region", (1100, 10), (1170, 45)),
                    ("new_perk_region", (1018, 63), (1228, 92)),
                    ("perk1_text_region", (994, 210), (1311, 288)),
                    ("perk2_text_region", (994, 312), (1311, 391)),
                    ("perk3_text_region", (994, 414), (1311, 493)),
                ],
            ),
            no_ad: anchors(
                &[
                    ("play_pause", (1135, 27)),
                    ("new_perk_bar", (944, 79)),
                    ("perk_option_1", (956, 245)),
                    ("perk_option_2", (957, 349)),
                    ("perk_option_3", (956, 453)),
                    ("close_x", (1145, 134)),
                ],
                &[
                    ("play_pause_region", (916, 10), (986, 45)),
                    ("new_perk_region", (832, 62), (1044, 93)),
                    ("perk1_text_region", (814, 206), (1145, 283)),
                    ("perk2_text_region", (814, 312), (1145, 391)),
                    ("perk3_text_region", (814, 418), (1145, 497)),
                ],
            ),
            ad_probes: [Point(5, 500), Point(400, 500)],
            fallback: AdState::Absent,
        }
    }
}

/// Purple penalty and the perks allowed to stay purple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Added to the rank of a purple, non-exempt card
    pub penalty: u32,
    /// Rank that is never penalized
    pub exempt_rank: PerkRank,
    /// Keyword sets (all must match) that make a purple card acceptable
    pub acceptable_purple: Vec<Vec<String>>,
}

const ACCEPTABLE_PURPLE: &[&[&str]] = &[&["cash per wave"], &["boss health"], &["tower damage", "bosses"]];

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            penalty: 10_000,
            exempt_rank: PerkRank(1),
            acceptable_purple: ACCEPTABLE_PURPLE
                .iter()
                .map(|set| set.iter().map(|k| k.to_string()).collect())
                .collect(),
        }
    }
}

/// Colors and limits of the four purple heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurpleSettings {
    pub background_color: [u8; 3],
    pub border_color: [u8; 3],
    /// Max L1 distance to the reference colors
    pub tolerance: u32,
    pub green_ceiling: u8,
    pub dark_blue_floor: u8,
    pub dark_red_ceiling: u8,
    pub magenta_red_floor: u8,
    pub magenta_green_ceiling: u8,
    pub magenta_blue_floor: u8,
    /// Sample point relative to a perk text region's top-left corner
    pub sample_offset: Point,
}

impl Default for PurpleSettings {
    fn default() -> Self {
        Self {
            background_color: [31, 3, 82],
            border_color: [239, 23, 253],
            tolerance: 40,
            green_ceiling: 20,
            dark_blue_floor: 40,
            dark_red_ceiling: 80,
            magenta_red_floor: 180,
            magenta_green_ceiling: 80,
            magenta_blue_floor: 200,
            sample_offset: Point(10, 10),
        }
    }
}

/// Keyboard keys used in chords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Ctrl,
    Shift,
    Alt,
    Char(char),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Ctrl => write!(f, "Ctrl"),
            Key::Shift => write!(f, "Shift"),
            Key::Alt => write!(f, "Alt"),
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
        }
    }
}

/// Format a chord as `Ctrl+Shift+U`
pub fn chord_label(chord: &[Key]) -> String {
    chord.iter().map(Key::to_string).collect::<Vec<_>>().join("+")
}

/// Play/pause button sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayStateSettings {
    pub probe: Point,
    pub paused_color: [u8; 3],
    pub running_color: [u8; 3],
    pub tolerance: u32,
    /// Toggle attempts before giving up on confirmation
    pub max_attempts: u32,
    /// Key chord toggling play/pause
    pub chord: Vec<Key>,
}

impl Default for PlayStateSettings {
    fn default() -> Self {
        Self {
            probe: Point(1135, 24),
            paused_color: [0xB6, 0xB8, 0xCD],
            running_color: [0x1B, 0x1E, 0x38],
            tolerance: 20,
            max_attempts: 3,
            chord: vec![Key::Ctrl, Key::Shift, Key::Char('u')],
        }
    }
}

/// How strictly the perk bar text must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStrictness {
    /// "new perk"
    Exact,
    /// "perk"
    Loose,
}

impl TriggerStrictness {
    pub fn phrase(&self) -> &'static str {
        match self {
            TriggerStrictness::Exact => "new perk",
            TriggerStrictness::Loose => "perk",
        }
    }

    /// Check raw perk bar text for the trigger phrase
    pub fn matches(&self, text: &str) -> bool {
        normalize_text(text).contains(self.phrase())
    }
}

/// Perk bar, wave and abort detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSettings {
    pub trigger: TriggerStrictness,
    /// Minimum time between two wave-1 focus events per target
    pub wave_cooldown_secs: u64,
    /// How long a wave-1 focus holds before the previous window is restored
    pub wave_focus_hold_secs: u64,
    /// Upper bound on select/close rounds for one perk bar detection
    pub max_selections_per_detection: u32,
    /// Cursor distance from a screen corner that aborts the run
    pub failsafe_margin: i32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            trigger: TriggerStrictness::Exact,
            wave_cooldown_secs: 30,
            wave_focus_hold_secs: 10,
            max_selections_per_detection: 8,
            failsafe_margin: 10,
        }
    }
}

impl DetectionSettings {
    pub fn wave_cooldown(&self) -> Duration {
        Duration::from_secs(self.wave_cooldown_secs)
    }

    pub fn wave_focus_hold(&self) -> Duration {
        Duration::from_secs(self.wave_focus_hold_secs)
    }
}

/// Timing settings for screen interactions (all in ms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Polling interval between cycles
    pub check_interval: u64,
    /// Delay after each click
    pub click_delay: u64,
    /// Wait for the perk dialog to open
    pub dialog_open_wait: u64,
    /// Wait for the perk dialog to close
    pub dialog_close_wait: u64,
    /// Pause after an unexpected error
    pub error_backoff: u64,
    /// Wait after restoring a minimized window
    pub restore_pause: u64,
    /// Granularity of abort checks while sleeping
    pub abort_slice: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            check_interval: 2000,
            click_delay: 500,
            dialog_open_wait: 5000,
            dialog_close_wait: 5000,
            error_backoff: 5000,
            restore_pause: 300,
            abort_slice: 200,
        }
    }
}

impl TimingSettings {
    /// No waiting at all, for dry runs against recorded frames
    pub fn immediate() -> Self {
        Self {
            check_interval: 0,
            click_delay: 0,
            dialog_open_wait: 0,
            dialog_close_wait: 0,
            error_backoff: 0,
            restore_pause: 0,
            abort_slice: 0,
        }
    }
}

/// Decision journal files, truncated at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalSettings {
    pub verbose_path: PathBuf,
    pub compact_path: PathBuf,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            verbose_path: PathBuf::from("perk_selection_log.txt"),
            compact_path: PathBuf::from("perks_seen.txt"),
        }
    }
}
