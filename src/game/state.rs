//! Per-target session state
//!
//! Tracks the play/pause state, the perk bar skip latch and the wave-1
//! cooldown of one monitored window.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// State of the in-game play/pause button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Paused,
    Running,
    Unknown,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Paused => write!(f, "paused"),
            PlayState::Running => write!(f, "running"),
            PlayState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Phase of one perk selection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the perk bar
    Idle,
    /// Perk bar shows the trigger phrase
    PerkBarDetected,
    /// Making sure the game is paused
    Pausing,
    /// Perk dialog clicked open
    DialogOpen,
    /// Reading the cards and clicking one
    Selecting,
    /// Closing the dialog; `resume_next` skips the perk bar re-check
    Closing { resume_next: bool },
    /// Making sure the game runs again
    Resuming,
    /// Session over
    Done,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::PerkBarDetected => write!(f, "PerkBarDetected"),
            SessionPhase::Pausing => write!(f, "Pausing"),
            SessionPhase::DialogOpen => write!(f, "DialogOpen"),
            SessionPhase::Selecting => write!(f, "Selecting"),
            SessionPhase::Closing { .. } => write!(f, "Closing"),
            SessionPhase::Resuming => write!(f, "Resuming"),
            SessionPhase::Done => write!(f, "Done"),
        }
    }
}

/// State carried across polling cycles for one target
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Last confirmed play/pause state
    pub play_state: PlayState,
    /// Ignore the perk bar until its text shows a digit again
    skip_until_digits: bool,
    /// When the last wave-1 focus fired
    last_wave_trigger: Option<Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            play_state: PlayState::Unknown,
            skip_until_digits: false,
            last_wave_trigger: None,
        }
    }

    /// Arm the skip latch after skipping an all-purple offer
    pub fn arm_skip(&mut self) {
        self.skip_until_digits = true;
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_until_digits
    }

    /// Feed a perk bar reading into the latch.
    ///
    /// Returns whether the latch is still armed.
    pub fn observe_perk_bar(&mut self, text: &str) -> bool {
        if self.skip_until_digits && crate::vision::ocr::has_digit(text) {
            log::debug!("Perk bar shows digits again ('{}'), clearing skip latch", text);
            self.skip_until_digits = false;
        }
        self.skip_until_digits
    }

    /// Check if the wave-1 cooldown has elapsed
    pub fn wave_ready(&self, now: Instant, cooldown: Duration) -> bool {
        self.last_wave_trigger
            .map_or(true, |last| now.saturating_duration_since(last) >= cooldown)
    }

    pub fn record_wave_trigger(&mut self, now: Instant) {
        self.last_wave_trigger = Some(now);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
