//! Click and key sequences
//!
//! Window-relative anchors are turned into absolute screen actions by an
//! `InputPlanner`, then played back by an `InputExecutor` with a failsafe
//! check and a window focus before every input.

use std::time::Duration;

use super::{DeskError, Desktop, Failsafe, WindowInfo};
use crate::config::{chord_label, Key};
use crate::vision::Point;

/// One step of an input sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskAction {
    /// Left click at absolute screen coordinates
    Click { x: i32, y: i32, label: String },
    /// Press keys together
    KeyChord(Vec<Key>),
    /// Wait for a specified duration
    Wait { duration_ms: u64 },
}

/// Builds action sequences for one window
#[derive(Debug, Clone)]
pub struct InputPlanner {
    origin: Point,
    click_delay: u64,
}

impl InputPlanner {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            click_delay: 500,
        }
    }

    /// Planner for a window; a missing window puts the origin at (0, 0)
    pub fn for_window(window: Option<&WindowInfo>) -> Self {
        Self::new(window.map(WindowInfo::origin).unwrap_or(Point(0, 0)))
    }

    /// Set the pause after each click or chord
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.click_delay = delay_ms;
        self
    }

    /// Convert a window-relative point to screen coordinates
    pub fn to_screen(&self, at: Point) -> Point {
        at.offset(self.origin.x(), self.origin.y())
    }

    /// Click a window-relative point
    pub fn click(&self, at: Point, label: &str) -> Vec<DeskAction> {
        let Point(x, y) = self.to_screen(at);
        vec![
            DeskAction::Click {
                x,
                y,
                label: label.to_string(),
            },
            DeskAction::Wait {
                duration_ms: self.click_delay,
            },
        ]
    }

    /// Click, then wait for the UI to settle
    pub fn click_and_wait(&self, at: Point, label: &str, settle_ms: u64) -> Vec<DeskAction> {
        let mut actions = self.click(at, label);
        if settle_ms > 0 {
            actions.push(DeskAction::Wait { duration_ms: settle_ms });
        }
        actions
    }

    /// Press the play/pause chord and give the game time to react
    pub fn toggle_play(&self, chord: &[Key]) -> Vec<DeskAction> {
        vec![
            DeskAction::KeyChord(chord.to_vec()),
            DeskAction::Wait {
                duration_ms: self.click_delay * 2,
            },
        ]
    }
}

/// Plays action sequences against the desktop
pub struct InputExecutor<'a> {
    desktop: &'a Desktop,
    failsafe: &'a Failsafe,
    window: &'a str,
    abort_slice: Duration,
}

impl<'a> InputExecutor<'a> {
    pub fn new(desktop: &'a Desktop, failsafe: &'a Failsafe, window: &'a str) -> Self {
        Self {
            desktop,
            failsafe,
            window,
            abort_slice: Duration::from_millis(200),
        }
    }

    pub fn with_abort_slice(mut self, slice_ms: u64) -> Self {
        self.abort_slice = Duration::from_millis(slice_ms);
        self
    }

    /// Run the actions in order.
    ///
    /// A window that cannot be focused is logged and input goes ahead.
    pub fn run(&self, actions: &[DeskAction]) -> Result<(), DeskError> {
        for action in actions {
            match action {
                DeskAction::Click { x, y, label } => {
                    self.prepare()?;
                    log::info!("[{}] Clicking {} at ({}, {})", self.window, label, x, y);
                    self.desktop.input.click(*x, *y)?;
                }
                DeskAction::KeyChord(keys) => {
                    self.prepare()?;
                    log::info!("[{}] Pressing {}", self.window, chord_label(keys));
                    self.desktop.input.key_chord(keys)?;
                }
                DeskAction::Wait { duration_ms } => {
                    self.failsafe.sleep(
                        self.desktop.input.as_ref(),
                        Duration::from_millis(*duration_ms),
                        self.abort_slice,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn prepare(&self) -> Result<(), DeskError> {
        self.failsafe.check(self.desktop.input.as_ref())?;
        if let Err(e) = self.desktop.focus_window(self.window) {
            log::warn!("[{}] Could not focus window: {}", self.window, e);
        }
        Ok(())
    }
}
