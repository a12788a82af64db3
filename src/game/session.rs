//! Perk selection session
//!
//! One session covers a single perk bar detection on one target: pause the
//! game, open the perk dialog, pick a card, close the dialog and repeat
//! while more perks are waiting, then resume the game and hand the focus
//! back to the window that had it.

use std::time::Duration;

use crate::ai::{DecisionEngine, SelectionOutcome};
use crate::config::{Settings, TargetSettings};
use crate::desktop::{AbortReason, DeskAction, DeskError, Desktop, Failsafe, InputError, InputExecutor, InputPlanner, WindowInfo};
use crate::game::state::{PlayState, SessionPhase, SessionState};
use crate::journal::DecisionJournal;
use crate::vision::{CoordinateProfile, VisionSystem};

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Aborted: {0}")]
    Abort(#[from] AbortReason),
    #[error("Input failed: {0}")]
    Input(#[from] InputError),
}

impl From<DeskError> for SessionError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::Abort(reason) => SessionError::Abort(reason),
            DeskError::Input(err) => SessionError::Input(err),
        }
    }
}

impl SessionError {
    /// Only an abort ends the monitoring loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Abort(_))
    }
}

/// Everything a session needs from the monitor
pub struct SessionContext<'a> {
    pub desktop: &'a Desktop,
    pub settings: &'a Settings,
    pub vision: &'a VisionSystem,
    pub engine: &'a DecisionEngine,
    pub journal: &'a mut DecisionJournal,
    pub failsafe: &'a Failsafe,
}

/// What a finished session did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub target: String,
    /// Cards clicked
    pub selections: u32,
    /// Dialogs where no card text was recognized
    pub unrecognized: u32,
    /// The offer was all purple and left untouched
    pub skipped_all_purple: bool,
    /// Dialogs opened
    pub rounds: u32,
}

/// Drives one target through the selection phases
pub struct PerkSession<'t> {
    target: &'t TargetSettings,
    profile: CoordinateProfile,
    phase: SessionPhase,
    saved_foreground: Option<WindowInfo>,
    summary: SessionSummary,
}

impl<'t> PerkSession<'t> {
    /// Session that starts by reading the perk bar
    pub fn new(target: &'t TargetSettings, profile: CoordinateProfile) -> Self {
        Self {
            target,
            profile,
            phase: SessionPhase::Idle,
            saved_foreground: None,
            summary: SessionSummary {
                target: target.name.clone(),
                ..SessionSummary::default()
            },
        }
    }

    /// Session for a perk bar that already showed the trigger
    pub fn detected(target: &'t TargetSettings, profile: CoordinateProfile) -> Self {
        let mut session = Self::new(target, profile);
        session.phase = SessionPhase::PerkBarDetected;
        session
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Run until the session is done
    pub fn run(mut self, cx: &mut SessionContext<'_>, state: &mut SessionState) -> Result<SessionSummary, SessionError> {
        while self.phase != SessionPhase::Done {
            self.step(cx, state)?;
        }
        Ok(self.summary)
    }

    /// Perform the work of the current phase and move to the next one
    pub fn step(&mut self, cx: &mut SessionContext<'_>, state: &mut SessionState) -> Result<SessionPhase, SessionError> {
        let target = self.target;
        let window = target.name.as_str();
        let next = match self.phase {
            SessionPhase::Idle => {
                let text = self.read_perk_bar(cx);
                if state.observe_perk_bar(&text) {
                    log::info!("[{}] Skipping perk bar until it shows digits again", window);
                    SessionPhase::Done
                } else if cx.settings.detection.trigger.matches(&text) {
                    SessionPhase::PerkBarDetected
                } else {
                    log::debug!("[{}] No new perk available", window);
                    SessionPhase::Done
                }
            }
            SessionPhase::PerkBarDetected => {
                if self.summary.rounds == 0 {
                    self.saved_foreground = cx.desktop.windows.foreground();
                    if let Some(saved) = &self.saved_foreground {
                        log::info!("Saving current window: '{}'", saved.title);
                    }
                    log::info!(">>> [{}] NEW PERK DETECTED! <<<", window);
                    SessionPhase::Pausing
                } else {
                    log::info!("[{}] More perks available, selecting another", window);
                    self.open_dialog(cx)?;
                    SessionPhase::DialogOpen
                }
            }
            SessionPhase::Pausing => {
                log::info!("[{}] Ensuring game is paused", window);
                self.ensure_play_state(cx, state, PlayState::Paused)?;
                self.open_dialog(cx)?;
                SessionPhase::DialogOpen
            }
            SessionPhase::DialogOpen => {
                self.profile = cx.vision.profile_for(cx.desktop.capture.as_ref(), target);
                SessionPhase::Selecting
            }
            SessionPhase::Selecting => self.select(cx, state)?,
            SessionPhase::Closing { resume_next } => {
                log::info!("[{}] Closing perk window", window);
                let actions = self.planner(cx).click_and_wait(
                    self.profile.close_x,
                    "Close X",
                    cx.settings.timings.dialog_close_wait,
                );
                self.execute(cx, &actions)?;

                if resume_next {
                    SessionPhase::Resuming
                } else {
                    self.after_close(cx)
                }
            }
            SessionPhase::Resuming => {
                log::info!("[{}] Ensuring game is running", window);
                self.ensure_play_state(cx, state, PlayState::Running)?;
                log::info!(">>> [{}] Perk selection complete! <<<", window);
                self.restore_foreground(cx)?;
                SessionPhase::Done
            }
            SessionPhase::Done => SessionPhase::Done,
        };

        if next != self.phase {
            log::debug!("[{}] {} -> {}", window, self.phase, next);
        }
        self.phase = next;
        Ok(next)
    }

    fn read_perk_bar(&self, cx: &SessionContext<'_>) -> String {
        let text = cx.vision.read_perk_bar(
            cx.desktop.capture.as_ref(),
            cx.desktop.ocr.as_ref(),
            self.target,
            &self.profile,
        );
        log::info!("[{}] Perk bar OCR: '{}'", self.target.name, text);
        text
    }

    fn open_dialog(&mut self, cx: &SessionContext<'_>) -> Result<(), SessionError> {
        log::info!("[{}] Opening perk window", self.target.name);
        let actions = self.planner(cx).click_and_wait(
            self.profile.new_perk_bar,
            "New Perk Bar",
            cx.settings.timings.dialog_open_wait,
        );
        self.execute(cx, &actions)?;
        self.summary.rounds += 1;
        Ok(())
    }

    fn select(&mut self, cx: &mut SessionContext<'_>, state: &mut SessionState) -> Result<SessionPhase, SessionError> {
        let target = self.target;
        let window = target.name.as_str();
        let cards: Vec<_> = self
            .profile
            .slots(target.slots)
            .iter()
            .map(|slot| {
                cx.vision
                    .read_card(cx.desktop.capture.as_ref(), cx.desktop.ocr.as_ref(), target, slot)
            })
            .collect();

        let decision = cx.engine.decide(window, &cards);
        cx.journal
            .record_decision(window, &cx.engine.list_for(window).name, &decision);

        match decision.outcome {
            SelectionOutcome::Selected { slot } => {
                let option = self.profile.perk_slots[slot].option;
                let label = format!("Perk Option {}", slot + 1);
                let actions =
                    self.planner(cx)
                        .click_and_wait(option, &label, cx.settings.timings.dialog_close_wait);
                self.execute(cx, &actions)?;
                self.summary.selections += 1;
                Ok(SessionPhase::Closing { resume_next: false })
            }
            SelectionOutcome::AllPurple => {
                state.arm_skip();
                self.summary.skipped_all_purple = true;
                Ok(SessionPhase::Closing { resume_next: true })
            }
            SelectionOutcome::Unrecognized => {
                self.summary.unrecognized += 1;
                Ok(SessionPhase::Closing { resume_next: false })
            }
        }
    }

    fn after_close(&mut self, cx: &SessionContext<'_>) -> SessionPhase {
        let target = self.target;
        let window = target.name.as_str();
        self.profile = cx.vision.profile_for(cx.desktop.capture.as_ref(), target);
        let text = self.read_perk_bar(cx);

        if !cx.settings.detection.trigger.matches(&text) {
            log::info!("[{}] No more perks available", window);
            return SessionPhase::Resuming;
        }

        let limit = cx.settings.detection.max_selections_per_detection;
        if self.summary.rounds >= limit {
            log::warn!(
                "[{}] Perk bar still showing after {} rounds, giving up on this detection",
                window,
                limit
            );
            return SessionPhase::Resuming;
        }
        SessionPhase::PerkBarDetected
    }

    /// Press the play/pause chord until the button shows `wanted`.
    ///
    /// Returns whether the state was confirmed; an unconfirmed state is
    /// only a warning.
    fn ensure_play_state(
        &self,
        cx: &SessionContext<'_>,
        state: &mut SessionState,
        wanted: PlayState,
    ) -> Result<bool, SessionError> {
        let window = self.target.name.as_str();
        let play = &cx.settings.play_state;

        for attempt in 1..=play.max_attempts {
            let current = cx.vision.play_state(cx.desktop.capture.as_ref(), window);
            state.play_state = current;
            if current == wanted {
                log::info!("[{}] Game is {} (confirmed)", window, wanted);
                return Ok(true);
            }
            log::info!(
                "[{}] Game is {}, pressing play/pause (attempt {})",
                window,
                current,
                attempt
            );
            let actions = self.planner(cx).toggle_play(&play.chord);
            self.execute(cx, &actions)?;
        }

        let current = cx.vision.play_state(cx.desktop.capture.as_ref(), window);
        state.play_state = current;
        if current == wanted {
            log::info!("[{}] Game is {} (confirmed)", window, wanted);
            Ok(true)
        } else {
            log::warn!("[{}] Could not confirm game is {}", window, wanted);
            Ok(false)
        }
    }

    fn restore_foreground(&mut self, cx: &SessionContext<'_>) -> Result<(), SessionError> {
        let Some(saved) = self.saved_foreground.take() else {
            return Ok(());
        };
        log::info!("[{}] Restoring previous window", self.target.name);
        cx.failsafe.sleep(
            cx.desktop.input.as_ref(),
            Duration::from_millis(cx.settings.timings.restore_pause),
            Duration::from_millis(cx.settings.timings.abort_slice),
        )?;
        cx.desktop.restore_foreground(&saved);
        Ok(())
    }

    fn planner(&self, cx: &SessionContext<'_>) -> InputPlanner {
        let window = cx.desktop.windows.find(&self.target.name);
        InputPlanner::for_window(window.as_ref()).with_delay(cx.settings.timings.click_delay)
    }

    fn execute(&self, cx: &SessionContext<'_>, actions: &[DeskAction]) -> Result<(), SessionError> {
        InputExecutor::new(cx.desktop, cx.failsafe, &self.target.name)
            .with_abort_slice(cx.settings.timings.abort_slice)
            .run(actions)?;
        Ok(())
    }
}
