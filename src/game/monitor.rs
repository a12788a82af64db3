//! Multi-target polling loop
//!
//! Every cycle visits each target in order: find the window, read the perk
//! bar once, react to wave 1, then run a perk session when the bar shows
//! the trigger phrase. Only an abort stops the loop.

use std::time::{Duration, Instant};

use crate::ai::DecisionEngine;
use crate::config::{ConfigError, Settings, TargetSettings};
use crate::desktop::{AbortFlag, AbortReason, Desktop, Failsafe};
use crate::game::session::{PerkSession, SessionContext, SessionError, SessionSummary};
use crate::game::state::SessionState;
use crate::game::wave::{is_first_wave, RestoreScheduler};
use crate::journal::DecisionJournal;
use crate::vision::VisionSystem;

/// Watches the configured targets for perk offers
pub struct Monitor {
    desktop: Desktop,
    settings: Settings,
    vision: VisionSystem,
    engine: DecisionEngine,
    journal: DecisionJournal,
    failsafe: Failsafe,
    /// Per-target state, in the order of `settings.targets`
    states: Vec<SessionState>,
    restores: RestoreScheduler,
}

impl Monitor {
    pub fn new(
        settings: Settings,
        desktop: Desktop,
        journal: DecisionJournal,
        abort: AbortFlag,
    ) -> Result<Self, ConfigError> {
        let vision = VisionSystem::new(&settings)?;
        let engine = DecisionEngine::new(&settings);
        let failsafe = Failsafe::new(settings.detection.failsafe_margin, abort);

        Ok(Self {
            states: vec![SessionState::new(); settings.targets.len()],
            restores: RestoreScheduler::new(desktop.clone()),
            desktop,
            vision,
            engine,
            journal,
            failsafe,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        self.failsafe.flag()
    }

    /// State kept for the named target
    pub fn state(&self, target: &str) -> Option<&SessionState> {
        self.settings
            .targets
            .iter()
            .position(|t| t.name == target)
            .and_then(|idx| self.states.get(idx))
    }

    /// Journal the start of a run and which targets are present
    pub fn announce(&mut self) {
        self.journal.banner("PERK AUTOMATOR STARTED");
        log::info!("Configured windows:");
        for target in &self.settings.targets {
            match self.desktop.windows.find(&target.name) {
                Some(window) => {
                    log::info!("   {}: {}", target.name, window);
                    self.journal.note(&format!(
                        "Window found: {} at ({}, {})",
                        target.name, window.left, window.top
                    ));
                }
                None => {
                    log::info!("   {}: NOT FOUND", target.name);
                    self.journal.note(&format!("Window NOT found: {}", target.name));
                }
            }
        }
        log::info!("TO STOP: move the mouse to ANY corner of the screen, or press Ctrl+C");
    }

    /// Visit every target once
    pub fn poll_once(&mut self) -> Result<Vec<SessionSummary>, SessionError> {
        let Self {
            ref desktop,
            ref settings,
            ref vision,
            ref engine,
            ref mut journal,
            ref failsafe,
            ref mut states,
            ref mut restores,
        } = *self;

        let mut cx = SessionContext {
            desktop,
            settings,
            vision,
            engine,
            journal,
            failsafe,
        };

        let mut summaries = Vec::new();
        for (target, state) in settings.targets.iter().zip(states.iter_mut()) {
            failsafe.check(desktop.input.as_ref())?;
            if let Some(summary) = poll_target(&mut cx, restores, target, state)? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// Poll until an abort. Other errors are logged and retried after a
    /// fixed backoff.
    pub fn run(&mut self) -> AbortReason {
        let interval = Duration::from_millis(self.settings.timings.check_interval);
        let backoff = Duration::from_millis(self.settings.timings.error_backoff);
        let slice = Duration::from_millis(self.settings.timings.abort_slice);

        loop {
            let pause = match self.poll_once() {
                Ok(_) => interval,
                Err(SessionError::Abort(reason)) => return self.stopped(reason),
                Err(e) => {
                    log::error!("ERROR: {}", e);
                    log::info!("Waiting {:?} before retrying", backoff);
                    backoff
                }
            };

            log::debug!("Waiting {:?}", pause);
            if let Err(reason) = self.failsafe.sleep(self.desktop.input.as_ref(), pause, slice) {
                return self.stopped(reason);
            }
        }
    }

    fn stopped(&mut self, reason: AbortReason) -> AbortReason {
        log::warn!("Stopped: {}", reason);
        self.journal.note(&format!("PERK AUTOMATOR STOPPED: {}", reason));
        self.restores.cancel();
        reason
    }
}

fn poll_target(
    cx: &mut SessionContext<'_>,
    restores: &mut RestoreScheduler,
    target: &TargetSettings,
    state: &mut SessionState,
) -> Result<Option<SessionSummary>, SessionError> {
    if cx.desktop.windows.find(&target.name).is_none() {
        log::debug!("[{}] Window not found", target.name);
        return Ok(None);
    }

    let profile = cx.vision.profile_for(cx.desktop.capture.as_ref(), target);
    let text = cx.vision.read_perk_bar(
        cx.desktop.capture.as_ref(),
        cx.desktop.ocr.as_ref(),
        target,
        &profile,
    );
    log::info!("[{}] Perk bar OCR: '{}'", target.name, text);

    if is_first_wave(&text) {
        let now = Instant::now();
        if state.wave_ready(now, cx.settings.detection.wave_cooldown()) {
            state.record_wave_trigger(now);
            focus_for_first_wave(cx, restores, target);
        }
    }

    if state.observe_perk_bar(&text) {
        log::info!("[{}] Skipping perk bar until it shows digits again", target.name);
        return Ok(None);
    }
    if !cx.settings.detection.trigger.matches(&text) {
        log::info!("[{}] No new perk available", target.name);
        return Ok(None);
    }

    let summary = PerkSession::detected(target, profile).run(cx, state)?;
    Ok(Some(summary))
}

fn focus_for_first_wave(cx: &mut SessionContext<'_>, restores: &mut RestoreScheduler, target: &TargetSettings) {
    let saved = cx.desktop.windows.foreground();
    if let Some(saved) = &saved {
        log::info!("Saving current window: '{}'", saved.title);
    }
    log::info!("[{}] >>> WAVE 1 DETECTED! <<< Bringing window to focus", target.name);
    cx.journal
        .note(&format!("WAVE 1 DETECTED on {} - bringing to focus", target.name));

    if let Err(e) = cx.desktop.focus_window(&target.name) {
        log::warn!("[{}] Could not focus window: {}", target.name, e);
    }
    restores.schedule(saved, cx.settings.detection.wave_focus_hold());
}
