//! Wave-1 detection and the deferred foreground restore
//!
//! When a target reaches wave 1 it is brought to the front for a while,
//! then the window that was active before gets the focus back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::desktop::{Desktop, WindowInfo};

static WAVE_ONE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^1/\d+").ok());

/// Check perk bar text for a "1/N" wave counter at its start
pub fn is_first_wave(text: &str) -> bool {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '|' && *c != ' ')
        .collect();
    WAVE_ONE.as_ref().is_some_and(|re| re.is_match(&cleaned))
}

struct PendingRestore {
    snapshot: WindowInfo,
    cancel: Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PendingRestore {
    /// Cancel and wait for the thread. Returns whether the restore ran.
    fn cancel(self) -> bool {
        // A send error means the thread already finished
        let _ = self.cancel.send(());
        self.join()
    }

    fn join(self) -> bool {
        if self.handle.join().is_err() {
            log::error!("Foreground restore thread panicked");
        }
        self.fired.load(Ordering::SeqCst)
    }
}

/// Owns at most one pending foreground restore.
///
/// Dropping the scheduler cancels the pending restore.
pub struct RestoreScheduler {
    desktop: Desktop,
    pending: Option<PendingRestore>,
}

impl RestoreScheduler {
    pub fn new(desktop: Desktop) -> Self {
        Self { desktop, pending: None }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedule `snapshot` to be focused again after `delay`.
    ///
    /// A restore that has not run yet is cancelled and its snapshot kept,
    /// so the window active before the first event is the one restored.
    /// Returns whether a restore is now pending.
    pub fn schedule(&mut self, mut snapshot: Option<WindowInfo>, delay: Duration) -> bool {
        if let Some(previous) = self.pending.take() {
            let earlier = previous.snapshot.clone();
            if !previous.cancel() {
                log::debug!("Reusing pending restore of '{}'", earlier.title);
                snapshot = Some(earlier);
            }
        }

        let Some(snapshot) = snapshot else {
            return false;
        };

        let (cancel, cancelled) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let desktop = self.desktop.clone();
        let target = snapshot.clone();
        let flag = fired.clone();

        let handle = thread::spawn(move || match cancelled.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {
                flag.store(true, Ordering::SeqCst);
                log::info!("Restoring previous window after {:?}", delay);
                desktop.restore_foreground(&target);
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                log::debug!("Restore of '{}' cancelled", target.title);
            }
        });

        self.pending = Some(PendingRestore {
            snapshot,
            cancel,
            fired,
            handle,
        });
        true
    }

    /// Block until the pending restore has run or been cancelled.
    ///
    /// Returns whether a restore ran.
    pub fn wait(&mut self) -> bool {
        self.pending.take().is_some_and(PendingRestore::join)
    }

    /// Drop the pending restore without running it
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

impl Drop for RestoreScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::testing::ScriptedDesktop;
    use std::time::Instant;

    #[test]
    fn test_first_wave_pattern() {
        assert!(is_first_wave("1/200"));
        assert!(is_first_wave(" 1 / 150 |"));
        assert!(is_first_wave("|1/5 new perk"));
        assert!(!is_first_wave("11/200"));
        assert!(!is_first_wave("12/200"));
        assert!(!is_first_wave("new perk"));
        assert!(!is_first_wave("1/"));
        assert!(!is_first_wave(""));
    }

    #[test]
    fn test_restore_runs_after_delay() {
        let scripted = ScriptedDesktop::new();
        let editor = scripted.add_window("Editor", 0, 0);
        scripted.add_window("Emulator", 100, 50);
        let desktop = scripted.desktop();
        let mut scheduler = RestoreScheduler::new(desktop.clone());

        assert!(scheduler.schedule(Some(editor), Duration::from_millis(10)));
        desktop.focus_window("Emulator").unwrap();

        assert!(scheduler.wait());
        assert!(!scheduler.is_pending());
        assert_eq!(desktop.windows.foreground().map(|w| w.title), Some("Editor".to_string()));
    }

    #[test]
    fn test_nothing_to_restore() {
        let scripted = ScriptedDesktop::new();
        let mut scheduler = RestoreScheduler::new(scripted.desktop());
        assert!(!scheduler.schedule(None, Duration::from_millis(10)));
        assert!(!scheduler.wait());
    }

    #[test]
    fn test_drop_cancels_pending_restore() {
        let scripted = ScriptedDesktop::new();
        let editor = scripted.add_window("Editor", 0, 0);
        scripted.add_window("Emulator", 100, 50);
        let desktop = scripted.desktop();
        desktop.focus_window("Emulator").unwrap();

        let started = Instant::now();
        {
            let mut scheduler = RestoreScheduler::new(desktop.clone());
            scheduler.schedule(Some(editor), Duration::from_secs(60));
        }
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(desktop.windows.foreground().map(|w| w.title), Some("Emulator".to_string()));
    }

    #[test]
    fn test_second_event_keeps_first_snapshot() {
        let scripted = ScriptedDesktop::new();
        let editor = scripted.add_window("Editor", 0, 0);
        let first = scripted.add_window("Emulator A", 100, 50);
        scripted.add_window("Emulator B", 200, 50);
        let desktop = scripted.desktop();
        let mut scheduler = RestoreScheduler::new(desktop.clone());

        // Wave 1 on A while the editor is active, then on B while A is
        scheduler.schedule(Some(editor), Duration::from_secs(60));
        desktop.focus_window("Emulator A").unwrap();
        scheduler.schedule(Some(first), Duration::from_millis(10));
        desktop.focus_window("Emulator B").unwrap();

        assert!(scheduler.wait());
        assert_eq!(desktop.windows.foreground().map(|w| w.title), Some("Editor".to_string()));
    }
}
