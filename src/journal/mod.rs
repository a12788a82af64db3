//! Decision journal
//!
//! Two append-only UTF-8 files, truncated when the journal is opened:
//! a verbose log with one block per perk decision plus timestamped notes,
//! and a compact list of every perk seen. Each write reopens the file in
//! append mode so a crash loses nothing already written.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::ai::{PerkDecision, SelectionOutcome};
use crate::config::JournalSettings;
use crate::vision::capture::hex_color;

const RULE_WIDTH: usize = 70;

/// Destination for journal text
pub trait JournalSink: Send {
    fn append(&mut self, text: &str) -> io::Result<()>;
}

/// File opened in append mode for every write
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create or truncate the file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalSink for FileSink {
    fn append(&mut self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}

/// In-memory sink whose contents can be read through any clone
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Arc<Mutex<String>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl JournalSink for MemorySink {
    fn append(&mut self, text: &str) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "journal buffer poisoned"))?
            .push_str(text);
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Writes perk decisions and notable events
pub struct DecisionJournal {
    verbose: Box<dyn JournalSink>,
    compact: Box<dyn JournalSink>,
}

impl DecisionJournal {
    pub fn new(verbose: Box<dyn JournalSink>, compact: Box<dyn JournalSink>) -> Self {
        Self { verbose, compact }
    }

    /// Create (or truncate) both journal files
    pub fn open(settings: &JournalSettings) -> io::Result<Self> {
        let verbose = FileSink::create(&settings.verbose_path)?;
        let compact = FileSink::create(&settings.compact_path)?;
        log::info!(
            "Journal files initialized: {}, {}",
            verbose.path().display(),
            compact.path().display()
        );
        Ok(Self::new(Box::new(verbose), Box::new(compact)))
    }

    /// Journal kept in memory, with handles to read both logs back
    pub fn in_memory() -> (Self, MemorySink, MemorySink) {
        let verbose = MemorySink::new();
        let compact = MemorySink::new();
        let journal = Self::new(Box::new(verbose.clone()), Box::new(compact.clone()));
        (journal, verbose, compact)
    }

    /// Timestamped line in the verbose log
    pub fn note(&mut self, message: &str) {
        let line = format!("[{}] {}\n", timestamp(), message);
        Self::write(self.verbose.as_mut(), &line);
    }

    pub fn banner(&mut self, title: &str) {
        let rule = "=".repeat(RULE_WIDTH);
        self.note(&rule);
        self.note(title);
        self.note(&rule);
    }

    /// Write the full diagnostics of one decision to both logs
    pub fn record_decision(&mut self, window: &str, list_name: &str, decision: &PerkDecision) {
        let ts = timestamp();
        let rule = "=".repeat(RULE_WIDTH);

        let mut block = format!("\n{rule}\n[{ts}] PERK SELECTION - {window}\n{rule}\n");
        block.push_str(&format!("  Perk List Used: {list_name}\n"));
        for obs in &decision.observations {
            let n = obs.number();
            block.push_str(&format!("  Perk {n}: {}\n", obs.raw_text));
            block.push_str(&format!("  Perk {n} Priority: {}\n", obs.base_rank));
            if let Some(color) = obs.background {
                block.push_str(&format!(
                    "  Perk {n} Background: RGB({}, {}, {}) | Hex: {}\n",
                    color[0],
                    color[1],
                    color[2],
                    hex_color(color)
                ));
            }
            block.push_str(&format!("  Perk {n} Is Purple: {}\n", python_bool(obs.is_purple)));
            block.push_str(&format!("  Perk {n} Effective Priority: {}\n\n", obs.effective_rank));
        }

        match (decision.outcome, decision.selected()) {
            (SelectionOutcome::Selected { .. }, Some(chosen)) => {
                let note = decision.note().map(|n| format!(" ({n})")).unwrap_or_default();
                block.push_str(&format!(
                    "  >>> SELECTED: Perk {} (Effective Priority {}){}\n",
                    chosen.number(),
                    chosen.effective_rank,
                    note
                ));
            }
            (outcome, _) => block.push_str(&format!("  >>> SELECTED: {outcome}\n")),
        }
        block.push_str(&format!("{rule}\n\n"));
        Self::write(self.verbose.as_mut(), &block);

        let chosen = decision.selected().map(|o| o.slot);
        let mut lines = String::new();
        for obs in &decision.observations {
            let marker = if Some(obs.slot) == chosen {
                ">>> SELECTED"
            } else {
                "    not selected"
            };
            lines.push_str(&format!(
                "[{ts}] [{window}] Priority {:4} | {marker} | {}\n",
                obs.base_rank.value(),
                obs.raw_text
            ));
        }
        Self::write(self.compact.as_mut(), &lines);
    }

    fn write(sink: &mut dyn JournalSink, text: &str) {
        if let Err(e) = sink.append(text) {
            log::warn!("Failed to write journal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{PerkRank, PerkSelector};
    use image::Rgb;

    fn decision() -> PerkDecision {
        let selector = PerkSelector::default();
        selector.select(vec![
            selector.observe(0, "Golden Tower", PerkRank(3), false, Some(Rgb([20, 35, 80]))),
            selector.observe(1, "Orbs +1", PerkRank(18), true, Some(Rgb([31, 3, 82]))),
        ])
    }

    #[test]
    fn test_verbose_block() {
        let (mut journal, verbose, _) = DecisionJournal::in_memory();
        journal.record_decision("Maximus Bluestack", "default", &decision());

        let text = verbose.contents();
        assert!(text.contains("] PERK SELECTION - Maximus Bluestack\n"));
        assert!(text.contains("  Perk List Used: default\n"));
        assert!(text.contains("  Perk 2 Background: RGB(31, 3, 82) | Hex: #1F0352\n"));
        assert!(text.contains("  Perk 2 Is Purple: True\n"));
        assert!(text.contains("  Perk 1 Effective Priority: 3\n"));
        assert!(text.contains("  Perk 2 Effective Priority: 10018\n"));
        assert!(text.contains("  >>> SELECTED: Perk 1 (Effective Priority 3)\n"));
    }

    #[test]
    fn test_compact_lines() {
        let (mut journal, _, compact) = DecisionJournal::in_memory();
        journal.record_decision("Emulator", "default", &decision());

        let text = compact.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Emulator] Priority    3 | >>> SELECTED | Golden Tower"));
        assert!(lines[1].ends_with("[Emulator] Priority   18 |     not selected | Orbs +1"));
    }

    #[test]
    fn test_abstain_block() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            selector.observe(0, "Black Hole", PerkRank(6), true, None),
            selector.observe(1, "Orbs", PerkRank(18), true, None),
        ]);
        let (mut journal, verbose, compact) = DecisionJournal::in_memory();
        journal.record_decision("Emulator", "default", &decision);

        assert!(verbose.contents().contains("  >>> SELECTED: NONE - ALL PURPLE\n"));
        assert!(!verbose.contents().contains("Background"));
        assert!(!compact.contents().contains(">>> SELECTED"));
    }

    #[test]
    fn test_files_are_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JournalSettings {
            verbose_path: dir.path().join("perk_selection_log.txt"),
            compact_path: dir.path().join("perks_seen.txt"),
        };
        std::fs::write(&settings.verbose_path, "old run\n").unwrap();

        let mut journal = DecisionJournal::open(&settings).unwrap();
        journal.note("PERK AUTOMATOR STARTED");
        journal.record_decision("Emulator", "default", &decision());

        let verbose = std::fs::read_to_string(&settings.verbose_path).unwrap();
        assert!(!verbose.contains("old run"));
        assert!(verbose.contains("] PERK AUTOMATOR STARTED\n"));
        let compact = std::fs::read_to_string(&settings.compact_path).unwrap();
        assert_eq!(compact.lines().count(), 2);
    }
}
