//! Perk decision engine
//!
//! Ranks the OCR text of each offered perk, applies the purple penalty and
//! picks the card to click.

pub mod matcher;
pub mod selector;

use crate::config::Settings;
use crate::vision::CardReading;

pub use matcher::{PerkRank, PriorityBook, PriorityList, PriorityMatcher, PriorityRule};
pub use selector::{PerkDecision, PerkObservation, PerkSelector, SelectionOutcome};

/// Main decision engine that coordinates ranking and selection
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    matcher: PriorityMatcher,
    selector: PerkSelector,
}

impl DecisionEngine {
    pub fn new(settings: &Settings) -> Self {
        Self {
            matcher: PriorityMatcher::new(settings.priorities.clone()),
            selector: PerkSelector::new(&settings.selection),
        }
    }

    /// Rank raw text with the list used for the window
    pub fn rank(&self, raw: &str, window: &str) -> PerkRank {
        self.matcher.match_text(raw, window)
    }

    pub fn list_for(&self, window: &str) -> &PriorityList {
        self.matcher.list_for(window)
    }

    /// Decide which of the read cards to pick
    pub fn decide(&self, window: &str, cards: &[CardReading]) -> PerkDecision {
        let list = self.matcher.list_for(window);
        let observations = cards
            .iter()
            .enumerate()
            .map(|(slot, card)| {
                let rank = self.matcher.rank_in(&card.text, list);
                let observation = self.selector.observe(slot, &card.text, rank, card.is_purple, card.background);
                log::info!(
                    "[{}] Perk {}: '{}' -> priority {}{} (effective {})",
                    window,
                    observation.number(),
                    card.text,
                    rank,
                    if card.is_purple { ", purple" } else { "" },
                    observation.effective_rank
                );
                observation
            })
            .collect();

        let decision = self.selector.select(observations);
        match decision.outcome {
            SelectionOutcome::Selected { .. } => {
                log::info!("[{}] Selecting {} using list '{}'", window, decision.outcome, list.name)
            }
            SelectionOutcome::AllPurple => {
                log::info!("[{}] Every perk is purple and none is acceptable, skipping", window)
            }
            SelectionOutcome::Unrecognized => log::warn!("[{}] No perk recognized", window),
        }
        decision
    }
}
