//! Perk selection
//!
//! Combines the matched rank of each offered perk with its purple flag and
//! picks exactly one card, or abstains.

use std::fmt;

use image::Rgb;

use super::matcher::PerkRank;
use crate::config::SelectionSettings;
use crate::vision::ocr::normalize_text;

/// One offered perk as seen in a single detection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerkObservation {
    /// Zero-based card index
    pub slot: usize,
    pub raw_text: String,
    pub base_rank: PerkRank,
    pub is_purple: bool,
    pub background: Option<Rgb<u8>>,
    /// Purple but listed as acceptable, so never penalized
    pub purple_acceptable: bool,
    /// Base rank is the one rank that is never penalized
    pub rank_exempt: bool,
    /// Base rank plus the purple penalty where it applies
    pub effective_rank: u32,
}

impl PerkObservation {
    /// One-based card number, as shown to the user
    pub fn number(&self) -> usize {
        self.slot + 1
    }
}

/// Result of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Click this card (zero-based)
    Selected { slot: usize },
    /// Every card is purple and none is acceptable
    AllPurple,
    /// No card text was recognized
    Unrecognized,
}

impl fmt::Display for SelectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionOutcome::Selected { slot } => write!(f, "Perk {}", slot + 1),
            SelectionOutcome::AllPurple => write!(f, "NONE - ALL PURPLE"),
            SelectionOutcome::Unrecognized => write!(f, "NONE - UNRECOGNIZED"),
        }
    }
}

/// Observations together with the outcome, for clicking and journaling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerkDecision {
    pub observations: Vec<PerkObservation>,
    pub outcome: SelectionOutcome,
}

impl PerkDecision {
    pub fn selected(&self) -> Option<&PerkObservation> {
        match self.outcome {
            SelectionOutcome::Selected { slot } => self.observations.iter().find(|o| o.slot == slot),
            _ => None,
        }
    }

    /// Why a purple card was picked anyway
    pub fn note(&self) -> Option<&'static str> {
        let chosen = self.selected()?;
        if !chosen.is_purple {
            return None;
        }
        if self.observations.iter().all(|o| o.is_purple) {
            Some("purple but other is worse")
        } else if chosen.rank_exempt {
            Some("purple but exempt")
        } else {
            None
        }
    }
}

/// Applies the purple penalty and picks the best card
#[derive(Debug, Clone)]
pub struct PerkSelector {
    penalty: u32,
    exempt_rank: PerkRank,
    acceptable_purple: Vec<Vec<String>>,
}

impl PerkSelector {
    pub fn new(settings: &SelectionSettings) -> Self {
        Self {
            penalty: settings.penalty,
            exempt_rank: settings.exempt_rank,
            acceptable_purple: settings
                .acceptable_purple
                .iter()
                .map(|set| set.iter().map(|k| normalize_text(k)).collect())
                .collect(),
        }
    }

    /// Check if a purple card with this text may be picked without penalty
    pub fn is_acceptable_purple(&self, raw_text: &str) -> bool {
        let text = normalize_text(raw_text);
        self.acceptable_purple
            .iter()
            .any(|set| !set.is_empty() && set.iter().all(|k| text.contains(k.as_str())))
    }

    pub fn effective_rank(&self, base_rank: PerkRank, is_purple: bool, acceptable: bool) -> u32 {
        if is_purple && base_rank != self.exempt_rank && !acceptable {
            base_rank.value().saturating_add(self.penalty)
        } else {
            base_rank.value()
        }
    }

    /// Build the observation for one card
    pub fn observe(
        &self,
        slot: usize,
        raw_text: &str,
        base_rank: PerkRank,
        is_purple: bool,
        background: Option<Rgb<u8>>,
    ) -> PerkObservation {
        let purple_acceptable = is_purple && self.is_acceptable_purple(raw_text);
        PerkObservation {
            slot,
            raw_text: raw_text.to_string(),
            base_rank,
            is_purple,
            background,
            purple_acceptable,
            rank_exempt: base_rank == self.exempt_rank,
            effective_rank: self.effective_rank(base_rank, is_purple, purple_acceptable),
        }
    }

    /// Pick a card.
    ///
    /// Abstains when every card is purple and unacceptable, or when no card
    /// was recognized; otherwise the lowest effective rank wins with ties
    /// going to the lowest slot.
    pub fn select(&self, observations: Vec<PerkObservation>) -> PerkDecision {
        let outcome = if observations.is_empty() {
            SelectionOutcome::Unrecognized
        } else if observations.iter().all(|o| o.is_purple && !o.purple_acceptable) {
            SelectionOutcome::AllPurple
        } else if observations.iter().all(|o| !o.base_rank.is_ranked()) {
            SelectionOutcome::Unrecognized
        } else {
            observations
                .iter()
                .min_by_key(|o| (o.effective_rank, o.slot))
                .map(|o| SelectionOutcome::Selected { slot: o.slot })
                .unwrap_or(SelectionOutcome::Unrecognized)
        };

        PerkDecision { observations, outcome }
    }
}

impl Default for PerkSelector {
    fn default() -> Self {
        Self::new(&SelectionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(selector: &PerkSelector, slot: usize, text: &str, rank: u32, purple: bool) -> PerkObservation {
        selector.observe(slot, text, PerkRank(rank), purple, None)
    }

    #[test]
    fn test_penalty_flips_ordering() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Black Hole", 6, true),
            card(&selector, 1, "Orbs +1", 18, false),
        ]);
        assert_eq!(decision.observations[0].effective_rank, 10_006);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
        assert_eq!(decision.note(), None);
    }

    #[test]
    fn test_all_purple_abstains() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Black Hole", 6, true),
            card(&selector, 1, "Orbs +1", 18, true),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::AllPurple);
        assert!(decision.selected().is_none());
    }

    #[test]
    fn test_all_purple_abstains_even_with_exempt_rank() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Enemies Damage -50%, Tower Damage -50%", 1, true),
            card(&selector, 1, "Orbs +1", 18, true),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::AllPurple);
    }

    #[test]
    fn test_acceptable_purple_breaks_abstain() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Black Hole", 6, true),
            card(&selector, 1, "Cash per Wave x2", 27, true),
        ]);
        assert!(decision.observations[1].purple_acceptable);
        assert_eq!(decision.observations[1].effective_rank, 27);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
        assert_eq!(decision.note(), Some("purple but other is worse"));
    }

    #[test]
    fn test_exempt_rank_is_not_penalized() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Orbs +1", 18, false),
            card(&selector, 1, "Enemies Damage x2, Tower Damage x2", 1, true),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
        assert_eq!(decision.note(), Some("purple but exempt"));
    }

    #[test]
    fn test_acceptable_purple_is_not_noted_as_exempt() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Cash per Wave x12", 27, true),
            card(&selector, 1, "???", 9999, false),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 0 });
        assert!(!decision.observations[0].rank_exempt);
        assert_eq!(decision.note(), None);
    }

    #[test]
    fn test_huge_penalty_saturates() {
        let selector = PerkSelector::new(&SelectionSettings {
            penalty: u32::MAX,
            ..SelectionSettings::default()
        });
        let decision = selector.select(vec![
            card(&selector, 0, "Orbs", 18, true),
            card(&selector, 1, "???", 9999, false),
        ]);
        assert_eq!(decision.observations[0].effective_rank, u32::MAX);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
    }

    #[test]
    fn test_unrecognized() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "???", 9999, false),
            card(&selector, 1, "", 9999, false),
            card(&selector, 2, "x1.2", 9999, false),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::Unrecognized);
        assert_eq!(selector.select(Vec::new()).outcome, SelectionOutcome::Unrecognized);
    }

    #[test]
    fn test_unranked_plain_card_beats_purple() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Golden Tower", 3, true),
            card(&selector, 1, "???", 9999, false),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
    }

    #[test]
    fn test_ties_go_to_lowest_slot() {
        let selector = PerkSelector::default();
        let decision = selector.select(vec![
            card(&selector, 0, "Orbs", 18, false),
            card(&selector, 1, "Death Wave", 4, false),
            card(&selector, 2, "Death Wave", 4, false),
        ]);
        assert_eq!(decision.outcome, SelectionOutcome::Selected { slot: 1 });
        assert_eq!(decision.selected().map(PerkObservation::number), Some(2));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SelectionOutcome::Selected { slot: 0 }.to_string(), "Perk 1");
        assert_eq!(SelectionOutcome::AllPurple.to_string(), "NONE - ALL PURPLE");
    }
}
