//! Perk priority matching
//!
//! Maps noisy OCR text to a rank using ordered include/exclude keyword rules.
//! List order is significance order: the first rule that fully matches wins,
//! and exclude keywords keep generic rules from claiming text that belongs
//! to a more specific rule further down.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vision::ocr::normalize_text;

/// Priority rank of a perk, lower is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerkRank(pub u32);

impl PerkRank {
    /// Sentinel for text no rule recognizes, worse than every real rank
    pub const UNRANKED: PerkRank = PerkRank(9999);

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_ranked(self) -> bool {
        self != Self::UNRANKED
    }
}

impl fmt::Display for PerkRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One keyword rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub rank: PerkRank,
    /// All of these must appear in the text
    pub include: Vec<String>,
    /// None of these may appear in the text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl PriorityRule {
    pub fn new(rank: u32, include: &[&str], exclude: &[&str]) -> Self {
        Self {
            rank: PerkRank(rank),
            include: include.iter().map(|k| k.to_lowercase()).collect(),
            exclude: exclude.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Check the rule against already-normalized text
    pub fn matches(&self, text: &str) -> bool {
        self.include.iter().all(|k| text.contains(k.as_str()))
            && !self.exclude.iter().any(|k| text.contains(k.as_str()))
    }

    /// The shortest text this rule is meant to own
    pub fn canonical_text(&self) -> String {
        self.include.join(" ")
    }

    fn normalize(&mut self) {
        for keyword in self.include.iter_mut().chain(self.exclude.iter_mut()) {
            *keyword = normalize_text(keyword);
        }
    }
}

/// A named, ordered rule list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityList {
    pub name: String,
    pub rules: Vec<PriorityRule>,
}

impl PriorityList {
    pub fn new(name: &str, rules: Vec<PriorityRule>) -> Self {
        Self {
            name: name.to_string(),
            rules,
        }
    }

    /// Rank of the first rule matching normalized text
    pub fn rank_of(&self, text: &str) -> PerkRank {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.rank)
            .unwrap_or(PerkRank::UNRANKED)
    }

    /// Rank of the first rule listing `phrase` among its include keywords
    pub fn rank_with_phrase(&self, phrase: &str) -> Option<PerkRank> {
        self.rules
            .iter()
            .find(|rule| rule.include.iter().any(|k| k == phrase))
            .map(|rule| rule.rank)
    }

    /// Pairs `(i, j)` with `i < j` where rule `i` would claim the canonical
    /// text of rule `j`, making `j` unreachable for that text
    pub fn shadowed_rules(&self) -> Vec<(usize, usize)> {
        let mut shadowed = Vec::new();
        for (j, later) in self.rules.iter().enumerate() {
            let text = later.canonical_text();
            if let Some(i) = self.rules[..j].iter().position(|earlier| earlier.matches(&text)) {
                shadowed.push((i, j));
            }
        }
        shadowed
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Alternate list for windows whose name contains a class keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOverride {
    pub class_keyword: String,
    pub list: PriorityList,
}

/// OCR rewrite: when every trigger word is present, the text is ranked as
/// the first rule owning one of the phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrAlias {
    pub triggers: Vec<String>,
    pub phrases: Vec<String>,
}

impl OcrAlias {
    pub fn new(triggers: &[&str], phrases: &[&str]) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn triggered_by(&self, text: &str) -> bool {
        !self.triggers.is_empty() && self.triggers.iter().all(|t| text.contains(t.as_str()))
    }

    fn resolve(&self, list: &PriorityList) -> Option<PerkRank> {
        list.rules
            .iter()
            .find(|rule| self.phrases.iter().any(|p| rule.include.contains(p)))
            .map(|rule| rule.rank)
    }
}

/// All priority lists plus the OCR aliases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBook {
    pub default: PriorityList,
    #[serde(default)]
    pub overrides: Vec<ClassOverride>,
    #[serde(default)]
    pub aliases: Vec<OcrAlias>,
}

impl PriorityBook {
    /// List for a window: the first override whose class keyword appears in
    /// the name (case-insensitive), else the default list
    pub fn list_for(&self, window: &str) -> &PriorityList {
        let window = window.to_lowercase();
        self.overrides
            .iter()
            .find(|o| window.contains(&o.class_keyword.to_lowercase()))
            .map(|o| &o.list)
            .unwrap_or(&self.default)
    }

    pub fn lists(&self) -> impl Iterator<Item = &PriorityList> {
        std::iter::once(&self.default).chain(self.overrides.iter().map(|o| &o.list))
    }

    /// Bring hand-written keywords into the form OCR text is matched in
    pub fn normalize(&mut self) {
        let lists = std::iter::once(&mut self.default).chain(self.overrides.iter_mut().map(|o| &mut o.list));
        for list in lists {
            list.rules.iter_mut().for_each(PriorityRule::normalize);
        }
        for alias in &mut self.aliases {
            for word in alias.triggers.iter_mut().chain(alias.phrases.iter_mut()) {
                *word = normalize_text(word);
            }
        }
    }
}

impl Default for PriorityBook {
    fn default() -> Self {
        crate::config::priorities::default_book()
    }
}

/// Ranks raw OCR text against the priority lists
#[derive(Debug, Clone, Default)]
pub struct PriorityMatcher {
    book: PriorityBook,
}

impl PriorityMatcher {
    pub fn new(book: PriorityBook) -> Self {
        Self { book }
    }

    /// Rank text using the list selected for the profile (window) name
    pub fn match_text(&self, raw: &str, profile_name: &str) -> PerkRank {
        self.rank_in(raw, self.book.list_for(profile_name))
    }

    /// Rank text against a specific list
    pub fn rank_in(&self, raw: &str, list: &PriorityList) -> PerkRank {
        let text = normalize_text(raw);
        if text.is_empty() {
            return PerkRank::UNRANKED;
        }

        for alias in &self.book.aliases {
            if alias.triggered_by(&text) {
                if let Some(rank) = alias.resolve(list) {
                    log::debug!("OCR alias {:?} matched '{}' -> {}", alias.triggers, text, rank);
                    return rank;
                }
            }
        }

        list.rank_of(&text)
    }

    pub fn list_for(&self, profile_name: &str) -> &PriorityList {
        self.book.list_for(profile_name)
    }

    pub fn book(&self) -> &PriorityBook {
        &self.book
    }
}
