//! Shipped priority tables
//!
//! Two orderings of the same rules: the default list and the list used by
//! windows whose name contains "daddy". Both are plain data and can be
//! replaced wholesale from the settings file.

use crate::ai::matcher::{ClassOverride, OcrAlias, PriorityBook, PriorityList, PriorityRule};

fn rule(rank: u32, include: &[&str], exclude: &[&str]) -> PriorityRule {
    PriorityRule::new(rank, include, exclude)
}

/// Rule definitions in default order, without ranks
const DEFAULT_ORDER: &[(&[&str], &[&str])] = &[
    (&["enemies damage", "tower damage"], &[]),
    (&["perk wave requirement"], &[]),
    (&["golden tower"], &[]),
    (&["death"], &[]),
    (&["spotlight"], &[]),
    (&["black hole"], &[]),
    (&["chrono field"], &[]),
    (&["increase max game speed"], &[]),
    (&["max health"], &["coins", "tower max"]),
    (&["poison swamp"], &[]),
    (&["chain lightning"], &[]),
    (&["smart missiles"], &[]),
    (&["inner land mines"], &[]),
    (&["defense percent"], &[]),
    (&["free upgrade chance", "upgrade chance for all"], &[]),
    (&["cash bonus"], &[]),
    (&["all coin"], &[]),
    (&["orbs"], &[]),
    (&["bounce shot"], &[]),
    (&["interest"], &[]),
    (&["land mine damage"], &[]),
    (&["defense absolute"], &[]),
    (&["damage"], &["land mine", "tower damage", "enemies damage", "distance"]),
    (&["swamp radius"], &[]),
    (&["tower health regen"], &[]),
    (&["health regen"], &[]),
    (&["cash per wave"], &[]),
    (&["boss health"], &[]),
    (&["ranged enemies", "attack distance"], &[]),
    (&["life", "steal"], &[]),
    (&["enemies speed"], &[]),
    (&["enemies have", "health"], &["max health", "health regen"]),
    (&["coins", "tower max health"], &[]),
    (&["tower damage", "bosses"], &[]),
];

/// Positions (into `DEFAULT_ORDER`) making up the "daddy" ordering, which
/// favors economy and raw damage over the ultimate-weapon perks
const DADDY_ORDER: &[usize] = &[
    0, 1, 2, 3, 7, 8, 13, 14, 15, 16, 17, 18, 22, 19, 20, 21, 6, 4, 5, 9, 23, 10, 11, 12, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 33,
];

fn ranked(order: impl Iterator<Item = usize>) -> Vec<PriorityRule> {
    order
        .enumerate()
        .map(|(idx, pos)| {
            let (include, exclude) = DEFAULT_ORDER[pos];
            rule(idx as u32 + 1, include, exclude)
        })
        .collect()
}

pub fn default_list() -> PriorityList {
    PriorityList::new("default", ranked(0..DEFAULT_ORDER.len()))
}

pub fn daddy_list() -> PriorityList {
    PriorityList::new("daddy", ranked(DADDY_ORDER.iter().copied()))
}

/// "+5.00%" in the free upgrade perk is often read as garbage that breaks
/// both phrases, while the three short words survive
pub fn free_upgrade_alias() -> OcrAlias {
    OcrAlias::new(&["free", "for", "all"], &["free upgrade chance", "upgrade chance for all"])
}

pub fn default_book() -> PriorityBook {
    PriorityBook {
        default: default_list(),
        overrides: vec![ClassOverride {
            class_keyword: "daddy".to_string(),
            list: daddy_list(),
        }],
        aliases: vec![free_upgrade_alias()],
    }
}
