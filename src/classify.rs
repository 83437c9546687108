//! Page-type classification from categories and title.
//!
//! Rule order matters. Exact titles win over categories, categories are checked in
//! a fixed priority, and only then do title-substring fallbacks apply.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Crop,
    Npc,
    Fish,
    Recipe,
    Bundle,
    Skill,
    Quest,
    Achievement,
    Collection,
    Artifact,
    Mineral,
    Monster,
    Item,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Crop => "crop",
            PageType::Npc => "npc",
            PageType::Fish => "fish",
            PageType::Recipe => "recipe",
            PageType::Bundle => "bundle",
            PageType::Skill => "skill",
            PageType::Quest => "quest",
            PageType::Achievement => "achievement",
            PageType::Collection => "collection",
            PageType::Artifact => "artifact",
            PageType::Mineral => "mineral",
            PageType::Monster => "monster",
            PageType::Item => "item",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pages whose title alone decides the type, whatever their categories say.
const EXACT_TITLES: &[(&str, PageType)] = &[
    ("skills", PageType::Skill),
    ("farming", PageType::Skill),
    ("fishing", PageType::Skill),
    ("foraging", PageType::Skill),
    ("mining", PageType::Skill),
    ("combat", PageType::Skill),
    ("quests", PageType::Quest),
    ("special orders", PageType::Quest),
    ("achievements", PageType::Achievement),
    ("bundles", PageType::Bundle),
    ("artifacts", PageType::Collection),
    ("minerals", PageType::Collection),
    ("museum", PageType::Collection),
];

/// Category keyword rules, highest priority first.
const CATEGORY_RULES: &[(&[&str], PageType)] = &[
    (&["quest", "special order"], PageType::Quest),
    (&["achievement"], PageType::Achievement),
    (&["skill", "profession"], PageType::Skill),
    (&["crop"], PageType::Crop),
    (&["villager", "npc"], PageType::Npc),
    (&["bundle"], PageType::Bundle),
    (&["fish"], PageType::Fish),
    (&["recipe", "cooking", "craftable"], PageType::Recipe),
    (&["artifact"], PageType::Artifact),
    (&["mineral"], PageType::Mineral),
    (&["monster"], PageType::Monster),
];

pub const NPC_NAMES: &[&str] = &[
    "abigail", "alex", "caroline", "clint", "demetrius", "dwarf", "elliott", "emily",
    "evelyn", "george", "gus", "haley", "harvey", "jas", "jodi", "kent", "krobus", "leah",
    "leo", "lewis", "linus", "marnie", "maru", "pam", "penny", "pierre", "robin", "sam",
    "sandy", "sebastian", "shane", "vincent", "willy", "wizard",
];

pub fn classify<S: AsRef<str>>(categories: &[S], title: &str) -> PageType {
    let title_lower = title.trim().to_lowercase();

    if let Some((_, page_type)) = EXACT_TITLES.iter().find(|(t, _)| *t == title_lower) {
        return *page_type;
    }

    let cats: Vec<String> = categories
        .iter()
        .map(|c| c.as_ref().replace('_', " ").to_lowercase())
        .collect();

    for (keywords, page_type) in CATEGORY_RULES {
        if cats.iter().any(|c| keywords.iter().any(|k| c.contains(k))) {
            return *page_type;
        }
    }

    if title_lower.contains("bundle") {
        return PageType::Bundle;
    }

    let is_npc = title_lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| NPC_NAMES.contains(&word));
    if is_npc {
        return PageType::Npc;
    }

    PageType::Item
}
