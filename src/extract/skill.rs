use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::Serialize;
use std::collections::BTreeMap;

use super::Warnings;
use crate::classify::PageType;
use crate::markup;

static LEVEL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^level\s+(\d+)").expect("Failed to compile level regex"));

/// Every profession across the five skills.
const PROFESSIONS: [&str; 30] = [
    "Rancher", "Tiller", "Coopmaster", "Shepherd", "Artisan", "Agriculturist",
    "Fisher", "Trapper", "Angler", "Pirate", "Mariner", "Luremaster",
    "Forester", "Gatherer", "Lumberjack", "Tapper", "Botanist", "Tracker",
    "Miner", "Geologist", "Blacksmith", "Prospector", "Excavator", "Gemologist",
    "Fighter", "Scout", "Brute", "Defender", "Acrobat", "Desperado",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillLevel {
    pub level: u8,
    pub unlocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profession {
    pub level: u8,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    pub levels: Vec<SkillLevel>,
    pub professions: Vec<Profession>,
    pub parsing_warnings: Vec<String>,
}

pub fn extract(markup: &str, title: &str) -> SkillRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut table = LevelTable::default();

    for row in doc.select(&markup::ROW) {
        table.feed(row);
    }

    if table.header_rows == 0 {
        warnings.push("no level table found");
    } else if table.professions.is_empty() {
        warnings.push("no professions found");
    }

    SkillRecord {
        page_type: PageType::Skill,
        name: title.to_string(),
        levels: table
            .unlocks
            .into_iter()
            .map(|(level, unlocks)| SkillLevel { level, unlocks })
            .collect(),
        professions: table.professions,
        parsing_warnings: warnings.into_vec(),
    }
}

/// Splits a cell's text into a known profession name and the remaining description.
fn profession(text: &str) -> Option<(&'static str, Option<String>)> {
    let lower = text.to_lowercase();
    let name = PROFESSIONS
        .iter()
        .find(|p| lower.starts_with(&p.to_lowercase()))
        .copied()?;

    let rest = text
        .get(name.len()..)
        .unwrap_or_default()
        .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .trim();
    Some((name, (!rest.is_empty()).then(|| rest.to_string())))
}

/// Row-by-row state for the level tables. Header rows ("Level 1" .. "Level 5") open a
/// group; content rows under it fill that group's levels by column.
#[derive(Default)]
struct LevelTable {
    header_rows: usize,
    group: Vec<u8>,
    unlocks: BTreeMap<u8, Vec<String>>,
    professions: Vec<Profession>,
}

impl LevelTable {
    fn feed(&mut self, row: ElementRef<'_>) {
        let cells = markup::cells(row);
        let texts: Vec<String> = cells.iter().map(|c| markup::text(*c)).collect();

        let levels: Vec<u8> = texts
            .iter()
            .filter_map(|t| LEVEL_HEADER.captures(t))
            .filter_map(|c| c.get(1)?.as_str().parse().ok())
            .collect();
        if !levels.is_empty() {
            self.header_rows += 1;
            self.group = levels;
            return;
        }

        let Some(&group_max) = self.group.iter().max() else {
            return;
        };

        let filled: Vec<&String> = texts.iter().filter(|t| !t.is_empty()).collect();
        if !filled.is_empty() && filled.iter().all(|t| profession(t).is_some()) {
            // a row of nothing but profession choices belongs to the group's last level
            for text in filled {
                self.push_profession(group_max, text);
            }
            return;
        }

        for (idx, text) in texts.iter().enumerate().filter(|(_, t)| !t.is_empty()) {
            match self.group.get(idx) {
                // level columns are unlocks even when named like a profession ("Tapper")
                Some(&level) => self.unlocks.entry(level).or_default().push(text.clone()),
                // columns past the level headers carry the professions
                None => self.push_profession(group_max, text),
            }
        }
    }

    fn push_profession(&mut self, level: u8, text: &str) {
        let (name, description) = match profession(text) {
            Some((name, description)) => (name.to_string(), description),
            None => (text.to_string(), None),
        };
        self.professions.push(Profession { level, name, description });
    }
}
