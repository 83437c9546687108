use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Serialize;

use super::{infobox_rows, row_value, text_field, Field, Warnings};
use crate::classify::PageType;
use crate::markup::{self, InfoRow};

static HEART_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\w+)[\s-]+hearts?\b").expect("Failed to compile heart event regex")
});

/// Gift list field name and the heading prefix that introduces it.
const GIFT_SECTIONS: [(GiftKind, &str); 5] = [
    (GiftKind::Loved, "love"),
    (GiftKind::Liked, "like"),
    (GiftKind::Neutral, "neutral"),
    (GiftKind::Disliked, "dislike"),
    (GiftKind::Hated, "hate"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GiftKind {
    Loved,
    Liked,
    Neutral,
    Disliked,
    Hated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GiftPreferences {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loved: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub liked: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub neutral: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disliked: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hated: Vec<String>,
}

impl GiftPreferences {
    fn slot(&mut self, kind: GiftKind) -> &mut Vec<String> {
        match kind {
            GiftKind::Loved => &mut self.loved,
            GiftKind::Liked => &mut self.liked,
            GiftKind::Neutral => &mut self.neutral,
            GiftKind::Disliked => &mut self.disliked,
            GiftKind::Hated => &mut self.hated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loved.is_empty()
            && self.liked.is_empty()
            && self.neutral.is_empty()
            && self.disliked.is_empty()
            && self.hated.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartEvent {
    pub heart_level: u8,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpcRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marriageable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "GiftPreferences::is_empty")]
    pub gifts: GiftPreferences,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub heart_events: Vec<HeartEvent>,
    pub parsing_warnings: Vec<String>,
}

pub fn extract(markup: &str, title: &str) -> NpcRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();

    let rows = warnings.take(infobox_rows(&doc)).unwrap_or_default();
    let birthday = warnings.take(text_field(&rows, "birthday", "birthday"));
    let marriageable = row_value(&rows, "marriage").map(|v| v.to_lowercase().contains("yes"));
    let address = warnings.take(address(&rows));
    let family = row_value(&rows, "family").map(str::to_string);
    let gifts = warnings.take(gift_preferences(&doc)).unwrap_or_default();
    let heart_events = heart_events(&doc);

    NpcRecord {
        page_type: PageType::Npc,
        name: title.to_string(),
        birthday,
        marriageable,
        address,
        family,
        gifts,
        heart_events,
        parsing_warnings: warnings.into_vec(),
    }
}

fn address(rows: &[InfoRow]) -> Field<String> {
    row_value(rows, "address")
        .or_else(|| row_value(rows, "lives in"))
        .filter(|v| !v.is_empty())
        .map(|v| Field::found(v.to_string()))
        .unwrap_or_else(|| Field::missing("address not found"))
}

fn is_heading(el: ElementRef<'_>) -> bool {
    matches!(el.value().name(), "h2" | "h3")
}

/// Element siblings after `heading`, up to the next heading.
fn section_after<'a>(heading: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !is_heading(*el))
}

/// Gift item text, or `None` for explanatory notes.
fn gift_entry(text: String) -> Option<String> {
    let lower = text.to_lowercase();
    let is_note = text.is_empty()
        || text.starts_with("*Note")
        || text.starts_with("Note:")
        || text.chars().count() > 50
        || lower.contains("the following are")
        || lower.contains("not considered");
    (!is_note).then_some(text)
}

fn gift_preferences(doc: &Html) -> Field<GiftPreferences> {
    let mut gifts = GiftPreferences::default();

    for (kind, prefix) in GIFT_SECTIONS {
        let heading = doc
            .select(&markup::HEADING_H3)
            .find(|h| markup::text(*h).to_lowercase().starts_with(prefix));
        let Some(heading) = heading else { continue };

        let slot = gifts.slot(kind);
        for el in section_after(heading) {
            match el.value().name() {
                "p" => slot.extend(gift_entry(markup::text(el))),
                "ul" | "ol" => {
                    let items = el.select(&markup::LIST_ITEM);
                    slot.extend(items.filter_map(|li| gift_entry(markup::text(li))));
                }
                _ => {}
            }
        }
    }

    if gifts.is_empty() {
        Field::missing("no gift preference sections found")
    } else {
        Field::found(gifts)
    }
}

fn heart_level(word: &str) -> Option<u8> {
    match word.to_lowercase().as_str() {
        "two" | "2" => Some(2),
        "three" | "3" => Some(3),
        "four" | "4" => Some(4),
        "five" | "5" => Some(5),
        "six" | "6" => Some(6),
        "seven" | "7" => Some(7),
        "eight" | "8" => Some(8),
        "nine" | "9" => Some(9),
        "ten" | "10" => Some(10),
        "twelve" | "12" => Some(12),
        "fourteen" | "14" => Some(14),
        _ => None,
    }
}

fn heart_events(doc: &Html) -> Vec<HeartEvent> {
    let section = doc.select(&markup::HEADING_H2).find(|h| {
        let t = markup::text(*h).to_lowercase();
        t.contains("heart event") || t == "events"
    });
    let Some(section) = section else {
        return Vec::new();
    };

    let mut events = Vec::new();
    let siblings = section
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| el.value().name() != "h2");

    for el in siblings.filter(|el| el.value().name() == "h3") {
        let title = markup::text(el);
        let Some(level) = HEART_TITLE
            .captures(&title)
            .and_then(|c| c.get(1))
            .and_then(|m| heart_level(m.as_str()))
        else {
            continue;
        };

        let trigger = section_after(el)
            .find(|s| s.value().name() == "p")
            .map(markup::text)
            .filter(|t| !t.is_empty() && t.chars().count() < 200);

        events.push(HeartEvent {
            heart_level: level,
            title,
            trigger,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    const NPC: &str = r#"
        <table class="infobox">
            <tr><th>Birthday:</th><td>Spring 10</td></tr>
            <tr><th>Lives in:</th><td>The Mountain</td></tr>
            <tr><th>Address:</th><td>24 Mountain Road</td></tr>
            <tr><th>Marriage:</th><td>Yes</td></tr>
            <tr><th>Family:</th><td>Demetrius (Step-Father), Robin (Mother), Maru (Half-Sister)</td></tr>
        </table>
        <h2>Gifts</h2>
        <h3>Love</h3>
        <p>Frozen Tear</p>
        <p>Obsidian</p>
        <p>*Note: The following are not considered universal loves for this villager.</p>
        <h3>Like</h3>
        <ul><li>Quartz</li></ul>
        <h3>Dislike</h3>
        <p>Clay</p>
        <h3>Hate</h3>
        <p>Farmer's Lunch</p>
        <h2>Heart Events</h2>
        <h3>Two Hearts</h3>
        <p>Enter Sebastian's room when he is home.</p>
        <h3>Six Hearts</h3>
        <p>Leave the farm on a rainy day.</p>
        <h3>Trivia</h3>
        <h2>Quotes</h2>
        <h3>Ten Hearts</h3>
    "#;

    #[test]
    fn parses_infobox_fields() {
        let record = extract(NPC, "Sebastian");
        assert_eq!(record.birthday.as_deref(), Some("Spring 10"));
        assert_eq!(record.address.as_deref(), Some("24 Mountain Road"));
        assert_eq!(record.marriageable, Some(true));
        assert!(record.family.as_deref().unwrap().contains("Robin"));
    }

    #[test]
    fn gift_sections_do_not_bleed_into_each_other() {
        let gifts = extract(NPC, "Sebastian").gifts;
        assert_eq!(gifts.loved, vec!["Frozen Tear", "Obsidian"]);
        assert_eq!(gifts.liked, vec!["Quartz"]);
        assert_eq!(gifts.disliked, vec!["Clay"]);
        assert_eq!(gifts.hated, vec!["Farmer's Lunch"]);
        assert!(gifts.neutral.is_empty());
    }

    #[test]
    fn heart_events_stop_at_next_section() {
        let events = extract(NPC, "Sebastian").heart_events;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].heart_level, 2);
        assert_eq!(events[0].trigger.as_deref(), Some("Enter Sebastian's room when he is home."));
        assert_eq!(events[1].heart_level, 6);
    }

    #[test]
    fn missing_gift_sections_warn() {
        let html = r#"<table class="infobox"><tr><th>Birthday:</th><td>Spring 1</td></tr></table>"#;
        let record = extract(html, "Minimal NPC");
        assert_eq!(record.birthday.as_deref(), Some("Spring 1"));
        assert!(record.parsing_warnings.iter().any(|w| w.contains("gift")));
    }

    #[test]
    fn empty_markup() {
        let record = extract("<html><body></body></html>", "Empty NPC");
        assert_eq!(record.page_type, PageType::Npc);
        assert_eq!(record.name, "Empty NPC");
        assert!(!record.parsing_warnings.is_empty());
    }
}
