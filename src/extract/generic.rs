use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{infobox_rows, Warnings};
use crate::classify::PageType;
use crate::markup;

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Failed to compile key regex"));

const PRICE_KEYS: [&str; 3] = ["sell_price", "purchase_price", "buy_price"];
const STAT_KEYS: [&str; 5] = ["base_hp", "base_damage", "base_def", "speed", "xp"];

/// Keys the record itself serializes; infobox rows may not shadow them.
const RESERVED_KEYS: [&str; 3] = ["type", "name", "parsing_warnings"];

/// Fallback record: the infobox as a flat key/value map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    pub parsing_warnings: Vec<String>,
}

/// `"Sell Price:"` -> `"sell_price"`.
pub fn sanitize_key(key: &str) -> String {
    PUNCTUATION
        .replace_all(key, "")
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

fn field_value(key: &str, value: &str) -> Value {
    if PRICE_KEYS.contains(&key) {
        return markup::gold_price(value)
            .map(Value::from)
            .unwrap_or_else(|| Value::from(value));
    }
    if STAT_KEYS.contains(&key) {
        return markup::first_number(value)
            .map(Value::from)
            .unwrap_or_else(|| Value::from(value));
    }
    Value::from(value)
}

pub fn extract(markup: &str, title: &str, page_type: PageType) -> GenericRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut fields = BTreeMap::new();

    let rows = warnings.take(infobox_rows(&doc)).unwrap_or_default();
    for row in &rows {
        let key = sanitize_key(&row.key);
        if key.is_empty() {
            continue;
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            warnings.push(format!("ignored infobox row '{}'", row.key));
            continue;
        }
        let value = field_value(&key, &row.value);
        fields.insert(key, value);
    }

    GenericRecord {
        page_type,
        name: title.to_string(),
        fields,
        parsing_warnings: warnings.into_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sanitizes_keys() {
        assert_eq!(sanitize_key("Sell Price:"), "sell_price");
        assert_eq!(sanitize_key("Base HP"), "base_hp");
        assert_eq!(sanitize_key("Def."), "def");
        assert_eq!(sanitize_key("!!"), "");
    }

    #[test]
    fn monster_stats_become_numbers() {
        let html = r#"<table>
            <tr><th>Base HP</th><td>1,200</td></tr>
            <tr><th>Base Damage</th><td>25 (hard mode)</td></tr>
            <tr><th>Speed</th><td>fast</td></tr>
            <tr><th>Spawns In</th><td>Skull Cavern</td></tr>
        </table>"#;
        let record = extract(html, "Serpent", PageType::Monster);
        assert_eq!(record.page_type, PageType::Monster);
        assert_eq!(record.fields["base_hp"], json!(1200));
        assert_eq!(record.fields["base_damage"], json!(25));
        assert_eq!(record.fields["speed"], json!("fast"));
        assert_eq!(record.fields["spawns_in"], json!("Skull Cavern"));
    }

    #[test]
    fn prices_keep_text_when_unparseable() {
        assert_eq!(field_value("sell_price", "1,500g"), json!(1500));
        assert_eq!(
            field_value("sell_price", "Invalid Price Format"),
            json!("Invalid Price Format")
        );
    }

    #[test]
    fn serializes_flat() {
        let html = r#"<table class="infobox">
            <tr><th>Sell Price:</th><td>75g</td></tr>
            <tr><th>Name</th><td>Shadowed</td></tr>
        </table>"#;
        let record = extract(html, "Prismatic Shard", PageType::Mineral);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "mineral",
                "name": "Prismatic Shard",
                "sell_price": 75,
                "parsing_warnings": ["ignored infobox row 'name'"],
            })
        );
    }

    #[test]
    fn no_infobox() {
        let record = extract("<p>No tables</p>", "Mystery", PageType::Item);
        assert!(record.fields.is_empty());
        assert_eq!(record.parsing_warnings, vec!["no infobox table found"]);
    }
}
