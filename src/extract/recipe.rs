use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{infobox_rows, Field, Warnings};
use crate::classify::PageType;
use crate::markup::{self, InfoRow};

static INGREDIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z\s'.-]*?)\s*\(([0-9]+)\)")
        .expect("Failed to compile ingredient regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    Cooking,
    Crafting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_type: Option<RecipeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<Ingredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buff_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u32>,
    /// `None` also covers items that cannot be sold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<u32>,
    pub parsing_warnings: Vec<String>,
}

impl RecipeRecord {
    fn new(title: &str) -> Self {
        Self {
            page_type: PageType::Recipe,
            name: title.to_string(),
            recipe_type: None,
            source: None,
            unlock_source: None,
            ingredients: Vec::new(),
            buff: None,
            buff_duration: None,
            energy: None,
            health: None,
            sell_price: None,
            parsing_warnings: Vec::new(),
        }
    }
}

pub fn extract(markup: &str, title: &str) -> RecipeRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut record = RecipeRecord::new(title);

    let rows = warnings.take(infobox_rows(&doc)).unwrap_or_default();
    for InfoRow { key, value } in &rows {
        if key.contains("recipe") && key.contains("source") {
            record.unlock_source = Some(value.clone());
        } else if key.contains("source") {
            let lower = value.to_lowercase();
            if lower.contains("cooking") {
                record.recipe_type = Some(RecipeKind::Cooking);
            } else if lower.contains("crafting") {
                record.recipe_type = Some(RecipeKind::Crafting);
            }
            record.source = Some(value.clone());
        } else if key.contains("ingredient") {
            record.ingredients = warnings.take(ingredients(value)).unwrap_or_default();
        } else if key.contains("buff") && key.contains("duration") {
            record.buff_duration = Some(value.clone());
        } else if key.contains("buff") {
            record.buff = Some(value.clone());
        } else if key.contains("energy") && key.contains("health") {
            if let Some((energy, health)) = warnings.take(energy_health(value)) {
                record.energy = Some(energy);
                record.health = Some(health);
            }
        } else if key.contains("sell") && key.contains("price") {
            record.sell_price = warnings.take(sell_price(value));
        }
    }

    if record.ingredients.is_empty() && !rows.is_empty() {
        warnings.push("ingredients not found");
    }

    record.parsing_warnings = warnings.into_vec();
    record
}

/// `Wood (50) Coal (1)` style ingredient lists.
fn ingredients(value: &str) -> Field<Vec<Ingredient>> {
    let found: Vec<Ingredient> = INGREDIENT
        .captures_iter(value)
        .filter_map(|c| {
            let item = c.get(1)?.as_str().trim().to_string();
            let quantity = c.get(2)?.as_str().parse().ok()?;
            (!item.is_empty()).then_some(Ingredient { item, quantity })
        })
        .collect();

    if found.is_empty() {
        Field::missing(format!("could not parse ingredients from '{}'", value))
    } else {
        Field::found(found)
    }
}

/// Energy and health, either as two numbers or as one merged run of digits
/// (icons between the values are dropped from the text), split at its midpoint.
fn energy_health(value: &str) -> Field<(u32, u32)> {
    let numbers = markup::all_numbers(value);
    let parsed = match numbers.as_slice() {
        [energy, health, ..] => energy.parse().ok().zip(health.parse().ok()),
        [merged] if merged.len() >= 3 && merged.is_ascii() => {
            let mid = merged.len() / 2;
            merged[..mid].parse().ok().zip(merged[mid..].parse().ok())
        }
        _ => None,
    };

    match parsed {
        Some(pair) => Field::found(pair),
        None => Field::missing(format!("could not parse energy/health from '{}'", value)),
    }
}

fn sell_price(value: &str) -> Field<u32> {
    if let Some(price) = markup::gold_price(value) {
        Field::found(price)
    } else if value.to_lowercase().contains("cannot be sold") {
        Field { value: None, warning: None }
    } else {
        Field::missing(format!("unrecognized sell price '{}'", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
        <table class="infobox">
            <tr><th>Source:</th><td>Cooking Channel (Year 2)</td></tr>
            <tr><th>Recipe Source(s):</th><td>The Queen of Sauce 28 Summer</td></tr>
            <tr><th>Ingredients:</th><td>Green Algae (4)</td></tr>
            <tr><th>Energy / Health:</th><td>3315</td></tr>
            <tr><th>Buff(s):</th><td>Speed (+1)</td></tr>
            <tr><th>Buff Duration:</th><td>5m 35s</td></tr>
            <tr><th>Sell Price:</th><td>30g</td></tr>
        </table>
    "#;

    #[test]
    fn parses_cooking_recipe() {
        let record = extract(RECIPE, "Seaweed Soup");
        assert_eq!(record.recipe_type, Some(RecipeKind::Cooking));
        assert_eq!(record.unlock_source.as_deref(), Some("The Queen of Sauce 28 Summer"));
        assert_eq!(
            record.ingredients,
            vec![Ingredient { item: "Green Algae".into(), quantity: 4 }]
        );
        assert_eq!((record.energy, record.health), (Some(33), Some(15)));
        assert_eq!(record.buff.as_deref(), Some("Speed (+1)"));
        assert_eq!(record.buff_duration.as_deref(), Some("5m 35s"));
        assert_eq!(record.sell_price, Some(30));
        assert!(record.parsing_warnings.is_empty(), "{:?}", record.parsing_warnings);
    }

    #[test]
    fn crafting_ingredients_with_several_items() {
        let fields = ingredients("Wood (50) Coal (1) Fiber (20)");
        assert_eq!(
            fields.value.unwrap(),
            vec![
                Ingredient { item: "Wood".into(), quantity: 50 },
                Ingredient { item: "Coal".into(), quantity: 1 },
                Ingredient { item: "Fiber".into(), quantity: 20 },
            ]
        );
    }

    #[test]
    fn energy_health_variants() {
        assert_eq!(energy_health("75 33").value, Some((75, 33)));
        assert_eq!(energy_health("7533").value, Some((75, 33)));
        assert_eq!(energy_health("113").value, Some((1, 13)));
        assert!(energy_health("n/a").warning.is_some());
        assert!(energy_health("٣٣٣").warning.is_some());
    }

    #[test]
    fn non_ascii_digits_degrade_to_a_warning() {
        let html = r#"<table class="infobox"><tr><th>Energy / Health:</th><td>٣٣٣</td></tr></table>"#;
        let record = extract(html, "Odd Recipe");
        assert_eq!((record.energy, record.health), (None, None));
        assert!(record.parsing_warnings.iter().any(|w| w.contains("energy/health")));

        let record = crate::extract::extract(html, "Odd Recipe", PageType::Recipe);
        assert_eq!(record.name(), "Odd Recipe");
    }

    #[test]
    fn unsellable_is_not_a_warning() {
        let field = sell_price("Cannot be sold");
        assert_eq!(field.value, None);
        assert_eq!(field.warning, None);
    }

    #[test]
    fn broken_markup_still_names_record() {
        let html = r#"<table class="infobox"><tr><th>Source:</th><td>Cooking</td"#;
        let record = extract(html, "Broken Recipe");
        assert_eq!(record.page_type, PageType::Recipe);
        assert_eq!(record.name, "Broken Recipe");
    }
}
