use serde::Serialize;

use super::{cell_text, Warnings};
use crate::classify::PageType;
use crate::markup;

/// Which museum listing a collection page covers, judged from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Artifact,
    Mineral,
    Museum,
}

impl CollectionKind {
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        if lower.contains("artifact") {
            CollectionKind::Artifact
        } else if lower.contains("mineral") {
            CollectionKind::Mineral
        } else {
            CollectionKind::Museum
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    pub kind: CollectionKind,
    pub items: Vec<CollectionItem>,
    pub parsing_warnings: Vec<String>,
}

pub fn extract(markup: &str, title: &str) -> CollectionRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut items = Vec::new();
    let mut malformed = 0;

    for table in doc.select(&markup::TABLE).filter_map(markup::headered_table) {
        let Some(name_col) = table.column(&["name"]) else { continue };
        let description_col = table.column(&["description"]);
        let price_col = table.column(&["price"]);
        let location_col = table.column(&["location", "found"]);

        for row in &table.rows {
            let Some(name) = cell_text(row, Some(name_col)) else {
                malformed += 1;
                continue;
            };
            let sell_price = cell_text(row, price_col)
                .and_then(|p| markup::gold_price(&p).or_else(|| markup::first_number(&p)));
            items.push(CollectionItem {
                name,
                description: cell_text(row, description_col),
                sell_price,
                location: cell_text(row, location_col),
            });
        }
    }

    if items.is_empty() {
        warnings.push("no collection items found");
    }
    if malformed > 0 {
        warnings.push(format!("skipped {} malformed rows", malformed));
    }

    CollectionRecord {
        page_type: PageType::Collection,
        name: title.to_string(),
        kind: CollectionKind::from_title(title),
        items: super::narrow_to_title(items, title, |i| i.name.as_str()),
        parsing_warnings: warnings.into_vec(),
    }
}
