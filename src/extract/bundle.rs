use scraper::{ElementRef, Html};
use serde::Serialize;

use super::{fetch_listing, Warnings};
use crate::classify::PageType;
use crate::client::PageSource;
use crate::markup;

/// Canonical page listing every bundle.
pub const LISTING_PAGE: &str = "Bundles";

/// Link texts in listing tables that name categories rather than items.
const NON_ITEM_LINKS: [&str; 6] = ["Spring", "Summer", "Fall", "Winter", "Crops", "Foraging"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    pub requirements: Vec<Requirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    pub parsing_warnings: Vec<String>,
}

/// True for stub pages: no table with more than one row and a bundle title.
pub fn needs_listing(markup: &str, title: &str) -> bool {
    let doc = markup::parse(markup);
    is_stub(&doc) && markup::contains_ci(title, "bundle")
}

fn is_stub(doc: &Html) -> bool {
    !doc.select(&markup::TABLE).any(|t| markup::row_count(t) > 1)
}

/// Extracts a bundle from its own page, or from `listing` (the markup of the
/// bundles listing page) when the page is a stub.
pub fn extract(markup: &str, title: &str, listing: Option<&str>) -> BundleRecord {
    let mut warnings = Warnings::default();
    let mut record = BundleRecord {
        page_type: PageType::Bundle,
        name: title.to_string(),
        requirements: Vec::new(),
        reward: None,
        parsing_warnings: Vec::new(),
    };

    if let Some(listing) = listing.filter(|_| needs_listing(markup, title)) {
        let doc = markup::parse(listing);
        match listing_table(&doc, title) {
            Some(table) => {
                from_listing(table, title, &mut record);
                tracing::info!(
                    title = %title,
                    items = record.requirements.len(),
                    "extracted bundle from listing page"
                );
                record.parsing_warnings = warnings.into_vec();
                return record;
            }
            None => warnings.push(format!("'{}' not found on the {} page", title, LISTING_PAGE)),
        }
    }

    let doc = markup::parse(markup);
    record.requirements = from_tables(&doc);
    if record.requirements.is_empty() {
        warnings.push("no bundle requirements found");
    }

    record.parsing_warnings = warnings.into_vec();
    record
}

/// Like [`extract`], fetching the listing page through `source` when the page is a stub.
pub async fn extract_with_source<S>(markup: &str, title: &str, source: &S) -> BundleRecord
where
    S: PageSource + ?Sized,
{
    if !needs_listing(markup, title) {
        return extract(markup, title, None);
    }

    tracing::info!(title = %title, "bundle page is a stub, fetching {}", LISTING_PAGE);
    let listing = fetch_listing(source, LISTING_PAGE).await;
    match listing.value {
        Some(html) => extract(markup, title, Some(&html)),
        None => {
            let mut record = extract(markup, title, None);
            if let Some(warning) = listing.warning {
                record.parsing_warnings.insert(0, warning);
            }
            record
        }
    }
}

/// Table enclosing the first text node that mentions `title`.
fn listing_table<'a>(doc: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let needle = title.to_lowercase();
    doc.root_element()
        .descendants()
        .filter(|node| {
            node.value()
                .as_text()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
        .find_map(|node| {
            node.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "table")
        })
}

fn from_listing(table: ElementRef<'_>, title: &str, record: &mut BundleRecord) {
    for row in table.select(&markup::ROW) {
        let row_text = markup::text(row);
        if markup::contains_ci(&row_text, "reward") {
            if record.reward.is_none() {
                record.reward = reward_text(row);
            }
            continue;
        }

        for cell in markup::cells(row).into_iter().filter(|c| !markup::is_header_cell(*c)) {
            for item in markup::link_texts(cell) {
                let skip = item == title
                    || NON_ITEM_LINKS.contains(&item.as_str())
                    || record.requirements.iter().any(|r| r.item == item);
                if !skip {
                    record.requirements.push(Requirement { item, quantity: 1 });
                }
            }
        }
    }
}

/// Reward row text without its leading label.
fn reward_text(row: ElementRef<'_>) -> Option<String> {
    let cells = markup::cells(row);
    let text = match cells.as_slice() {
        [label, rest @ ..]
            if !rest.is_empty() && markup::contains_ci(&markup::text(*label), "reward") =>
        {
            rest.iter()
                .map(|c| markup::text(*c))
                .collect::<Vec<_>>()
                .join(" ")
        }
        _ => {
            let full = markup::text(row);
            match full.split_once(':') {
                Some((_, value)) => value.trim().to_string(),
                None => full,
            }
        }
    };
    (!text.is_empty()).then_some(text)
}

/// Requirement rows from tables headed by "Item" or "Source".
fn from_tables(doc: &Html) -> Vec<Requirement> {
    let mut requirements = Vec::new();

    for table in doc.select(&markup::TABLE) {
        let headed = table.select(&markup::ROW).any(|row| {
            markup::cells(row)
                .into_iter()
                .filter(|c| markup::is_header_cell(*c))
                .any(|c| matches!(markup::text(c).to_lowercase().as_str(), "item" | "source"))
        });
        if !headed {
            continue;
        }

        for row in table.select(&markup::ROW).skip(1) {
            let cells: Vec<_> = markup::cells(row)
                .into_iter()
                .filter(|c| !markup::is_header_cell(*c))
                .collect();
            let Some(first) = cells.first() else { continue };

            let item = markup::text(*first);
            if item.is_empty() {
                continue;
            }
            let quantity = cells
                .get(1)
                .and_then(|c| markup::first_number(&markup::text(*c)))
                .unwrap_or(1);
            requirements.push(Requirement { item, quantity });
        }
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUB: &str = "<html><body><p>This is a stub article for Spring Crops Bundle.</p></body></html>";

    const LISTING: &str = r#"
        <h2>Crafts Room</h2>
        <table class="wikitable">
            <tr><th colspan="3"><a href="/Spring_Foraging_Bundle">Spring Foraging Bundle</a></th></tr>
            <tr><td><a>Wild Horseradish</a></td><td><a>Spring</a> <a>Foraging</a></td></tr>
            <tr><td colspan="3">Reward: 30 Spring Seeds</td></tr>
        </table>
        <table class="wikitable">
            <tr><th colspan="3"><a href="/Spring_Crops_Bundle">Spring Crops Bundle</a></th></tr>
            <tr><td><a>Parsnip</a></td><td><a>Spring</a> <a>Crops</a></td></tr>
            <tr><td><a>Green Bean</a></td><td><a>Spring</a> <a>Crops</a></td></tr>
            <tr><td><a>Cauliflower</a></td><td><a>Parsnip</a></td></tr>
            <tr><td><a>Potato</a></td></tr>
            <tr><th>Reward:</th><td>20 <a>Speed-Gro</a></td></tr>
        </table>
    "#;

    #[test]
    fn stub_detection() {
        assert!(needs_listing(STUB, "Spring Crops Bundle"));
        assert!(!needs_listing(STUB, "Parsnip"));
        assert!(!needs_listing(LISTING, "Spring Crops Bundle"));
    }

    #[test]
    fn stub_page_uses_listing_table() {
        let record = extract(STUB, "Spring Crops Bundle", Some(LISTING));
        let items: Vec<_> = record.requirements.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["Parsnip", "Green Bean", "Cauliflower", "Potato"]);
        assert!(record.requirements.iter().all(|r| r.quantity == 1));
        assert_eq!(record.reward.as_deref(), Some("20 Speed-Gro"));
        assert!(record.parsing_warnings.is_empty());
    }

    #[test]
    fn listing_without_the_bundle_warns() {
        let record = extract(STUB, "Missing Bundle", Some(LISTING));
        assert!(record.requirements.is_empty());
        assert!(record.parsing_warnings[0].contains("Missing Bundle"));
    }

    #[test]
    fn content_page_scrapes_item_table() {
        let html = r#"<table>
            <tr><th>Item</th><th>Quantity</th></tr>
            <tr><td>Bream</td><td>1</td></tr>
            <tr><td>Wood</td><td>99</td></tr>
        </table>"#;
        let record = extract(html, "Test Bundle", Some(LISTING));
        assert_eq!(
            record.requirements,
            vec![
                Requirement { item: "Bream".into(), quantity: 1 },
                Requirement { item: "Wood".into(), quantity: 99 },
            ]
        );
    }

    #[test]
    fn empty_page_degrades() {
        let record = extract("<html><body></body></html>", "Empty Bundle", None);
        assert_eq!(record.page_type, PageType::Bundle);
        assert_eq!(record.name, "Empty Bundle");
        assert!(record.requirements.is_empty());
        assert!(!record.parsing_warnings.is_empty());
    }
}
