use scraper::Html;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{infobox_rows, row_value, Field, Warnings};
use crate::classify::PageType;
use crate::markup::{self, InfoRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regrowth_time: Option<u32>,
    /// Quality label (lowercased) -> price in gold.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sell_prices: BTreeMap<String, u32>,
    pub parsing_warnings: Vec<String>,
}

pub fn extract(markup: &str, title: &str) -> CropRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();

    let rows = warnings.take(infobox_rows(&doc)).unwrap_or_default();
    let seasons = warnings.take(seasons(&rows)).unwrap_or_default();
    let growth_time = warnings.take(days(&rows, "growth time", "growth time"));
    // most crops do not regrow, so a missing row is not worth a warning
    let regrowth_time = row_value(&rows, "regrowth").and_then(markup::first_number);
    let sell_prices = warnings.take(sell_prices(&doc)).unwrap_or_default();

    CropRecord {
        page_type: PageType::Crop,
        name: title.to_string(),
        seasons,
        growth_time,
        regrowth_time,
        sell_prices,
        parsing_warnings: warnings.into_vec(),
    }
}

fn seasons(rows: &[InfoRow]) -> Field<Vec<String>> {
    match row_value(rows, "season") {
        None => Field::missing("season not found"),
        Some(value) => {
            let seasons = markup::split_list(value);
            if seasons.is_empty() {
                Field::missing("season row is empty")
            } else {
                Field::found(seasons)
            }
        }
    }
}

fn days(rows: &[InfoRow], needle: &str, label: &str) -> Field<u32> {
    match row_value(rows, needle) {
        None => Field::missing(format!("{} not found", label)),
        Some(value) => match markup::first_number(value) {
            Some(n) => Field::found(n),
            None => Field::missing(format!("{} has no number: '{}'", label, value)),
        },
    }
}

/// Quality -> price rows from the table holding the "Sell Price" header.
fn sell_prices(doc: &Html) -> Field<BTreeMap<String, u32>> {
    let table = doc
        .select(&markup::TABLE)
        .filter(|t| t.value().attr("class").is_none_or(|c| !c.contains("infobox")))
        .find(|t| markup::contains_ci(&markup::text(*t), "sell price"));

    let Some(table) = table else {
        return Field::missing("sell price table not found");
    };

    let mut prices = BTreeMap::new();
    for row in table.select(&markup::ROW).skip(1) {
        let cells: Vec<_> = markup::cells(row)
            .into_iter()
            .filter(|c| !markup::is_header_cell(*c))
            .collect();
        if cells.len() < 2 {
            continue;
        }
        let quality = markup::text(cells[0]).to_lowercase();
        if let Some(price) = markup::first_number(&markup::text(cells[1])) {
            let quality = if quality.is_empty() { "base".to_string() } else { quality };
            prices.insert(quality, price);
        }
    }

    if prices.is_empty() {
        Field::missing("sell price table has no price rows")
    } else {
        Field::found(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CROP: &str = r#"
        <table class="infobox">
            <tr><th>Growth Time:</th><td>4 days</td></tr>
            <tr><th>Season:</th><td>Spring</td></tr>
            <tr><th>Sell Price:</th><td>50g</td></tr>
        </table>
        <table class="wikitable">
            <tr><th colspan="2">Sell Price</th></tr>
            <tr><td>Regular</td><td>120g</td></tr>
            <tr><td>Silver</td><td>150g</td></tr>
        </table>
    "#;

    #[test]
    fn parses_infobox_and_price_table() {
        let record = extract(CROP, "Strawberry");
        assert_eq!(record.name, "Strawberry");
        assert_eq!(record.seasons, vec!["Spring"]);
        assert_eq!(record.growth_time, Some(4));
        assert_eq!(record.regrowth_time, None);
        assert_eq!(record.sell_prices.get("regular"), Some(&120));
        assert_eq!(record.sell_prices.get("silver"), Some(&150));
        assert!(record.parsing_warnings.is_empty(), "{:?}", record.parsing_warnings);
    }

    #[test]
    fn multi_season_with_regrowth() {
        let html = r#"<table class="infobox">
            <tr><th>Season</th><td>Summer, Fall</td></tr>
            <tr><th>Growth Time</th><td>14 days</td></tr>
            <tr><th>Regrowth</th><td>4 days</td></tr>
        </table>"#;
        let record = extract(html, "Corn");
        assert_eq!(record.seasons, vec!["Summer", "Fall"]);
        assert_eq!(record.growth_time, Some(14));
        assert_eq!(record.regrowth_time, Some(4));
    }

    #[test]
    fn empty_markup_degrades_to_warnings() {
        let record = extract("<html></html>", "X");
        assert_eq!(record.page_type, PageType::Crop);
        assert_eq!(record.name, "X");
        assert!(!record.parsing_warnings.is_empty());
    }

    #[test]
    fn malformed_markup_does_not_panic() {
        let record = extract("<html><table><tr><th>Bad</html>", "Bad Crop");
        assert_eq!(record.name, "Bad Crop");
    }
}
