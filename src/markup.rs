//! HTML helpers shared by the extractors.
//!
//! Everything here is total: malformed markup yields empty results, never a panic.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to parse built-in selector")
}

pub static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
pub static INFOBOX: Lazy<Selector> = Lazy::new(|| selector("table.infobox"));
pub static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
pub static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
pub static LIST_ITEM: Lazy<Selector> = Lazy::new(|| selector("li"));
pub static HEADING_H2: Lazy<Selector> = Lazy::new(|| selector("h2"));
pub static HEADING_H3: Lazy<Selector> = Lazy::new(|| selector("h3"));

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("Failed to compile number regex"));
static GOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s*g\b").expect("Failed to compile price regex"));

pub fn parse(markup: &str) -> Html {
    Html::parse_document(markup)
}

/// Collapses runs of whitespace to single spaces and trims.
pub fn normalize_ws(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_whitespace = true;

    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_whitespace {
                result.push(' ');
            }
            last_was_whitespace = true;
        } else {
            result.push(ch);
            last_was_whitespace = false;
        }
    }

    result.trim_end().to_string()
}

/// Visible text of an element, text nodes joined by single spaces.
pub fn text(el: ElementRef<'_>) -> String {
    let joined = el
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_ws(&joined)
}

/// `th`/`td` children of a row, ignoring cells of nested tables.
pub fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
        .collect()
}

pub fn is_header_cell(el: ElementRef<'_>) -> bool {
    el.value().name() == "th"
}

/// The page's infobox: `table.infobox`, else the first table.
pub fn infobox(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&INFOBOX)
        .next()
        .or_else(|| doc.select(&TABLE).next())
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoRow {
    /// Key text, lowercased, trailing colon removed.
    pub key: String,
    pub value: String,
}

/// Key/value rows of an info table (first cell is the key, second the value).
pub fn info_rows(table: ElementRef<'_>) -> Vec<InfoRow> {
    table
        .select(&ROW)
        .filter_map(|row| {
            let cells = cells(row);
            if cells.len() < 2 {
                return None;
            }
            let key = text(cells[0]);
            let key = key.trim_end_matches(':').trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some(InfoRow {
                key,
                value: text(cells[1]),
            })
        })
        .collect()
}

pub fn row_count(table: ElementRef<'_>) -> usize {
    table.select(&ROW).count()
}

/// A listing table whose columns were located by header text.
#[derive(Debug, Clone)]
pub struct HeaderedTable<'a> {
    /// Lowercased header texts in column order.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ElementRef<'a>>>,
}

impl HeaderedTable<'_> {
    /// Index of the first column whose header contains any of `keys`.
    pub fn column(&self, keys: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| keys.iter().any(|k| h.contains(k)))
    }
}

/// Splits a table into its header row (first row made only of `th` cells) and the
/// content rows after it. `None` when there is no such header row.
pub fn headered_table(table: ElementRef<'_>) -> Option<HeaderedTable<'_>> {
    let rows: Vec<_> = table.select(&ROW).collect();
    let header_idx = rows.iter().position(|row| {
        let cells = cells(*row);
        cells.len() >= 2 && cells.iter().all(|c| is_header_cell(*c))
    })?;

    let headers = cells(rows[header_idx])
        .into_iter()
        .map(|c| text(c).to_lowercase())
        .collect();

    let rows = rows[header_idx + 1..]
        .iter()
        .map(|row| cells(*row))
        .filter(|cells| !cells.is_empty())
        .collect();

    Some(HeaderedTable { headers, rows })
}

pub fn link_texts(el: ElementRef<'_>) -> Vec<String> {
    el.select(&LINK)
        .map(text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// First ASCII integer in the text, commas ignored.
pub fn first_number(s: &str) -> Option<u32> {
    let cleaned = s.replace(',', "");
    NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

pub fn all_numbers(s: &str) -> Vec<String> {
    NUMBER.find_iter(s).map(|m| m.as_str().to_string()).collect()
}

/// Integer immediately followed by a `g` suffix, e.g. `1,500g` -> 1500.
pub fn gold_price(s: &str) -> Option<u32> {
    let cleaned = s.replace(',', "");
    GOLD.captures(&cleaned)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Comma-separated list, entries trimmed, empties dropped.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_nodes_with_spaces() {
        let doc = parse("<table><tr><td><a>Demetrius</a>(Step-Father),\n  <b>Robin</b></td></tr></table>");
        let td = doc.select(&selector("td")).next().unwrap();
        assert_eq!(text(td), "Demetrius (Step-Father), Robin");
    }

    #[test]
    fn infobox_prefers_class_then_first_table() {
        let doc = parse(r#"<table id="a"><tr><td>x</td></tr></table><table class="infobox"></table>"#);
        assert_eq!(infobox(&doc).unwrap().value().attr("class"), Some("infobox"));

        let doc = parse(r#"<table id="a"></table>"#);
        assert_eq!(infobox(&doc).unwrap().value().attr("id"), Some("a"));

        assert!(infobox(&parse("<p>none</p>")).is_none());
    }

    #[test]
    fn info_rows_lowercase_keys() {
        let doc = parse("<table><tr><th>Growth Time:</th><td>4 days</td></tr><tr><td>lonely</td></tr></table>");
        let rows = info_rows(infobox(&doc).unwrap());
        assert_eq!(rows, vec![InfoRow { key: "growth time".into(), value: "4 days".into() }]);
    }

    #[test]
    fn headered_table_locates_columns() {
        let doc = parse(
            "<table><tr><th>Icon</th><th>Name</th><th>Description</th></tr>\
             <tr><td></td><td>Amethyst</td><td>Purple</td></tr><tr></tr></table>",
        );
        let table = headered_table(doc.select(&TABLE).next().unwrap()).unwrap();
        assert_eq!(table.column(&["name"]), Some(1));
        assert_eq!(table.column(&["description"]), Some(2));
        assert_eq!(table.column(&["price"]), None);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn numbers_and_prices() {
        assert_eq!(first_number("8 days"), Some(8));
        assert_eq!(first_number("no digits"), None);
        assert_eq!(first_number("٣٣ then 42"), Some(42));
        assert_eq!(gold_price("٣g or 15g"), Some(15));
        assert_eq!(gold_price("1,500g"), Some(1500));
        assert_eq!(gold_price("120 g"), Some(120));
        assert_eq!(gold_price("Invalid Price Format"), None);
        assert_eq!(split_list("Spring, Summer,"), vec!["Spring", "Summer"]);
    }
}
