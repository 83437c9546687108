use serde::Serialize;

use super::{cell_text, fetch_listing, narrow_to_title, Warnings};
use crate::classify::PageType;
use crate::client::PageSource;
use crate::markup::{self, HeaderedTable};

pub const LISTING_PAGE: &str = "Quests";

const REQUIREMENT_HEADERS: [&str; 4] = ["requirement", "description", "objective", "task"];
const PROVIDER_HEADERS: [&str; 3] = ["provided by", "requester", "client"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    pub quests: Vec<QuestEntry>,
    pub parsing_warnings: Vec<String>,
}

/// Name column: "Name" or "Quest...", never "Requester".
fn name_column(table: &HeaderedTable<'_>) -> Option<usize> {
    table
        .headers
        .iter()
        .position(|h| h == "name" || h.starts_with("quest"))
}

/// True when the page carries its own quest table.
pub fn has_listing(markup: &str) -> bool {
    let doc = markup::parse(markup);
    doc.select(&markup::TABLE)
        .filter_map(markup::headered_table)
        .any(|t| name_column(&t).is_some())
}

pub fn extract(markup: &str, title: &str) -> QuestRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut quests = Vec::new();
    let mut tables = 0;
    let mut skipped = 0;

    for table in doc.select(&markup::TABLE).filter_map(markup::headered_table) {
        let Some(name_col) = name_column(&table) else { continue };
        tables += 1;

        let requirement_col = table.column(&REQUIREMENT_HEADERS);
        let reward_col = table.column(&["reward"]);
        let provider_col = table.column(&PROVIDER_HEADERS);

        for row in &table.rows {
            let Some(name) = cell_text(row, Some(name_col)) else {
                skipped += 1;
                continue;
            };
            quests.push(QuestEntry {
                name,
                requirements: cell_text(row, requirement_col),
                reward: cell_text(row, reward_col),
                provided_by: cell_text(row, provider_col),
            });
        }
    }

    if tables == 0 {
        warnings.push("no quest table found");
    } else if quests.is_empty() {
        warnings.push("quest table has no entries");
    }
    if skipped > 0 {
        warnings.push(format!("skipped {} quest rows without a name", skipped));
    }

    QuestRecord {
        page_type: PageType::Quest,
        name: title.to_string(),
        quests: narrow_to_title(quests, title, |q| q.name.as_str()),
        parsing_warnings: warnings.into_vec(),
    }
}

/// Like [`extract`], reading the quests listing page through `source` when the page has
/// no quest table of its own.
pub async fn extract_with_source<S>(markup: &str, title: &str, source: &S) -> QuestRecord
where
    S: PageSource + ?Sized,
{
    if has_listing(markup) {
        return extract(markup, title);
    }

    tracing::info!(title = %title, "no quest table on page, fetching {}", LISTING_PAGE);
    let listing = fetch_listing(source, LISTING_PAGE).await;
    match listing.value {
        Some(html) => extract(&html, title),
        None => {
            let mut record = extract(markup, title);
            record.parsing_warnings.extend(listing.warning);
            record
        }
    }
}
