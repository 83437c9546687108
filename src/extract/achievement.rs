use serde::Serialize;

use super::{cell_text, fetch_listing, narrow_to_title, Warnings};
use crate::classify::PageType;
use crate::client::PageSource;
use crate::markup::{self, HeaderedTable};

pub const LISTING_PAGE: &str = "Achievements";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    pub achievements: Vec<Achievement>,
    pub parsing_warnings: Vec<String>,
}

fn name_column(table: &HeaderedTable<'_>) -> Option<usize> {
    table.column(&["achievement"]).or_else(|| table.column(&["name"]))
}

pub fn has_listing(markup: &str) -> bool {
    let doc = markup::parse(markup);
    doc.select(&markup::TABLE)
        .filter_map(markup::headered_table)
        .any(|t| name_column(&t).is_some())
}

pub fn extract(markup: &str, title: &str) -> AchievementRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();
    let mut achievements = Vec::new();
    let mut found_table = false;

    for table in doc.select(&markup::TABLE).filter_map(markup::headered_table) {
        let Some(name_col) = name_column(&table) else { continue };
        found_table = true;

        let description_col = table.column(&["description", "requirement"]);
        let unlocks_col = table.column(&["unlock", "reward"]);

        achievements.extend(table.rows.iter().filter_map(|row| {
            Some(Achievement {
                name: cell_text(row, Some(name_col))?,
                description: cell_text(row, description_col),
                unlocks: cell_text(row, unlocks_col),
            })
        }));
    }

    if !found_table {
        warnings.push("no achievement table found");
    }

    AchievementRecord {
        page_type: PageType::Achievement,
        name: title.to_string(),
        achievements: narrow_to_title(achievements, title, |a| a.name.as_str()),
        parsing_warnings: warnings.into_vec(),
    }
}

pub async fn extract_with_source<S>(markup: &str, title: &str, source: &S) -> AchievementRecord
where
    S: PageSource + ?Sized,
{
    if has_listing(markup) {
        return extract(markup, title);
    }

    tracing::info!(title = %title, "no achievement table on page, fetching {}", LISTING_PAGE);
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

#[cfg(test)]
mod tests {
    use super::*;

    const ACHIEVEMENTS: &str = r#"
        <html><body>
        <table class="wikitable">
            <tr><th>Achievement</th><th>Description</th><th>Unlocks</th></tr>
            <tr><td>Greenhorn</td><td>Earn 15,000g</td><td>Nothing</td></tr>
            <tr><td>Cowpoke</td><td>Earn 50,000g</td><td>Nothing</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_listing() {
        let record = extract(ACHIEVEMENTS, "Achievements");
        assert_eq!(record.page_type, PageType::Achievement);
        let names: Vec<_> = record.achievements.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Greenhorn", "Cowpoke"]);
        assert!(record.achievements[0].description.as_deref().unwrap().contains("15,000g"));
        assert_eq!(record.achievements[0].unlocks.as_deref(), Some("Nothing"));
    }

    #[test]
    fn empty_page_gives_empty_list() {
        let record = extract("<html><body></body></html>", "Empty Achievements");
        assert_eq!(record.name, "Empty Achievements");
        assert!(record.achievements.is_empty());
        assert_eq!(record.parsing_warnings, vec!["no achievement table found"]);
    }
}
