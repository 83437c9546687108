//! Turning fetched wiki markup into typed records.
//!
//! Each page type has one extractor taking `(markup, title)`. Extractors never fail:
//! a field that cannot be recovered adds an entry to `parsing_warnings` and
//! extraction carries on with the remaining fields.

pub mod achievement;
pub mod bundle;
pub mod collection;
pub mod crop;
pub mod fish;
pub mod generic;
pub mod npc;
pub mod quest;
pub mod recipe;
pub mod skill;

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::classify::{classify, PageType};
use crate::client::{PageFetchResult, PageSource};
use crate::markup::{self, InfoRow};

pub use achievement::AchievementRecord;
pub use bundle::BundleRecord;
pub use collection::CollectionRecord;
pub use crop::CropRecord;
pub use fish::FishRecord;
pub use generic::GenericRecord;
pub use npc::NpcRecord;
pub use quest::QuestRecord;
pub use recipe::RecipeRecord;
pub use skill::SkillRecord;

/// Outcome of extracting a single field: a value, a warning, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    pub value: Option<T>,
    pub warning: Option<String>,
}

impl<T> Field<T> {
    pub fn found(value: T) -> Self {
        Self { value: Some(value), warning: None }
    }

    pub fn missing(warning: impl Into<String>) -> Self {
        Self { value: None, warning: Some(warning.into()) }
    }

    pub fn partial(value: T, warning: impl Into<String>) -> Self {
        Self { value: Some(value), warning: Some(warning.into()) }
    }
}

/// Accumulates field warnings for one extraction.
#[derive(Debug, Default)]
pub struct Warnings(Vec<String>);

impl Warnings {
    /// Records the field's warning, if any, and hands back its value.
    pub fn take<T>(&mut self, field: Field<T>) -> Option<T> {
        if let Some(warning) = field.warning {
            self.0.push(warning);
        }
        field.value
    }

    pub fn push(&mut self, warning: impl Into<String>) {
        self.0.push(warning.into());
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// The infobox's key/value rows, or a warning when the page has none.
pub(crate) fn infobox_rows(doc: &scraper::Html) -> Field<Vec<InfoRow>> {
    match markup::infobox(doc) {
        None => Field::missing("no infobox table found"),
        Some(table) => {
            let rows = markup::info_rows(table);
            if rows.is_empty() {
                Field::partial(rows, "infobox has no key/value rows")
            } else {
                Field::found(rows)
            }
        }
    }
}

/// Value of the first row whose key starts with `needle`, else the first whose key
/// contains it ("growth time" must not pick up "regrowth time").
pub(crate) fn row_value<'a>(rows: &'a [InfoRow], needle: &str) -> Option<&'a str> {
    rows.iter()
        .find(|r| r.key.starts_with(needle))
        .or_else(|| rows.iter().find(|r| r.key.contains(needle)))
        .map(|r| r.value.as_str())
}

/// A required text field from the infobox.
pub(crate) fn text_field(rows: &[InfoRow], needle: &str, label: &str) -> Field<String> {
    match row_value(rows, needle) {
        Some(v) if !v.is_empty() => Field::found(v.to_string()),
        Some(_) => Field::missing(format!("{} is empty", label)),
        None => Field::missing(format!("{} not found", label)),
    }
}

/// Keeps the entries named `title` when there are any; a listing page keeps them all.
pub(crate) fn narrow_to_title<T>(
    entries: Vec<T>,
    title: &str,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let wanted = title.trim().to_lowercase();
    if !entries.iter().any(|e| name(e).to_lowercase() == wanted) {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| name(e).to_lowercase() == wanted)
        .collect()
}

/// Markup of a canonical listing page, or a warning when `source` cannot provide it.
pub(crate) async fn fetch_listing<S>(source: &S, page: &str) -> Field<String>
where
    S: PageSource + ?Sized,
{
    match source.fetch_page(page).await {
        Ok(listing) => Field::found(listing.html),
        Err(e) => {
            tracing::error!(page = %page, error = %e, "failed to fetch listing page");
            Field::missing(format!("could not fetch {} page: {}", page, e))
        }
    }
}

/// Text of the cell at `idx`, if the row has one and it is not blank.
pub(crate) fn cell_text(row: &[scraper::ElementRef<'_>], idx: Option<usize>) -> Option<String> {
    let text = markup::text(*row.get(idx?)?);
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedRecord {
    Crop(CropRecord),
    Npc(NpcRecord),
    Fish(FishRecord),
    Recipe(RecipeRecord),
    Bundle(BundleRecord),
    Skill(SkillRecord),
    Quest(QuestRecord),
    Achievement(AchievementRecord),
    Collection(CollectionRecord),
    Item(GenericRecord),
}

impl ExtractedRecord {
    pub fn page_type(&self) -> PageType {
        match self {
            ExtractedRecord::Crop(r) => r.page_type,
            ExtractedRecord::Npc(r) => r.page_type,
            ExtractedRecord::Fish(r) => r.page_type,
            ExtractedRecord::Recipe(r) => r.page_type,
            ExtractedRecord::Bundle(r) => r.page_type,
            ExtractedRecord::Skill(r) => r.page_type,
            ExtractedRecord::Quest(r) => r.page_type,
            ExtractedRecord::Achievement(r) => r.page_type,
            ExtractedRecord::Collection(r) => r.page_type,
            ExtractedRecord::Item(r) => r.page_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExtractedRecord::Crop(r) => &r.name,
            ExtractedRecord::Npc(r) => &r.name,
            ExtractedRecord::Fish(r) => &r.name,
            ExtractedRecord::Recipe(r) => &r.name,
            ExtractedRecord::Bundle(r) => &r.name,
            ExtractedRecord::Skill(r) => &r.name,
            ExtractedRecord::Quest(r) => &r.name,
            ExtractedRecord::Achievement(r) => &r.name,
            ExtractedRecord::Collection(r) => &r.name,
            ExtractedRecord::Item(r) => &r.name,
        }
    }

    pub fn parsing_warnings(&self) -> &[String] {
        match self {
            ExtractedRecord::Crop(r) => &r.parsing_warnings,
            ExtractedRecord::Npc(r) => &r.parsing_warnings,
            ExtractedRecord::Fish(r) => &r.parsing_warnings,
            ExtractedRecord::Recipe(r) => &r.parsing_warnings,
            ExtractedRecord::Bundle(r) => &r.parsing_warnings,
            ExtractedRecord::Skill(r) => &r.parsing_warnings,
            ExtractedRecord::Quest(r) => &r.parsing_warnings,
            ExtractedRecord::Achievement(r) => &r.parsing_warnings,
            ExtractedRecord::Collection(r) => &r.parsing_warnings,
            ExtractedRecord::Item(r) => &r.parsing_warnings,
        }
    }
}

/// Signature shared by every dispatch-table entry: `(markup, title, tag)`.
pub type ExtractFn = fn(&str, &str, PageType) -> ExtractedRecord;

fn extract_generic(markup: &str, title: &str, page_type: PageType) -> ExtractedRecord {
    ExtractedRecord::Item(generic::extract(markup, title, page_type))
}

static DISPATCH: Lazy<HashMap<PageType, ExtractFn>> = Lazy::new(|| {
    let mut table: HashMap<PageType, ExtractFn> = HashMap::new();
    table.insert(PageType::Crop, |m, t, _| ExtractedRecord::Crop(crop::extract(m, t)));
    table.insert(PageType::Npc, |m, t, _| ExtractedRecord::Npc(npc::extract(m, t)));
    table.insert(PageType::Fish, |m, t, _| ExtractedRecord::Fish(fish::extract(m, t)));
    table.insert(PageType::Recipe, |m, t, _| ExtractedRecord::Recipe(recipe::extract(m, t)));
    table.insert(PageType::Bundle, |m, t, _| {
        ExtractedRecord::Bundle(bundle::extract(m, t, None))
    });
    table.insert(PageType::Skill, |m, t, _| ExtractedRecord::Skill(skill::extract(m, t)));
    table.insert(PageType::Quest, |m, t, _| ExtractedRecord::Quest(quest::extract(m, t)));
    table.insert(PageType::Achievement, |m, t, _| {
        ExtractedRecord::Achievement(achievement::extract(m, t))
    });
    table.insert(PageType::Collection, |m, t, _| {
        ExtractedRecord::Collection(collection::extract(m, t))
    });
    table
});

/// Extractor registered for `page_type`; unregistered tags use the generic extractor.
pub fn extractor_for(page_type: PageType) -> ExtractFn {
    DISPATCH.get(&page_type).copied().unwrap_or(extract_generic)
}

/// Runs the extractor for an already-classified page.
pub fn extract(markup: &str, title: &str, page_type: PageType) -> ExtractedRecord {
    tracing::debug!(title = %title, page_type = %page_type, "extracting page");
    extractor_for(page_type)(markup, title, page_type)
}

/// Classifies a fetched page and extracts it without any follow-up fetches.
pub fn extract_fetched(page: &PageFetchResult) -> ExtractedRecord {
    let page_type = classify(&page.categories, &page.title);
    extract(&page.html, &page.title, page_type)
}

/// Classifies and extracts a fetched page, consulting `source` for canonical listing
/// pages when the page itself is a stub (bundles) or has no listing table (quests,
/// achievements).
pub async fn extract_page<S>(page: &PageFetchResult, source: &S) -> ExtractedRecord
where
    S: PageSource + ?Sized,
{
    let page_type = classify(&page.categories, &page.title);
    tracing::info!(title = %page.title, page_type = %page_type, "detected page type");

    match page_type {
        PageType::Bundle => ExtractedRecord::Bundle(
            bundle::extract_with_source(&page.html, &page.title, source).await,
        ),
        PageType::Quest => ExtractedRecord::Quest(
            quest::extract_with_source(&page.html, &page.title, source).await,
        ),
        PageType::Achievement => ExtractedRecord::Achievement(
            achievement::extract_with_source(&page.html, &page.title, source).await,
        ),
        other => extract(&page.html, &page.title, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_collect_field_outcomes() {
        let mut warnings = Warnings::default();
        assert_eq!(warnings.take(Field::found(1)), Some(1));
        assert_eq!(warnings.take(Field::<u32>::missing("gone")), None);
        assert_eq!(warnings.take(Field::partial(2, "odd")), Some(2));
        assert_eq!(warnings.into_vec(), vec!["gone", "odd"]);
    }

    #[test]
    fn every_tag_dispatches_to_matching_variant() {
        let tags = [
            PageType::Crop,
            PageType::Npc,
            PageType::Fish,
            PageType::Recipe,
            PageType::Bundle,
            PageType::Skill,
            PageType::Quest,
            PageType::Achievement,
            PageType::Collection,
            PageType::Artifact,
            PageType::Mineral,
            PageType::Monster,
            PageType::Item,
        ];
        for tag in tags {
            let record = extract("<html></html>", "X", tag);
            assert_eq!(record.page_type(), tag);
            assert_eq!(record.name(), "X");
        }
    }

    #[test]
    fn unregistered_tags_fall_back_to_generic() {
        let record = extract("<html></html>", "Prismatic Shard", PageType::Mineral);
        assert!(matches!(record, ExtractedRecord::Item(_)));
    }

    #[test]
    fn serialized_record_carries_type_name_and_warnings() {
        let record = extract("<html></html>", "X", PageType::Crop);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "crop");
        assert_eq!(json["name"], "X");
        assert!(json["parsing_warnings"].is_array());
    }
}
