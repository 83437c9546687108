use serde::Serialize;

use super::{infobox_rows, row_value, text_field, Warnings};
use crate::classify::PageType;
use crate::markup;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FishRecord {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    pub parsing_warnings: Vec<String>,
}

pub fn extract(markup: &str, title: &str) -> FishRecord {
    let doc = markup::parse(markup);
    let mut warnings = Warnings::default();

    let rows = warnings.take(infobox_rows(&doc)).unwrap_or_default();
    let location = warnings.take(text_field(&rows, "location", "location"));
    let seasons = match row_value(&rows, "season") {
        Some(value) => markup::split_list(value),
        None => {
            warnings.push("season not found");
            Vec::new()
        }
    };
    let time = warnings.take(text_field(&rows, "time", "time"));
    let weather = warnings.take(text_field(&rows, "weather", "weather"));
    let difficulty = row_value(&rows, "difficulty").and_then(markup::first_number);

    FishRecord {
        page_type: PageType::Fish,
        name: title.to_string(),
        location,
        seasons,
        time,
        weather,
        difficulty,
        parsing_warnings: warnings.into_vec(),
    }
}
