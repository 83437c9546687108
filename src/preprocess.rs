//! Turns natural-language questions into wiki search terms.
//!
//! Rules are tried in a fixed order and the first one that matches decides the
//! terms. Queries no rule understands fall back to their keywords.

use once_cell::sync::Lazy;
use regex::Regex;

const SEASONS: [&str; 4] = ["spring", "summer", "fall", "winter"];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "be", "to", "of", "in", "on", "at", "for", "with",
    "and", "or", "do", "does", "did", "i", "me", "my", "you", "your", "it", "its", "can",
    "could", "should", "would", "what", "where", "when", "which", "who", "how", "why", "get",
    "find", "about", "there", "this", "that", "some", "any", "much", "many", "best",
];

/// Location words people use, mapped to the wiki's page titles.
const LOCATION_ALIASES: &[(&str, &str)] = &[
    ("desert", "Calico Desert"),
    ("calico desert", "Calico Desert"),
    ("skull cavern", "Skull Cavern"),
    ("skull caverns", "Skull Cavern"),
    ("secret woods", "Secret Woods"),
    ("woods", "Secret Woods"),
    ("mines", "The Mines"),
    ("mine", "The Mines"),
    ("quarry", "Quarry"),
    ("beach", "The Beach"),
    ("forest", "Cindersap Forest"),
    ("mountain", "The Mountain"),
    ("mountains", "The Mountain"),
    ("town", "Pelican Town"),
    ("sewer", "The Sewers"),
    ("sewers", "The Sewers"),
    ("island", "Ginger Island"),
    ("ginger island", "Ginger Island"),
    ("railroad", "Railroad"),
    ("bus stop", "Bus Stop"),
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile query pattern")
}

static GIFT_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        regex(r"what (?:does|do|would) (\w+) (?:like|love|want|enjoy)"),
        regex(r"(\w+)(?:'s|s')? (?:favou?rite|loved?|liked?) (?:gifts?|items?|things?)"),
        regex(r"gifts? (?:for|to) (\w+)"),
        regex(r"what (?:to|should i|can i) give (\w+)"),
    ]
});

static FIND_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        regex(r"^where (?:is|are|to find|can i find|do i find|to get) (?:the )?(.+?)\??$"),
        regex(r"^how (?:to|do i|can i) (?:get to|find|reach) (?:the )?(.+?)\??$"),
        regex(r"^(?:the )?(.+?) location\??$"),
    ]
});

static WORD: Lazy<Regex> = Lazy::new(|| regex(r"[a-z0-9']+"));

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn season_in(query: &str) -> Option<&'static str> {
    let words: Vec<&str> = WORD.find_iter(query).map(|m| m.as_str()).collect();
    SEASONS
        .iter()
        .copied()
        .find(|s| words.contains(s) || (*s == "fall" && words.contains(&"autumn")))
}

fn gift(query: &str) -> Option<Vec<String>> {
    let name = GIFT_PATTERNS
        .iter()
        .find_map(|re| re.captures(query))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !STOP_WORDS.contains(name))?;

    Some(vec![title_case(name), "Friendship".to_string()])
}

fn birthday(query: &str) -> Option<Vec<String>> {
    if !query.contains("birthday") {
        return None;
    }
    let mut terms = vec!["Calendar".to_string()];
    if let Some(season) = season_in(query) {
        terms.push(title_case(season));
    }
    Some(terms)
}

fn seasonal_crops(query: &str) -> Option<Vec<String>> {
    if !query.contains("crop") || query.contains("bundle") {
        return None;
    }
    let season = season_in(query)?;
    let page = match season {
        "winter" => "Winter Seeds".to_string(),
        other => format!("{} Crops", title_case(other)),
    };
    Some(vec![page, "Crops".to_string()])
}

fn find_location(query: &str) -> Option<Vec<String>> {
    let target = FIND_PATTERNS
        .iter()
        .find_map(|re| re.captures(query))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())?;

    let page = LOCATION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == target)
        .map(|(_, page)| page.to_string())
        .unwrap_or_else(|| title_case(target));
    Some(vec![page])
}

fn bundle(query: &str) -> Option<Vec<String>> {
    let words: Vec<&str> = WORD.find_iter(query).map(|m| m.as_str()).collect();
    let pos = words.iter().position(|w| *w == "bundle" || *w == "bundles")?;

    if words[pos] == "bundles" || query.contains("community center") {
        return Some(vec!["Bundles".to_string()]);
    }

    let name: Vec<&str> = words[..pos]
        .iter()
        .copied()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();
    if name.is_empty() {
        return Some(vec!["Bundles".to_string()]);
    }
    Some(vec![
        format!("{} Bundle", title_case(&name.join(" "))),
        "Bundles".to_string(),
    ])
}

fn festival(query: &str) -> Option<Vec<String>> {
    if !query.contains("festival") {
        return None;
    }
    let festivals: &[&str] = match season_in(query) {
        Some("spring") => &["Egg Festival", "Flower Dance"],
        Some("summer") => &["Luau", "Dance of the Moonlight Jellies"],
        Some("fall") => &["Stardew Valley Fair", "Spirit's Eve"],
        Some("winter") => &["Festival of Ice", "Night Market", "Feast of the Winter Star"],
        _ => &["Festivals"],
    };
    Some(festivals.iter().map(|f| f.to_string()).collect())
}

fn quest(query: &str) -> Option<Vec<String>> {
    if query.contains("special order") {
        return Some(vec!["Quests".to_string(), "Special Orders".to_string()]);
    }
    (query.contains("quest") || query.contains("help wanted")).then(|| vec!["Quests".to_string()])
}

type Rule = fn(&str) -> Option<Vec<String>>;

/// In priority order; the first match wins.
const RULES: [Rule; 7] = [gift, birthday, seasonal_crops, find_location, bundle, festival, quest];

/// Ordered search terms for `query`, never empty.
pub fn preprocess(query: &str) -> Vec<String> {
    let normalized = query.trim().to_lowercase();

    if let Some(terms) = RULES.iter().find_map(|rule| rule(&normalized)) {
        tracing::debug!(query = %query, terms = ?terms, "query matched a rule");
        return terms;
    }

    let keywords: Vec<&str> = WORD
        .find_iter(&normalized)
        .map(|m| m.as_str().trim_matches('\''))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .collect();

    match keywords.as_slice() {
        [] => vec![query.to_string()],
        [single] => vec![single.to_string()],
        many => {
            let mut terms = vec![many.join(" ")];
            terms.extend(many.iter().map(|k| k.to_string()));
            terms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn first(query: &str) -> String {
        preprocess(query).remove(0)
    }

    #[test]
    fn gift_questions_name_the_villager() {
        assert_eq!(preprocess("what does sebastian like"), vec!["Sebastian", "Friendship"]);
        assert_eq!(first("sebastian's favorite gift"), "Sebastian");
        assert_eq!(first("gift for haley"), "Haley");
        assert_eq!(first("best gift for penny"), "Penny");
    }

    #[test]
    fn birthdays_go_to_calendar() {
        assert_eq!(preprocess("spring birthdays"), vec!["Calendar", "Spring"]);
        assert_eq!(first("birthdays in summer"), "Calendar");
        assert_eq!(first("fall birthday"), "Calendar");
    }

    #[test]
    fn seasonal_crops() {
        assert_eq!(first("crops in summer"), "Summer Crops");
        assert_eq!(first("spring crops"), "Spring Crops");
        assert_eq!(first("crops for winter"), "Winter Seeds");
    }

    #[test]
    fn locations_use_aliases() {
        assert_eq!(first("where is the desert"), "Calico Desert");
        assert_eq!(first("how to get to skull cavern"), "Skull Cavern");
        assert_eq!(first("secret woods location"), "Secret Woods");
        assert_eq!(first("where to find ancient seed"), "Ancient Seed");
    }

    #[test]
    fn bundles() {
        assert_eq!(preprocess("spring crops bundle"), vec!["Spring Crops Bundle", "Bundles"]);
        assert_eq!(first("quality crops bundle"), "Quality Crops Bundle");
        assert_eq!(preprocess("community center bundles"), vec!["Bundles"]);
    }

    #[test]
    fn festivals_by_season() {
        assert_eq!(first("spring festival"), "Egg Festival");
        assert_eq!(first("summer festival"), "Luau");
        assert_eq!(first("fall festivals"), "Stardew Valley Fair");
        assert_eq!(first("winter festivals"), "Festival of Ice");
    }

    #[test]
    fn quests() {
        assert_eq!(first("community center quests"), "Quests");
        assert_eq!(first("special orders"), "Quests");
        assert_eq!(first("help wanted quests"), "Quests");
    }

    #[test]
    fn keyword_fallback() {
        assert_eq!(
            preprocess("how to catch legendary fish"),
            vec!["catch legendary fish", "catch", "legendary", "fish"]
        );
        assert_eq!(preprocess("Parsnip"), vec!["parsnip"]);
        assert_eq!(preprocess("???"), vec!["???"]);
    }

    proptest! {
        #[test]
        fn never_empty_and_deterministic(query in ".{0,60}") {
            let terms = preprocess(&query);
            prop_assert!(!terms.is_empty());
            prop_assert_eq!(&terms, &preprocess(&query));
        }

        #[test]
        fn meaningful_queries_give_meaningful_terms(query in "[a-zA-Z' ]{1,40}") {
            prop_assume!(!query.trim().is_empty());
            for term in preprocess(&query) {
                prop_assert!(!term.trim().is_empty());
            }
        }
    }
}
