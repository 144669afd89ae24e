// Sitting-index parsing: one day's JSON listing → debate references.
//
// The index is a list of per-house sittings. Newer records list debates under
// `items[] {href, title}`; most historic days only carry `top_level_sections`
// wrapping `section` / `oral_questions` with a slug, from which the href is built.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use hansard_client::month_slug;
use hansard_common::{DebateRef, House};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static RELEVANT_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:aliens?|immigra\w*|immigrants?|migrants?|foreign\w*|unemploy\w*|labou?r\w*|employment|wages?|workers?|workmen|trades?\s+unions?|man-?power|sweating|sweated|colonial)\b",
    )
    .expect("valid regex")
});

/// Debate titles worth fetching when `relevant_titles_only` is on.
pub fn is_relevant_title(title: &str) -> bool {
    RELEVANT_TITLE_RE.is_match(title)
}

/// All debate references in a sitting index, deduplicated by href, in listing order.
pub fn parse_sitting_index(date: NaiveDate, index: &Value) -> Vec<DebateRef> {
    let sittings: Vec<&Value> = match index {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![index],
        other => {
            warn!(%date, kind = ?other, "Sitting index is neither a list nor an object");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    for item in sittings {
        let Some(map) = item.as_object() else { continue };
        for (key, sitting) in map {
            let Some(house) = House::from_sitting_key(key) else {
                debug!(%date, key = key.as_str(), "Ignoring non-chamber sitting");
                continue;
            };
            let Some(sitting) = sitting.as_object() else { continue };
            for debate in debates_in_sitting(date, house, sitting) {
                if seen.insert(debate.href.clone()) {
                    refs.push(debate);
                }
            }
        }
    }
    refs
}

fn debates_in_sitting(date: NaiveDate, house: House, sitting: &Map<String, Value>) -> Vec<DebateRef> {
    if let Some(Value::Array(items)) = sitting.get("items") {
        return items
            .iter()
            .filter_map(|item| {
                let href = item.get("href")?.as_str()?.trim();
                if href.is_empty() {
                    return None;
                }
                let title = item.get("title").and_then(Value::as_str).unwrap_or("").trim();
                Some(DebateRef {
                    date,
                    house: House::from_href(href).unwrap_or(house),
                    href: href.trim_end_matches(".js").to_string(),
                    title: title.to_string(),
                })
            })
            .collect();
    }

    let Some(Value::Array(sections)) = sitting.get("top_level_sections") else {
        return Vec::new();
    };
    sections
        .iter()
        .filter_map(|section| {
            let info = section
                .get("section")
                .or_else(|| section.get("oral_questions"))?
                .as_object()?;
            let slug = info.get("slug")?.as_str()?.trim();
            if slug.is_empty() {
                return None;
            }
            let day = info
                .get("date")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .unwrap_or(date);
            let title = info.get("title").and_then(Value::as_str).unwrap_or("").trim();
            Some(DebateRef {
                date,
                house,
                href: format!(
                    "/{}/{}/{}/{:02}/{}",
                    house.as_str(),
                    day.year(),
                    month_slug(day),
                    day.day(),
                    slug
                ),
                title: title.to_string(),
            })
        })
        .collect()
}
