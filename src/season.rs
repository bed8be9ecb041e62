use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// How many seasons back from the current year are scraped, current year included.
pub const SEASON_WINDOW: i32 = 4;

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());
static OPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("option").unwrap());

/// Every year token inside `<option>` entries, in document order, duplicates removed.
pub fn option_years(document: &Html) -> Vec<i32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for option in document.select(&OPTION) {
        let text = option.text().collect::<String>();
        for caps in YEAR_TOKEN.captures_iter(&text) {
            let Ok(year) = caps[1].parse::<i32>() else {
                continue;
            };
            if seen.insert(year) {
                out.push(year);
            }
        }
    }
    out
}

pub fn in_window(year: i32, current_year: i32) -> bool {
    year <= current_year && year > current_year - SEASON_WINDOW
}

pub fn filter_recent(years: &[i32], current_year: i32) -> Vec<i32> {
    years
        .iter()
        .copied()
        .filter(|y| in_window(*y, current_year))
        .collect()
}

/// Seasons worth scraping from a season-selector page.
pub fn select_seasons(html: &str, current_year: i32) -> Vec<i32> {
    let document = Html::parse_document(html);
    filter_recent(&option_years(&document), current_year)
}
