//! HTML extraction for the chart and title pages.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::domain::{Actor, MovieDraft};

/// Leading cast members kept per title.
pub const MAX_ACTORS: usize = 3;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unparseable {field}: '{value}'")]
    Field { field: &'static str, value: String },
    #[error("invalid GraphQL body: {0}")]
    Json(#[from] serde_json::Error),
}

struct TitleSelectors {
    title: Selector,
    year: Selector,
    rating: Selector,
    duration_items: Selector,
    metascore: Selector,
    actors: Selector,
    chart_links: Selector,
}

static SELECTORS: Lazy<TitleSelectors> = Lazy::new(|| TitleSelectors {
    title: selector(r#"[data-testid="hero__primary-text"]"#),
    year: selector(r#"ul.ipc-inline-list li a[href*="releaseinfo"]"#),
    rating: selector(r#"[data-testid="hero-rating-bar__aggregate-rating__score"] span"#),
    duration_items: selector("ul.ipc-inline-list--show-dividers li"),
    metascore: selector("span.metacritic-score-box"),
    actors: selector(r#"a[data-testid="title-cast-item__actor"]"#),
    chart_links: selector("td.titleColumn a, a.ipc-title-link-wrapper"),
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m(?:in)?)?\s*$")
        .case_insensitive(true)
        .build()
        .expect("invalid duration regex")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid built-in selector")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: String) -> Result<T, ParseError> {
    value
        .parse::<T>()
        .map_err(|_| ParseError::Field { field, value })
}

/// Runtime text such as `2h 22m`, `45m` or `3h` in minutes.
pub fn parse_duration(text: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(text)?;
    let hours = caps.get(1).map(|m| m.as_str().parse::<u32>().ok());
    let minutes = caps.get(2).map(|m| m.as_str().parse::<u32>().ok());
    match (hours, minutes) {
        (None, None) => None,
        (h, m) => h
            .unwrap_or(Some(0))?
            .checked_mul(60)?
            .checked_add(m.unwrap_or(Some(0))?),
    }
}

/// Extract the fields of a title page.
///
/// A missing title becomes `"N/A"`, a missing year `0` and a missing rating
/// `0.0`; validation downstream decides whether the record is kept.
/// `movie_id` seeds the local actor ids (`movie_id * 10 + position`).
pub fn parse_title_page(html: &str, movie_id: u32, imdb_id: &str) -> Result<MovieDraft, ParseError> {
    let document = Html::parse_document(html);

    let title = first_text(&document, &SELECTORS.title).unwrap_or_else(|| "N/A".to_string());
    let year = match first_text(&document, &SELECTORS.year) {
        Some(value) => parse_number::<i32>("year", value)?,
        None => 0,
    };
    let rating = match first_text(&document, &SELECTORS.rating) {
        Some(value) => parse_number::<f32>("rating", value.replace(',', "."))?,
        None => 0.0,
    };
    let duration_minutes = document
        .select(&SELECTORS.duration_items)
        .map(element_text)
        .find_map(|text| parse_duration(&text))
        .filter(|minutes| *minutes > 0);
    let metascore = match first_text(&document, &SELECTORS.metascore) {
        Some(value) => Some(parse_number::<u32>("metascore", value)?),
        None => None,
    };

    let actors = document
        .select(&SELECTORS.actors)
        .map(element_text)
        .filter(|name| !name.is_empty())
        .take(MAX_ACTORS)
        .enumerate()
        .filter_map(|(position, name)| {
            let local_id = movie_id * 10 + position as u32 + 1;
            Actor::new(Some(local_id), &name).ok()
        })
        .collect();

    Ok(MovieDraft {
        id: Some(movie_id),
        imdb_id: imdb_id.to_string(),
        title,
        year,
        rating,
        duration_minutes,
        metascore,
        actors,
    })
}

/// Title ids linked from the chart page, first occurrence wins.
pub fn extract_chart_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let ids = document
        .select(&SELECTORS.chart_links)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| href.contains("/title/"))
        .filter_map(|href| href.split('/').nth(2))
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    dedupe(ids)
}

/// Drop repeated ids while keeping the order of first appearance.
pub fn dedupe<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
