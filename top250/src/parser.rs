//! Field extraction for listing pages.
//!
//! Each ranked entry on a listing page is a `div.item` subtree whose inner markup
//! varies from entry to entry: optional spans, missing labels, siblings in a
//! different order. Every field is therefore extracted by its own step that yields
//! `Option<String>`; a step that finds nothing leaves that field empty and the
//! remaining steps still run.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::types::Record;

/// Label in front of the director names on the credits line
pub const DIRECTOR_LABEL: &str = "导演:";
/// Label in front of the cast on the credits line
pub const STARRING_LABEL: &str = "主演:";
/// Suffix of the vote-count span, e.g. `3169343人评价`
pub const VOTES_MARKER: &str = "人评价";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

static ITEM: Lazy<Selector> = Lazy::new(|| selector("div.item"));
static RANK: Lazy<Selector> = Lazy::new(|| selector("em"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("span.title"));
static RATING: Lazy<Selector> = Lazy::new(|| selector("span.rating_num"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("div.bd"));
static BLOCK: Lazy<Selector> = Lazy::new(|| selector("div"));
static INLINE: Lazy<Selector> = Lazy::new(|| selector("span"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static QUOTE: Lazy<Selector> = Lazy::new(|| selector("span.inq"));

/// Fields carried by the descriptive paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credits {
    pub director: Option<String>,
    pub actors: Option<String>,
    pub year: Option<String>,
    pub country: Option<String>,
    pub genre: Option<String>,
}

/// Parse a whole listing page and return every entry that could be located, in document order.
pub fn parse_page(html: &str) -> Vec<Record> {
    let document = Html::parse_document(html);
    let records: Vec<Record> = document.select(&ITEM).filter_map(parse_item).collect();
    debug!("📄 Extracted {} records from page", records.len());
    records
}

/// Parse a markup fragment holding a single entry.
///
/// Returns `None` when the fragment contains no `div.item` at all.
pub fn parse_fragment(markup: &str) -> Option<Record> {
    let fragment = Html::parse_fragment(markup);
    fragment.select(&ITEM).next().and_then(parse_item)
}

/// Turn one entry subtree into a [`Record`].
///
/// `fragment` may be the `div.item` element itself or any ancestor of it. Returns
/// `None` only when no entry can be located under `fragment`.
pub fn parse_item(fragment: ElementRef<'_>) -> Option<Record> {
    let Some(item) = locate_item(fragment) else {
        debug!("⚠️ Fragment <{}> holds no entry, skipping", fragment.value().name());
        return None;
    };

    let rank = first_text(item, &RANK);
    let title = first_text(item, &TITLE);
    let rating = first_text(item, &RATING);

    let body = item.select(&BODY).next();
    let rating_people = body.and_then(extract_rating_people);
    let credits = body.map(extract_credits).unwrap_or_default();

    let quote = first_text(item, &QUOTE);

    Some(Record {
        rank: rank.unwrap_or_default(),
        title: title.unwrap_or_default(),
        director: credits.director.unwrap_or_default(),
        actors: credits.actors.unwrap_or_default(),
        year: credits.year.unwrap_or_default(),
        country: credits.country.unwrap_or_default(),
        genre: credits.genre.unwrap_or_default(),
        rating: rating.unwrap_or_default(),
        rating_people: rating_people.unwrap_or_default(),
        quote: quote.unwrap_or_default(),
    })
}

fn locate_item(fragment: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if ITEM.matches(&fragment) {
        return Some(fragment);
    }
    fragment.select(&ITEM).next()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(|el| el.text().collect::<String>().trim().to_string())
}

/// Search the first block inside the body for the span carrying the vote marker.
///
/// The marker span's position among its siblings is not stable, so every span is checked.
fn extract_rating_people(body: ElementRef<'_>) -> Option<String> {
    let block = body.select(&BLOCK).next()?;
    block.select(&INLINE).find_map(|span| {
        let text = span.text().collect::<String>();
        text.contains(VOTES_MARKER).then(|| text.replace(VOTES_MARKER, "").trim().to_string())
    })
}

fn extract_credits(body: ElementRef<'_>) -> Credits {
    let Some(paragraph) = body.select(&PARAGRAPH).next() else {
        return Credits::default();
    };

    let lines = paragraph_lines(paragraph);
    let mut credits = Credits::default();

    if let Some(line) = lines.first() {
        let (director, actors) = split_credit_line(line);
        credits.director = Some(director);
        credits.actors = actors;
    }

    if let Some(line) = lines.get(1) {
        let (year, country, genre) = split_metadata_line(line);
        credits.year = Some(year);
        credits.country = country;
        credits.genre = genre;
    }

    credits
}

/// Text nodes of `paragraph` as trimmed, non-empty lines; `<br>` boundaries break lines.
pub fn paragraph_lines(paragraph: ElementRef<'_>) -> Vec<String> {
    let joined = paragraph.text().collect::<Vec<_>>().join("\n");
    joined.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect()
}

fn clean_segment(segment: &str) -> String {
    segment.trim_matches(|c: char| c.is_whitespace() || c == '/').to_string()
}

/// Split the credits line into director and actors.
///
/// Without the director label the whole line is the director and there are no actors.
pub fn split_credit_line(line: &str) -> (String, Option<String>) {
    if !line.contains(DIRECTOR_LABEL) {
        return (line.trim().to_string(), None);
    }

    match line.split_once(STARRING_LABEL) {
        Some((director, actors)) => (clean_segment(&director.replace(DIRECTOR_LABEL, "")), Some(actors.trim().to_string())),
        None => (clean_segment(&line.replace(DIRECTOR_LABEL, "")), None),
    }
}

/// Split the `year / country / genre...` line.
///
/// Only the second slash token is kept as country; every token from the third
/// onward is genre, joined with single spaces.
pub fn split_metadata_line(line: &str) -> (String, Option<String>, Option<String>) {
    let tokens: Vec<&str> = line.split('/').map(str::trim).collect();

    let year = tokens.first().map(|t| t.to_string()).unwrap_or_default();
    let country = tokens.get(1).map(|t| t.to_string());
    let genre = (tokens.len() > 2).then(|| tokens[2..].iter().filter(|t| !t.is_empty()).copied().collect::<Vec<_>>().join(" "));

    (year, country, genre)
}
