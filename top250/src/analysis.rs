//! Aggregate statistics over a loaded record set.
//!
//! All operations are read-only over a borrowed slice, so any number of
//! analyzers can run against the same snapshot concurrently.

use std::collections::HashMap;

use crate::types::{BasicStatistics, Record, StatisticsReport, Tally};

/// Number of entries returned by the top-N rankings when no size is given
pub const DEFAULT_TOP_N: usize = 10;

/// Rating bins, checked top-down; a rating counts in the first bin whose lower bound it reaches
pub const RATING_BINS: [(&str, f64); 6] =
    [("9.0-10.0", 9.0), ("8.5-8.9", 8.5), ("8.0-8.4", 8.0), ("7.5-7.9", 7.5), ("7.0-7.4", 7.0), ("7.0以下", f64::NEG_INFINITY)];

/// Year bins as (label, first year of the next bin); the last bin takes every later year
pub const YEAR_BINS: [(&str, Option<u64>); 9] = [
    ("1920-1949", Some(1950)),
    ("1950-1959", Some(1960)),
    ("1960-1969", Some(1970)),
    ("1970-1979", Some(1980)),
    ("1980-1989", Some(1990)),
    ("1990-1999", Some(2000)),
    ("2000-2009", Some(2010)),
    ("2010-2019", Some(2020)),
    ("2020-至今", None),
];

pub struct Analyzer<'a> {
    records: &'a [Record],
}

impl<'a> Analyzer<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count, rating average/min/max and average vote count.
    ///
    /// Unparseable ratings and vote counts are left out of their figures rather
    /// than counted as zero.
    pub fn statistics(&self) -> BasicStatistics {
        let ratings: Vec<f64> = self.records.iter().filter_map(Record::rating_value).collect();
        let votes: Vec<u64> = self.records.iter().filter_map(Record::vote_count).collect();

        let (avg_rating, max_rating, min_rating) = if ratings.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = ratings.iter().sum();
            let max = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = ratings.iter().copied().fold(f64::INFINITY, f64::min);
            (round_to(sum / ratings.len() as f64, 2), max, min)
        };

        let avg_rating_people = if votes.is_empty() {
            0
        } else {
            let sum: f64 = votes.iter().map(|&v| v as f64).sum();
            (sum / votes.len() as f64).round_ties_even() as u64
        };

        BasicStatistics { total_movies: self.records.len(), avg_rating, max_rating, min_rating, avg_rating_people }
    }

    pub fn rating_distribution(&self) -> Tally {
        let mut counts = [0usize; RATING_BINS.len()];
        for rating in self.records.iter().filter_map(Record::rating_value) {
            if let Some(bin) = RATING_BINS.iter().position(|(_, lower)| rating >= *lower) {
                counts[bin] += 1;
            }
        }
        Tally::new(RATING_BINS.iter().zip(counts).map(|((label, _), count)| (label.to_string(), count)).collect())
    }

    pub fn year_distribution(&self) -> Tally {
        let mut counts = [0usize; YEAR_BINS.len()];
        for year in self.records.iter().filter_map(Record::year_value) {
            let bin = YEAR_BINS.iter().position(|(_, next)| next.is_none_or(|next| year < next)).unwrap_or(YEAR_BINS.len() - 1);
            counts[bin] += 1;
        }
        Tally::new(YEAR_BINS.iter().zip(counts).map(|((label, _), count)| (label.to_string(), count)).collect())
    }

    /// Genre tokens are whitespace separated
    pub fn top_genres(&self, n: usize) -> Tally {
        top_tokens(self.records.iter().flat_map(|r| r.genre.split_whitespace()), n)
    }

    /// Country tokens are whitespace separated
    pub fn top_countries(&self, n: usize) -> Tally {
        top_tokens(self.records.iter().flat_map(|r| r.country.split_whitespace()), n)
    }

    /// Director tokens are slash separated, each trimmed
    pub fn top_directors(&self, n: usize) -> Tally {
        top_tokens(self.records.iter().flat_map(|r| r.director.split('/').map(str::trim).filter(|d| !d.is_empty())), n)
    }

    /// Records by rating, highest first; an unparseable rating sorts as 0.
    ///
    /// Equal ratings keep their original order.
    pub fn top_rated(&self, n: usize) -> Vec<Record> {
        let mut ranked: Vec<(f64, &Record)> = self.records.iter().map(|r| (r.rating_value().unwrap_or(0.0), r)).collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().take(n).map(|(_, r)| r.clone()).collect()
    }

    /// Case-insensitive substring match on title, director, actors or genre
    pub fn search(&self, keyword: &str) -> Vec<Record> {
        let needle = keyword.to_lowercase();
        self.records
            .iter()
            .filter(|r| [&r.title, &r.director, &r.actors, &r.genre].iter().any(|field| field.to_lowercase().contains(&needle)))
            .cloned()
            .collect()
    }

    pub fn report(&self, top_n: usize) -> StatisticsReport {
        StatisticsReport {
            basic: self.statistics(),
            rating_distribution: self.rating_distribution(),
            year_distribution: self.year_distribution(),
            top_genres: self.top_genres(top_n),
            top_countries: self.top_countries(top_n),
            top_directors: self.top_directors(top_n),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Count tokens in first-seen order, then rank by count; ties keep first-seen order.
fn top_tokens<'t>(tokens: impl Iterator<Item = &'t str>, n: usize) -> Tally {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for token in tokens {
        match index.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Tally::new(counts.into_iter().take(n).map(|(token, count)| (token.to_string(), count)).collect())
}
