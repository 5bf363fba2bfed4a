use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Column order of the persisted file and of every serialized record
pub const FIELD_NAMES: [&str; 10] = ["rank", "title", "director", "actors", "year", "country", "genre", "rating", "rating_people", "quote"];

/// One ranked movie entry.
///
/// Every field is plain text exactly as scraped; a field the extractor could not
/// find is an empty string, never absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub rank: String,
    pub title: String,
    pub director: String,
    pub actors: String,
    pub year: String,
    pub country: String,
    pub genre: String,
    pub rating: String,
    pub rating_people: String,
    pub quote: String,
}

impl Record {
    /// Field values in `FIELD_NAMES` order
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.rank,
            &self.title,
            &self.director,
            &self.actors,
            &self.year,
            &self.country,
            &self.genre,
            &self.rating,
            &self.rating_people,
            &self.quote,
        ]
    }

    /// Rating as a decimal, `None` when the text does not parse
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.trim().parse::<f64>().ok().filter(|r| r.is_finite())
    }

    /// Vote count with thousands separators stripped
    pub fn vote_count(&self) -> Option<u64> {
        self.rating_people.replace(',', "").trim().parse::<u64>().ok()
    }

    /// Release year, only when the field is a non-empty run of digits.
    ///
    /// A digit run too long for `u64` saturates to `u64::MAX`.
    pub fn year_value(&self) -> Option<u64> {
        if self.year.is_empty() || !self.year.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(self.year.parse::<u64>().unwrap_or(u64::MAX))
    }
}

/// Ordered label -> count pairs.
///
/// Serializes as a JSON object whose key order is the insertion order, so
/// distributions keep their bin order and rankings keep their rank order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally(Vec<(String, usize)>);

impl Tally {
    pub fn new(entries: Vec<(String, usize)>) -> Self {
        Self(entries)
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, count)| *count)
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.0
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Basic aggregate figures over a record set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub total_movies: usize,
    pub avg_rating: f64,
    pub max_rating: f64,
    pub min_rating: f64,
    pub avg_rating_people: u64,
}

/// Everything the statistics endpoint reports in one bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub basic: BasicStatistics,
    pub rating_distribution: Tally,
    pub year_distribution: Tally,
    pub top_genres: Tally,
    pub top_countries: Tally,
    pub top_directors: Tally,
}

/// Progress reported by the collector after each successfully fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub offset: usize,
    pub pages_done: usize,
    pub pages_total: usize,
    pub records_collected: usize,
}

impl PageProgress {
    pub fn message(&self) -> String {
        format!("已爬取 {} 部电影...", self.records_collected)
    }
}

/// Live state of the scrape run, exposed over the API
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeProgress {
    pub running: bool,
    pub pages_done: usize,
    pub pages_total: usize,
    pub records_collected: usize,
    pub last_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScrapeProgress {
    pub fn start(pages_total: usize) -> Self {
        Self { running: true, pages_total, started_at: Some(Utc::now()), ..Default::default() }
    }

    pub fn apply(&mut self, update: &PageProgress) {
        self.pages_done = update.pages_done;
        self.pages_total = update.pages_total;
        self.records_collected = update.records_collected;
        self.last_message = Some(update.message());
    }

    pub fn finish(&mut self, outcome: &ScrapeOutcome) {
        self.running = false;
        self.finished_at = Some(Utc::now());
        self.last_message = Some(outcome.message());
    }
}

/// Result of one trigger-scrape request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Records were scraped, persisted and published
    Completed { count: usize },
    /// Every page failed or yielded nothing
    Empty,
    /// Records were scraped but could not be written; the previous set stays live
    PersistFailed { count: usize },
    /// Another scrape holds the guard
    AlreadyRunning,
}

impl ScrapeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Completed { .. })
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            ScrapeOutcome::Completed { count } | ScrapeOutcome::PersistFailed { count } => Some(*count),
            ScrapeOutcome::Empty | ScrapeOutcome::AlreadyRunning => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ScrapeOutcome::Completed { count } => format!("成功爬取 {} 部电影数据", count),
            ScrapeOutcome::Empty => "爬取失败，请稍后重试".to_string(),
            ScrapeOutcome::PersistFailed { count } => format!("已爬取 {} 部电影，但保存数据失败", count),
            ScrapeOutcome::AlreadyRunning => "爬虫正在运行中".to_string(),
        }
    }
}
