use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::fetcher::{HttpFetcher, PageFetcher, jitter_delay};
use crate::parser::parse_page;
use crate::types::{PageProgress, Record};

/// Callback invoked after every successfully fetched page
pub type ProgressFn<'a> = dyn Fn(&PageProgress) + Send + Sync + 'a;

/// Drives the fetcher across every listing offset and accumulates records.
///
/// Pages are fetched one at a time with a jittered pause before each request.
pub struct Collector {
    fetcher: Arc<dyn PageFetcher>,
    offsets: Vec<usize>,
    min_delay: Duration,
    max_delay: Duration,
}

impl Collector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, offsets: Vec<usize>) -> Self {
        Self { fetcher, offsets, min_delay: Duration::from_secs(1), max_delay: Duration::from_secs(3) }
    }

    pub fn with_delay(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Build a collector backed by [`HttpFetcher`] from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config.base_url, config.request_timeout())?;
        Ok(Self::new(Arc::new(fetcher), config.page_offsets()).with_delay(config.min_delay(), config.max_delay()))
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }

    /// Fetch and extract every page.
    ///
    /// A page that fails contributes nothing and the run moves on to the next
    /// offset; a run where every page fails returns an empty vector. `cancel` is
    /// honoured between pages and during the pre-request pause, never mid-request.
    pub async fn scrape(&self, progress: Option<&ProgressFn<'_>>, cancel: &CancellationToken) -> Vec<Record> {
        let start = Instant::now();
        let pages_total = self.offsets.len();
        let mut records = Vec::new();
        let mut failed_pages = 0usize;

        info!("🚀 Starting scrape of {} pages", pages_total);

        for (index, &offset) in self.offsets.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("🛑 Scrape cancelled before offset {}", offset);
                break;
            }

            let delay = jitter_delay(self.min_delay, self.max_delay);
            debug!("⏳ Waiting {:?} before offset {}", delay, offset);
            tokio::select! {
                _ = sleep(delay) => {},
                _ = cancel.cancelled() => {
                    warn!("🛑 Scrape cancelled before offset {}", offset);
                    break;
                }
            }

            match self.fetcher.fetch_page(offset).await {
                Ok(html) => {
                    let page_records = parse_page(&html);
                    debug!("📋 Offset {} yielded {} records", offset, page_records.len());
                    records.extend(page_records);

                    let update = PageProgress { offset, pages_done: index + 1, pages_total, records_collected: records.len() };
                    if let Some(callback) = progress {
                        callback(&update);
                    }
                }
                Err(e) => {
                    failed_pages += 1;
                    error!("❌ Failed to fetch page at offset {}: {}", offset, e);
                }
            }
        }

        if failed_pages > 0 {
            warn!("⚠️ {} of {} pages failed", failed_pages, pages_total);
        }
        info!("✅ Scrape finished with {} records in {:?}", records.len(), start.elapsed());

        records
    }
}
