use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collector::{Collector, ProgressFn};
use crate::config::AppConfig;
use crate::error::{FetchError, StoreError};
use crate::store::RecordStore;
use crate::types::{PageProgress, Record, ScrapeOutcome, ScrapeProgress};

/// State shared by the API handlers.
///
/// The record set is published as an immutable `Arc<Vec<Record>>`: a scrape or
/// reload builds the whole new set first and swaps it in, so a reader holding a
/// snapshot sees either the old set or the new one in full.
pub struct AppState {
    collector: Collector,
    store: RecordStore,
    records: RwLock<Arc<Vec<Record>>>,
    progress: RwLock<ScrapeProgress>,
    scrape_guard: Mutex<()>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(collector: Collector, store: RecordStore) -> Self {
        Self {
            collector,
            store,
            records: RwLock::new(Arc::new(Vec::new())),
            progress: RwLock::new(ScrapeProgress::default()),
            scrape_guard: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Collector::from_config(config)?, RecordStore::new(config.csv_path())))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Token that stops an in-flight scrape between pages
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current record set
    pub fn snapshot(&self) -> Arc<Vec<Record>> {
        self.records.read().clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Publish a fully built record set
    pub fn replace(&self, records: Vec<Record>) {
        let records = Arc::new(records);
        *self.records.write() = records;
    }

    pub fn progress(&self) -> ScrapeProgress {
        self.progress.read().clone()
    }

    /// Persisted file present and records loaded
    pub async fn has_data(&self) -> bool {
        self.store.exists().await && self.record_count() > 0
    }

    /// Replace the record set from the persisted file.
    ///
    /// A missing or unreadable file leaves the current set untouched.
    pub async fn reload(&self) -> bool {
        match self.store.load().await {
            Ok(records) => {
                info!("📂 Loaded {} records from {}", records.len(), self.store.path().display());
                self.replace(records);
                true
            }
            Err(StoreError::NotFound(path)) => {
                info!("📭 No record file at {} yet", path.display());
                false
            }
            Err(e) => {
                error!("❌ Failed to load records: {}", e);
                false
            }
        }
    }

    pub async fn persist(&self, records: &[Record]) -> bool {
        match self.store.save(records).await {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Failed to save records: {}", e);
                false
            }
        }
    }

    /// Scrape every page, persist the result and publish it.
    ///
    /// At most one scrape runs at a time; a concurrent call returns
    /// [`ScrapeOutcome::AlreadyRunning`] immediately.
    pub async fn run_scrape(&self) -> ScrapeOutcome {
        self.run_scrape_with(None).await
    }

    /// Like [`run_scrape`](Self::run_scrape), also forwarding each page update to `observer`
    pub async fn run_scrape_with(&self, observer: Option<&ProgressFn<'_>>) -> ScrapeOutcome {
        let Ok(_guard) = self.scrape_guard.try_lock() else {
            warn!("⚠️ Scrape requested while another is running");
            return ScrapeOutcome::AlreadyRunning;
        };

        *self.progress.write() = ScrapeProgress::start(self.collector.page_count());

        let on_page = |update: &PageProgress| {
            self.progress.write().apply(update);
            info!("📊 {}", update.message());
            if let Some(observer) = observer {
                observer(update);
            }
        };

        let records = self.collector.scrape(Some(&on_page), &self.shutdown).await;
        let count = records.len();

        let outcome = if records.is_empty() {
            ScrapeOutcome::Empty
        } else if self.persist(&records).await {
            self.replace(records);
            ScrapeOutcome::Completed { count }
        } else {
            ScrapeOutcome::PersistFailed { count }
        };

        self.progress.write().finish(&outcome);
        info!("🏁 {}", outcome.message());
        outcome
    }
}
