use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub csv_filename: String,
    pub api_host: String,
    pub api_port: u16,
    pub page_size: usize,
    pub total_items: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://movie.douban.com/top250".to_string(),
            data_dir: PathBuf::from("data"),
            csv_filename: "douban_top250.csv".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 5000,
            page_size: 25,
            total_items: 250,
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            request_timeout_secs: 10,
        }
    }
}

/// Parse `var` from the environment, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var).ok().and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("TOP250_BASE_URL").unwrap_or(defaults.base_url);
        let data_dir = std::env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir);
        let csv_filename = std::env::var("CSV_FILENAME").unwrap_or(defaults.csv_filename);
        let api_host = std::env::var("API_HOST").unwrap_or(defaults.api_host);
        let api_port = env_or("API_PORT", defaults.api_port);

        // A zero page size would never advance the offset
        let page_size = env_or("PAGE_SIZE", defaults.page_size).max(1);
        let total_items = env_or("TOTAL_ITEMS", defaults.total_items);

        let min_delay_ms = env_or("MIN_DELAY_MS", defaults.min_delay_ms);
        let max_delay_ms = env_or("MAX_DELAY_MS", defaults.max_delay_ms);
        let (min_delay_ms, max_delay_ms) = if min_delay_ms > max_delay_ms { (max_delay_ms, min_delay_ms) } else { (min_delay_ms, max_delay_ms) };

        let request_timeout_secs = env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs);

        Self { base_url, data_dir, csv_filename, api_host, api_port, page_size, total_items, min_delay_ms, max_delay_ms, request_timeout_secs }
    }

    /// Listing offsets to fetch: `0, page_size, ...` below `total_items`
    pub fn page_offsets(&self) -> Vec<usize> {
        (0..self.total_items).step_by(self.page_size.max(1)).collect()
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.csv_filename)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
