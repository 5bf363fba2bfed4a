use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Browser identities rotated across requests
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Source of raw listing pages, one per offset
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, offset: usize) -> Result<String, FetchError>;
}

/// Pick one identity from the pool, uniformly
pub fn random_user_agent() -> &'static str {
    USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
}

/// Uniformly random delay in `[min, max]`
pub fn jitter_delay(min: Duration, max: Duration) -> Duration {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let low_ms = u64::try_from(low.as_millis()).unwrap_or(u64::MAX);
    let high_ms = u64::try_from(high.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(fastrand::u64(low_ms..=high_ms))
}

/// Fetches listing pages over HTTP
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|source| FetchError::InvalidUrl { url: base_url.to_string(), source })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url, timeout })
    }

    /// Listing URL for `offset`, e.g. `.../top250?start=25`
    pub fn page_url(&self, offset: usize) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("start", &offset.to_string());
        url
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() { FetchError::Timeout(self.timeout) } else { FetchError::Request(err) }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, offset: usize) -> Result<String, FetchError> {
        let url = self.page_url(offset);
        let user_agent = random_user_agent();
        debug!("🌐 GET {} as {}", url, user_agent);

        let response = self.client.get(url).header(USER_AGENT, user_agent).send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status(status));
        }

        response.text().await.map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..50 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_jitter_delay_within_bounds() {
        let min = Duration::from_millis(1000);
        let max = Duration::from_millis(3000);
        for _ in 0..100 {
            let delay = jitter_delay(min, max);
            assert!(delay >= min && delay <= max, "{:?} out of range", delay);
        }
    }

    #[test]
    fn test_jitter_delay_degenerate_and_inverted_ranges() {
        assert_eq!(jitter_delay(Duration::ZERO, Duration::ZERO), Duration::ZERO);

        let delay = jitter_delay(Duration::from_millis(20), Duration::from_millis(10));
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(20));
    }

    #[test]
    fn test_page_url_appends_offset() {
        let fetcher = HttpFetcher::new("https://movie.douban.com/top250", Duration::from_secs(10)).unwrap();
        assert_eq!(fetcher.page_url(0).as_str(), "https://movie.douban.com/top250?start=0");
        assert_eq!(fetcher.page_url(225).as_str(), "https://movie.douban.com/top250?start=225");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpFetcher::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
