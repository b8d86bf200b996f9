//! Paging client for the remote games listing
//!
//! The adapter keeps no state between invocations and performs no retries:
//! any transport failure or non-success status aborts the whole fetch and
//! is surfaced to the caller, which is expected to re-run the collector.

use crate::error::{CollectorError, Result};
use crate::source::models::{MatchPage, PickupMatch};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Source of new matches for one pickup site
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Load matches starting at `offset`, ordered by launch time.
    ///
    /// Fetches fixed-size pages until at least `min_count` matches have
    /// been produced or the listing's reported total shows the final page
    /// was reached, whichever comes first.
    async fn load_new_matches(&self, offset: i64, min_count: usize) -> Result<Vec<PickupMatch>>;
}

/// One page request against the listing endpoint; seam for paging tests
#[async_trait]
trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, limit: usize, offset: i64) -> Result<MatchPage>;
}

/// Accumulate pages until the requested minimum or the final page.
///
/// An empty page also terminates the loop; the listing should never
/// return one before its reported total, but a malformed response must
/// not spin forever.
async fn collect_pages(
    fetcher: &dyn PageFetcher,
    page_size: usize,
    start_offset: i64,
    min_count: usize,
) -> Result<Vec<PickupMatch>> {
    let mut matches: Vec<PickupMatch> = Vec::new();
    let mut offset = start_offset;

    loop {
        let page = fetcher.fetch_page(page_size, offset).await?;

        let reached_latest = match page.results.last() {
            Some(last) => last.number >= page.item_count,
            None => break,
        };

        matches.extend(page.results);

        info!(
            offset,
            page_size,
            total_matches = matches.len(),
            "loaded results page"
        );

        if matches.len() >= min_count || reached_latest {
            break;
        }

        offset += page_size as i64;
    }

    Ok(matches)
}

/// HTTP client for `GET https://api.<site>/games`
pub struct HttpMatchSource {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl HttpMatchSource {
    /// Create a client for the given pickup site (e.g. "tf2pickup.fi")
    pub fn new(site: &str, page_size: usize) -> Result<Self> {
        Self::with_base_url(format!("https://api.{site}"), page_size)
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: String, page_size: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CollectorError::SourceRequestFailed {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url,
            page_size,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpMatchSource {
    async fn fetch_page(&self, limit: usize, offset: i64) -> Result<MatchPage> {
        let url = format!(
            "{}/games?limit={limit}&offset={offset}&sort=launchedAt",
            self.base_url
        );

        let response =
            self.http
                .get(&url)
                .send()
                .await
                .map_err(|e| CollectorError::SourceRequestFailed {
                    message: format!("GET {url}: {e}"),
                })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::SourceUnexpectedStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let page = response
            .json()
            .await
            .map_err(|e| CollectorError::SourceRequestFailed {
                message: format!("decoding games page at offset {offset}: {e}"),
            })?;

        Ok(page)
    }
}

#[async_trait]
impl MatchSource for HttpMatchSource {
    async fn load_new_matches(&self, offset: i64, min_count: usize) -> Result<Vec<PickupMatch>> {
        collect_pages(self, self.page_size, offset, min_count).await
    }
}
