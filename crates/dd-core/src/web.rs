//! External web capabilities consumed by the research loop.
//!
//! Both traits report failures as `Err`; callers decide how to degrade.

use async_trait::async_trait;

use crate::error::Error;

/// Default number of candidate URLs requested from a search provider.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// A search provider that turns a query into candidate URLs.
///
/// No ordering guarantee beyond best-effort relevance.
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, Error>;
}

/// Fetches a URL and returns a textual (markdown or plain text) rendering.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, Error>;
}
