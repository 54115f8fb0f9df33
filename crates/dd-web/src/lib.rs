//! dd-web: Web capabilities for deepduck
//!
//! This crate provides the concrete implementations of the `WebSearch` and
//! `PageFetcher` traits used by the research loop:
//! - Search: DuckDuckGo HTML results, decoded to plain URLs
//! - Fetch: HTTP GET with HTML-to-markdown conversion

use std::time::Duration;

use reqwest::Client;

pub mod fetch;
pub mod markdown;
pub mod search;

pub use fetch::HttpPageFetcher;
pub use markdown::html_to_markdown;
pub use search::DuckDuckGoSearch;

pub const DEFAULT_USER_AGENT: &str = concat!("deepduck/", env!("CARGO_PKG_VERSION"));

/// HTTP settings shared by the search and fetch clients.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub(crate) fn build_client(&self) -> Client {
        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .unwrap_or_default()
    }
}
