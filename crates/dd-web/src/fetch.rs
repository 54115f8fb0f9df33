//! Page fetching with HTML-to-markdown conversion.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use dd_core::{run_blocking, Error, PageFetcher};

use crate::markdown::html_to_markdown;
use crate::HttpConfig;

/// Default cap on the characters kept from a single page.
pub const DEFAULT_MAX_PAGE_CHARS: usize = 50_000;

pub struct HttpPageFetcher {
    client: Client,
    max_page_chars: usize,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl HttpPageFetcher {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: config.build_client(),
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }

    pub fn with_max_page_chars(mut self, max_page_chars: usize) -> Self {
        self.max_page_chars = max_page_chars;
        self
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PageKind {
    Html,
    Text,
    Unsupported,
}

fn classify(content_type: Option<&str>) -> PageKind {
    let Some(content_type) = content_type else {
        // Servers that omit the header almost always serve HTML
        return PageKind::Html;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime.contains("html") || mime.contains("xml") {
        PageKind::Html
    } else if mime.starts_with("text/") || mime.ends_with("json") {
        PageKind::Text
    } else {
        PageKind::Unsupported
    }
}

/// Cut `text` to at most `max_chars` characters, noting the original size.
fn truncate_page(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    format!(
        "{}\n\n... (truncated, {} total characters)",
        &text[..cut],
        total
    )
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.5")
            .send()
            .await
            .map_err(|e| Error::fetch(url, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP error {}", status)));
        }

        let kind = classify(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        if kind == PageKind::Unsupported {
            return Err(Error::fetch(url, "unsupported content type"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read response: {}", e)))?;

        let text = match kind {
            PageKind::Html => run_blocking(move || html_to_markdown(&body)).await?,
            _ => body.trim().to_string(),
        };

        debug!(url = %url, chars = text.len(), "Fetched page");

        Ok(truncate_page(text, self.max_page_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_content_types() {
        assert_eq!(classify(Some("text/html; charset=utf-8")), PageKind::Html);
        assert_eq!(classify(Some("application/xhtml+xml")), PageKind::Html);
        assert_eq!(classify(Some("text/plain")), PageKind::Text);
        assert_eq!(classify(Some("text/markdown")), PageKind::Text);
        assert_eq!(classify(Some("application/json")), PageKind::Text);
        assert_eq!(classify(Some("application/pdf")), PageKind::Unsupported);
        assert_eq!(classify(Some("image/png")), PageKind::Unsupported);
        assert_eq!(classify(None), PageKind::Html);
    }

    #[test]
    fn test_truncate_page_short_untouched() {
        assert_eq!(truncate_page("short".to_string(), 10), "short");
    }

    #[test]
    fn test_truncate_page_respects_char_boundaries() {
        let text = "é".repeat(20);
        let truncated = truncate_page(text, 5);
        assert!(truncated.starts_with("ééééé\n\n"));
        assert!(truncated.contains("20 total characters"));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_error() {
        let fetcher = HttpPageFetcher::new(HttpConfig::new(
            "deepduck-test",
            std::time::Duration::from_secs(2),
        ));
        let result = fetcher.fetch("http://127.0.0.1:9/unreachable").await;
        assert!(matches!(result, Err(Error::Fetch { .. })));
    }
}
