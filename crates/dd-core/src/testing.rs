//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Error;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::web::{PageFetcher, WebSearch};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Returned once the queue is drained (instead of an error).
    fallback: Mutex<Option<String>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
}

fn text_response(content: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(content),
        usage: Usage::new(0, 0),
        model: "mock-model".to_string(),
        finish_reason: FinishReason::Stop,
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: Mutex::new(None),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
        }
    }

    /// Queue a response to be returned by the next complete() call.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(0, Ok(text_response(content)));
    }

    /// Queue an error for the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().insert(0, Err(error));
    }

    /// Answer every unqueued call with `content`.
    pub fn set_fallback_response(&self, content: &str) {
        *self.fallback.lock().unwrap() = Some(content.to_string());
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }

    /// User-message text of every captured request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.captured_requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                r.messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        if let Some(response) = self.responses.lock().unwrap().pop() {
            return response;
        }
        match self.fallback.lock().unwrap().as_deref() {
            Some(content) => Ok(text_response(content)),
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// A mock search provider returning scripted URL lists.
pub struct MockSearch {
    results: Mutex<Vec<Result<Vec<String>, Error>>>,
    /// Captured (query, max_results) pairs.
    pub queries: Mutex<Vec<(String, usize)>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queue the URL list for the next search() call (FIFO).
    pub fn queue_urls(&self, urls: &[&str]) {
        let urls = urls.iter().map(|u| u.to_string()).collect();
        self.results.lock().unwrap().insert(0, Ok(urls));
    }

    /// Queue an error for the next search() call (FIFO).
    pub fn queue_error(&self, error: Error) {
        self.results.lock().unwrap().insert(0, Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    /// Unqueued calls return an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, Error> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        self.results.lock().unwrap().pop().unwrap_or(Ok(Vec::new()))
    }
}

/// A mock fetcher serving pages from an in-memory map.
/// URLs without a registered page fail with `Error::Fetch`.
pub struct MockFetcher {
    pages: Mutex<HashMap<String, String>>,
    /// URLs fetched, in call order.
    pub fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn add_page(&self, url: &str, content: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), content.to_string());
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "no mock page registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_fifo_then_fallback() {
        let provider = MockProvider::new();
        provider.queue_response("first");
        provider.queue_response("second");
        provider.set_fallback_response("rest");

        let a = provider.complete(CompletionRequest::prompt("a")).await.unwrap();
        let b = provider.complete(CompletionRequest::prompt("b")).await.unwrap();
        let c = provider.complete(CompletionRequest::prompt("c")).await.unwrap();
        assert_eq!(a.text(), "first");
        assert_eq!(b.text(), "second");
        assert_eq!(c.text(), "rest");
        assert_eq!(provider.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_provider_errors_when_empty() {
        let provider = MockProvider::new();
        assert!(provider.complete(CompletionRequest::prompt("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_url_fails() {
        let fetcher = MockFetcher::new();
        fetcher.add_page("https://a.example", "page a");
        assert_eq!(fetcher.fetch("https://a.example").await.unwrap(), "page a");
        assert!(fetcher.fetch("https://b.example").await.is_err());
        assert_eq!(fetcher.fetched_urls().len(), 2);
    }
}
