//! Single-call access to the language model.
//!
//! Every call is recovered here: a provider error becomes
//! [`InferenceOutcome::Failed`] instead of propagating.

use std::sync::Arc;

use tracing::{debug, warn};

use dd_core::{CompletionRequest, Provider};

/// Result of one language-model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    Ok(String),
    Failed(String),
}

impl InferenceOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ok(text) => Some(text),
            Self::Failed(_) => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

pub struct Gateway {
    provider: Arc<dyn Provider>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl Gateway {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            model: None,
            temperature: None,
        }
    }

    /// Override the provider's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `prompt` as a single user message and return the reply text.
    pub async fn generate(&self, prompt: &str) -> InferenceOutcome {
        let mut request = CompletionRequest::prompt(prompt);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(
            provider = self.provider.name(),
            prompt_chars = prompt.len(),
            "Inference request"
        );

        match self.provider.complete(request).await {
            Ok(response) => InferenceOutcome::Ok(response.text().trim().to_string()),
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Inference failed");
                InferenceOutcome::Failed(e.to_string())
            }
        }
    }

    /// Like [`generate`](Self::generate), but cleans the reply into a bare
    /// search query. An empty reply counts as a failure.
    pub async fn generate_query(&self, prompt: &str) -> InferenceOutcome {
        match self.generate(prompt).await {
            InferenceOutcome::Ok(text) => {
                let query = clean_query(&text);
                if query.is_empty() {
                    InferenceOutcome::Failed("model returned an empty query".to_string())
                } else {
                    InferenceOutcome::Ok(query)
                }
            }
            failed => failed,
        }
    }
}

/// Strip wrapping quotes/backticks and surrounding whitespace. Multi-line
/// replies keep only the first non-empty line.
pub fn clean_query(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`') || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dd_core::testing::MockProvider;
    use dd_core::Error;

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("  \"battery recycling 2024\"  "), "battery recycling 2024");
        assert_eq!(clean_query("`lithium recovery`"), "lithium recovery");
        assert_eq!(clean_query("\n\nfirst line\nsecond line"), "first line");
        assert_eq!(clean_query("it's fine"), "it's fine");
        assert_eq!(clean_query("   "), "");
    }

    #[tokio::test]
    async fn test_generate_ok() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("  summary text \n");
        let gateway = Gateway::new(provider.clone()).with_model("gemini-2.0-flash-exp");

        let outcome = gateway.generate("hello").await;
        assert_eq!(outcome, InferenceOutcome::Ok("summary text".to_string()));
        let request = provider.last_request().unwrap();
        assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash-exp"));
        assert_eq!(request.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn test_generate_error_becomes_failed() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_error(Error::rate_limit("quota exceeded"));
        let gateway = Gateway::new(provider);

        let outcome = gateway.generate("hello").await;
        assert!(!outcome.is_ok());
        assert!(outcome.text().is_none());
        match outcome {
            InferenceOutcome::Failed(msg) => assert!(msg.contains("quota exceeded")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_query_empty_is_failure() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("\"\"");
        let gateway = Gateway::new(provider);

        assert!(!gateway.generate_query("q").await.is_ok());
    }
}
