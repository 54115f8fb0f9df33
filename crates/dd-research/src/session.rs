//! The research round loop and the state it accumulates.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use dd_core::{PageFetcher, WebSearch};

use crate::config::{QueryDedup, ResearchConfig};
use crate::gateway::{Gateway, InferenceOutcome};
use crate::progress::{ProgressHandler, ResearchEvent};
use crate::prompts;
use crate::raw_text::RawTextBuffer;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    /// 1-based round index.
    Round(usize),
    Synthesize,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    /// Derived from the user request before the first round.
    Initial,
    /// Proposed by the model after a round.
    Refined,
    /// The model call failed; the user request text is used verbatim.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub origin: QueryOrigin,
}

impl SearchQuery {
    fn new(text: impl Into<String>, origin: QueryOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == QueryOrigin::Fallback
    }
}

/// What one round's extraction call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundFindings {
    Extracted(String),
    Failed(String),
}

impl RoundFindings {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Extracted(text) => Some(text),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalAnswer {
    Synthesized(String),
    Failed(String),
}

/// Bookkeeping for a single round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: usize,
    pub query: String,
    /// URLs chosen for fetching, in fetch order.
    pub selected: Vec<String>,
    pub fetched: usize,
    pub failed: usize,
}

/// Everything a finished session learned.
#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub user_request: String,
    pub search_history: Vec<SearchQuery>,
    /// Visited URLs in the order they were recorded.
    pub visited_urls: Vec<String>,
    pub findings: Vec<RoundFindings>,
    pub rounds: Vec<RoundSummary>,
    pub final_answer: FinalAnswer,
}

/// Pick up to `limit` candidates that are not yet visited.
///
/// Candidate order is preserved and repeats within `candidates` are dropped.
/// Comparison is exact string equality.
pub fn select_candidates(
    candidates: &[String],
    visited: &HashSet<String>,
    limit: usize,
) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for url in candidates {
        if selected.len() >= limit {
            break;
        }
        if visited.contains(url) || selected.contains(url) {
            continue;
        }
        selected.push(url.clone());
    }
    selected
}

/// Comparison key for duplicate query detection.
fn normalize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drives a fixed number of search/fetch/extract rounds followed by one
/// synthesis call. No method returns an error: every external failure is
/// recovered where it happens.
pub struct ResearchSession {
    gateway: Gateway,
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    config: ResearchConfig,
    progress: Option<Arc<dyn ProgressHandler>>,

    user_request: String,
    state: SessionState,
    search_history: Vec<SearchQuery>,
    visited: HashSet<String>,
    visited_order: Vec<String>,
    findings: Vec<RoundFindings>,
    rounds: Vec<RoundSummary>,
    raw_text: RawTextBuffer,
}

impl ResearchSession {
    pub fn new(
        user_request: impl Into<String>,
        gateway: Gateway,
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let config = ResearchConfig::default();
        Self {
            gateway,
            search,
            fetcher,
            raw_text: RawTextBuffer::new(config.raw_text()),
            config,
            progress: None,
            user_request: user_request.into(),
            state: SessionState::Init,
            search_history: Vec::new(),
            visited: HashSet::new(),
            visited_order: Vec::new(),
            findings: Vec::new(),
            rounds: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.raw_text = RawTextBuffer::new(config.raw_text());
        self.config = config;
        self
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_request(&self) -> &str {
        &self.user_request
    }

    pub fn search_history(&self) -> &[SearchQuery] {
        &self.search_history
    }

    pub fn visited_urls(&self) -> &[String] {
        &self.visited_order
    }

    pub fn findings(&self) -> &[RoundFindings] {
        &self.findings
    }

    /// Run the whole session: initial query, `iterations` rounds, synthesis.
    ///
    /// `iterations == 0` skips straight to synthesis over no findings.
    pub async fn run(&mut self, iterations: usize) -> ResearchReport {
        info!(iterations, "Starting research session");

        let initial = self.initial_query().await;
        self.emit(ResearchEvent::InitialQuery {
            query: initial.text.clone(),
            fallback: initial.is_fallback(),
        })
        .await;
        self.search_history.push(initial);

        for round in 1..=iterations {
            self.state = SessionState::Round(round);
            self.run_round(round, iterations).await;
        }

        self.state = SessionState::Synthesize;
        let final_answer = self.synthesize().await;
        self.state = SessionState::Done;

        info!(
            rounds = self.rounds.len(),
            visited = self.visited_order.len(),
            "Research session complete"
        );

        ResearchReport {
            user_request: self.user_request.clone(),
            search_history: self.search_history.clone(),
            visited_urls: self.visited_order.clone(),
            findings: self.findings.clone(),
            rounds: self.rounds.clone(),
            final_answer,
        }
    }

    async fn initial_query(&self) -> SearchQuery {
        let prompt = prompts::initial_query_prompt(&self.user_request);
        match self.gateway.generate_query(&prompt).await {
            InferenceOutcome::Ok(query) => SearchQuery::new(query, QueryOrigin::Initial),
            InferenceOutcome::Failed(e) => {
                warn!(error = %e, "Initial query failed, searching with the request text");
                SearchQuery::new(self.user_request.clone(), QueryOrigin::Fallback)
            }
        }
    }

    async fn run_round(&mut self, round: usize, total: usize) {
        let query = self
            .search_history
            .last()
            .map(|q| q.text.clone())
            .unwrap_or_else(|| self.user_request.clone());

        info!(round, query = %query, "Research round");
        self.emit(ResearchEvent::RoundStarted {
            round,
            total,
            query: query.clone(),
        })
        .await;

        self.raw_text.begin_round();

        let candidates = match self
            .search
            .search(&query, self.config.max_search_results)
            .await
        {
            Ok(urls) => urls,
            Err(e) => {
                warn!(search = self.search.name(), error = %e, "Search failed");
                Vec::new()
            }
        };

        let selected = select_candidates(&candidates, &self.visited, self.config.urls_per_round);
        debug!(
            round,
            candidates = candidates.len(),
            selected = selected.len(),
            "Selected URLs"
        );

        let mut fetched = 0;
        let mut failed = 0;
        for url in &selected {
            match self.fetcher.fetch(url).await {
                Ok(content) => {
                    fetched += 1;
                    self.mark_visited(url);
                    self.raw_text.push(url, &content);
                }
                Err(e) => {
                    failed += 1;
                    warn!(url = %url, error = %e, "Fetch failed");
                    if self.config.mark_failed_visited {
                        self.mark_visited(url);
                    }
                    self.emit(ResearchEvent::FetchFailed {
                        url: url.clone(),
                        error: e.to_string(),
                    })
                    .await;
                }
            }
        }

        let prompt = prompts::extraction_prompt(&self.raw_text.contents(), &self.user_request);
        let round_findings = match self.gateway.generate(&prompt).await {
            InferenceOutcome::Ok(text) => RoundFindings::Extracted(text),
            InferenceOutcome::Failed(e) => RoundFindings::Failed(e),
        };
        self.emit(ResearchEvent::FindingsExtracted {
            round,
            failed: round_findings.text().is_none(),
        })
        .await;
        self.findings.push(round_findings);

        let next = self.next_query().await;
        self.emit(ResearchEvent::NextQuery {
            round,
            query: next.text.clone(),
            fallback: next.is_fallback(),
        })
        .await;
        self.search_history.push(next);

        self.rounds.push(RoundSummary {
            round,
            query,
            selected,
            fetched,
            failed,
        });
    }

    async fn next_query(&self) -> SearchQuery {
        let findings = self.successful_findings();
        let history: Vec<&str> = self.search_history.iter().map(|q| q.text.as_str()).collect();
        let prompt = prompts::next_query_prompt(&findings, &self.user_request, &history);

        let mut outcome = self.gateway.generate_query(&prompt).await;

        if let QueryDedup::Regenerate { attempts } = self.config.query_dedup() {
            for attempt in 1..=attempts {
                let rejected = match &outcome {
                    InferenceOutcome::Ok(query) if self.is_duplicate(query) => query.clone(),
                    _ => break,
                };
                debug!(attempt, query = %rejected, "Duplicate query, regenerating");
                let retry = prompts::regenerate_query_prompt(&prompt, &rejected);
                outcome = self.gateway.generate_query(&retry).await;
            }
        }

        match outcome {
            InferenceOutcome::Ok(query) => {
                if self.is_duplicate(&query) {
                    warn!(query = %query, "Next query repeats an earlier search");
                }
                SearchQuery::new(query, QueryOrigin::Refined)
            }
            InferenceOutcome::Failed(e) => {
                warn!(error = %e, "Next query failed, searching with the request text");
                SearchQuery::new(self.user_request.clone(), QueryOrigin::Fallback)
            }
        }
    }

    async fn synthesize(&self) -> FinalAnswer {
        let findings = self.successful_findings();
        self.emit(ResearchEvent::Synthesizing {
            findings: findings.len(),
        })
        .await;

        let prompt = prompts::synthesis_prompt(&findings, &self.user_request);
        match self.gateway.generate(&prompt).await {
            InferenceOutcome::Ok(text) => FinalAnswer::Synthesized(text),
            InferenceOutcome::Failed(e) => FinalAnswer::Failed(e),
        }
    }

    fn successful_findings(&self) -> Vec<&str> {
        self.findings.iter().filter_map(RoundFindings::text).collect()
    }

    fn is_duplicate(&self, query: &str) -> bool {
        let key = normalize_query(query);
        self.search_history
            .iter()
            .any(|q| normalize_query(&q.text) == key)
    }

    fn mark_visited(&mut self, url: &str) {
        if self.visited.insert(url.to_string()) {
            self.visited_order.push(url.to_string());
        }
    }

    async fn emit(&self, event: ResearchEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(event).await;
        }
    }
}
