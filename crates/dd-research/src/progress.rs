use async_trait::async_trait;

/// Events emitted while a research session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchEvent {
    /// The first query was derived from the user request.
    InitialQuery { query: String, fallback: bool },
    /// A round is about to search with `query`.
    RoundStarted {
        round: usize,
        total: usize,
        query: String,
    },
    /// A selected URL could not be fetched. The round continues.
    FetchFailed { url: String, error: String },
    FindingsExtracted { round: usize, failed: bool },
    NextQuery {
        round: usize,
        query: String,
        fallback: bool,
    },
    /// The final synthesis call is starting.
    Synthesizing { findings: usize },
}

/// Handler for receiving research progress events.
///
/// The CLI implements this to print per-round progress lines.
#[async_trait]
pub trait ProgressHandler: Send + Sync {
    async fn on_progress(&self, event: ResearchEvent);
}
