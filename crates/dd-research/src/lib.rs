//! Iterative web research for deepduck.
//!
//! A [`ResearchSession`] turns a user request into a search query, then for a
//! fixed number of rounds searches, fetches a few unseen pages, extracts
//! findings and asks the model for the next query. A final call synthesizes
//! every successful finding into one answer.
//!
//! External capabilities come in through `dd_core` traits:
//! - `Provider` (wrapped by [`Gateway`]) for language-model calls
//! - `WebSearch` for candidate URLs
//! - `PageFetcher` for page text

mod config;
mod gateway;
mod progress;
pub mod prompts;
mod raw_text;
mod session;

pub use config::{QueryDedup, RawTextMode, RawTextPolicy, ResearchConfig};
pub use gateway::{clean_query, Gateway, InferenceOutcome};
pub use progress::{ProgressHandler, ResearchEvent};
pub use raw_text::RawTextBuffer;
pub use session::{
    select_candidates, FinalAnswer, QueryOrigin, ResearchReport, ResearchSession, RoundFindings,
    RoundSummary, SearchQuery, SessionState,
};
