//! Configuration for a research session.

use serde::{Deserialize, Serialize};

use dd_core::DEFAULT_MAX_RESULTS;

fn default_max_search_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_urls_per_round() -> usize {
    3
}

fn default_raw_text_max_chars() -> usize {
    200_000
}

fn default_query_dedup_attempts() -> usize {
    1
}

/// How fetched page text is carried from round to round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTextPolicy {
    /// Keep pages across rounds, evicting the oldest once `max_chars` is exceeded.
    Window { max_chars: usize },
    /// Only the current round's pages feed extraction.
    CurrentRound,
}

/// Serialized form of [`RawTextPolicy`]; the window size lives in its own field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawTextMode {
    #[default]
    Window,
    CurrentRound,
}

/// What happens when the model proposes a query already in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDedup {
    /// Trust the prompt instructions; accept whatever comes back.
    Off,
    /// Re-prompt up to `attempts` times naming the rejected query.
    Regenerate { attempts: usize },
}

/// Tunables for the research loop.
///
/// Deserializes from the `[research]` table of the config file; every field
/// has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Candidate URLs requested from the search provider per round.
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    /// Maximum fresh URLs fetched per round. The default of 3 also bounds how
    /// fast the visited set grows; raising it lets each round add that many.
    #[serde(default = "default_urls_per_round")]
    pub urls_per_round: usize,

    #[serde(default)]
    pub raw_text_policy: RawTextMode,

    /// Character cap for the `window` raw text policy.
    #[serde(default = "default_raw_text_max_chars")]
    pub raw_text_max_chars: usize,

    /// Extra prompts spent on a duplicate query; 0 disables the check.
    #[serde(default = "default_query_dedup_attempts")]
    pub query_dedup_attempts: usize,

    /// Record URLs whose fetch failed as visited so they are never retried.
    #[serde(default)]
    pub mark_failed_visited: bool,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_search_results: default_max_search_results(),
            urls_per_round: default_urls_per_round(),
            raw_text_policy: RawTextMode::default(),
            raw_text_max_chars: default_raw_text_max_chars(),
            query_dedup_attempts: default_query_dedup_attempts(),
            mark_failed_visited: false,
        }
    }
}

impl ResearchConfig {
    pub fn raw_text(&self) -> RawTextPolicy {
        match self.raw_text_policy {
            RawTextMode::Window => RawTextPolicy::Window {
                max_chars: self.raw_text_max_chars,
            },
            RawTextMode::CurrentRound => RawTextPolicy::CurrentRound,
        }
    }

    pub fn query_dedup(&self) -> QueryDedup {
        match self.query_dedup_attempts {
            0 => QueryDedup::Off,
            attempts => QueryDedup::Regenerate { attempts },
        }
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    pub fn with_urls_per_round(mut self, urls: usize) -> Self {
        self.urls_per_round = urls;
        self
    }

    pub fn with_raw_text(mut self, policy: RawTextPolicy) -> Self {
        match policy {
            RawTextPolicy::Window { max_chars } => {
                self.raw_text_policy = RawTextMode::Window;
                self.raw_text_max_chars = max_chars;
            }
            RawTextPolicy::CurrentRound => self.raw_text_policy = RawTextMode::CurrentRound,
        }
        self
    }

    pub fn with_query_dedup(mut self, dedup: QueryDedup) -> Self {
        self.query_dedup_attempts = match dedup {
            QueryDedup::Off => 0,
            QueryDedup::Regenerate { attempts } => attempts,
        };
        self
    }

    pub fn with_mark_failed_visited(mut self, mark: bool) -> Self {
        self.mark_failed_visited = mark;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_search_results, 10);
        assert_eq!(config.urls_per_round, 3);
        assert_eq!(config.raw_text(), RawTextPolicy::Window { max_chars: 200_000 });
        assert_eq!(config.query_dedup(), QueryDedup::Regenerate { attempts: 1 });
        assert!(!config.mark_failed_visited);
    }

    #[test]
    fn test_parse_partial_table() {
        let config: ResearchConfig = toml::from_str(
            r#"
            urls_per_round = 2
            raw_text_policy = "current-round"
            query_dedup_attempts = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.urls_per_round, 2);
        assert_eq!(config.max_search_results, 10);
        assert_eq!(config.raw_text(), RawTextPolicy::CurrentRound);
        assert_eq!(config.query_dedup(), QueryDedup::Off);
    }

    #[test]
    fn test_builders_round_trip_policies() {
        let config = ResearchConfig::default()
            .with_raw_text(RawTextPolicy::Window { max_chars: 500 })
            .with_query_dedup(QueryDedup::Regenerate { attempts: 3 })
            .with_mark_failed_visited(true);
        assert_eq!(config.raw_text(), RawTextPolicy::Window { max_chars: 500 });
        assert_eq!(config.query_dedup(), QueryDedup::Regenerate { attempts: 3 });
        assert!(config.mark_failed_visited);
    }
}
