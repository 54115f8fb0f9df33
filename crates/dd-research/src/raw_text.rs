//! Bounded buffer of fetched page text fed to the extraction prompt.

use std::collections::VecDeque;

use crate::config::RawTextPolicy;

const SEPARATOR: &str = "\n\n";

#[derive(Debug)]
pub struct RawTextBuffer {
    policy: RawTextPolicy,
    pages: VecDeque<String>,
    /// Length of `contents()`, separators included.
    chars: usize,
}

impl RawTextBuffer {
    pub fn new(policy: RawTextPolicy) -> Self {
        Self {
            policy,
            pages: VecDeque::new(),
            chars: 0,
        }
    }

    /// Called at the start of every round.
    pub fn begin_round(&mut self) {
        if self.policy == RawTextPolicy::CurrentRound {
            self.pages.clear();
            self.chars = 0;
        }
    }

    /// Add a page, tagged with its source URL. Blank content is skipped.
    ///
    /// Under a window policy the oldest pages are evicted until the buffer
    /// fits; the newest page is always kept, even when it alone exceeds the cap.
    pub fn push(&mut self, url: &str, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        let entry = format!("Source: {}\n{}", url, content);
        if !self.pages.is_empty() {
            self.chars += SEPARATOR.len();
        }
        self.chars += entry.chars().count();
        self.pages.push_back(entry);

        if let RawTextPolicy::Window { max_chars } = self.policy {
            while self.chars > max_chars && self.pages.len() > 1 {
                if let Some(evicted) = self.pages.pop_front() {
                    self.chars -= evicted.chars().count() + SEPARATOR.len();
                }
            }
        }
    }

    pub fn contents(&self) -> String {
        self.pages.iter().map(String::as_str).collect::<Vec<_>>().join(SEPARATOR)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pages_skipped() {
        let mut buffer = RawTextBuffer::new(RawTextPolicy::CurrentRound);
        buffer.push("https://a.example", "   \n");
        assert!(buffer.is_empty());
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_pages_tagged_with_source() {
        let mut buffer = RawTextBuffer::new(RawTextPolicy::CurrentRound);
        buffer.push("https://a.example", "alpha");
        buffer.push("https://b.example", "beta");
        assert_eq!(
            buffer.contents(),
            "Source: https://a.example\nalpha\n\nSource: https://b.example\nbeta"
        );
    }

    #[test]
    fn test_current_round_clears() {
        let mut buffer = RawTextBuffer::new(RawTextPolicy::CurrentRound);
        buffer.push("https://a.example", "alpha");
        buffer.begin_round();
        assert!(buffer.is_empty());
        assert_eq!(buffer.char_count(), 0);
    }

    #[test]
    fn test_window_keeps_across_rounds_and_evicts_oldest() {
        // Each entry is "Source: u\n" (10 chars) plus 10 content chars
        let mut buffer = RawTextBuffer::new(RawTextPolicy::Window { max_chars: 45 });
        buffer.push("1", "aaaaaaaaaa");
        buffer.begin_round();
        buffer.push("2", "bbbbbbbbbb");
        assert_eq!(buffer.len(), 2);

        buffer.push("3", "cccccccccc");
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.contents().contains("aaaa"));
        assert!(buffer.contents().contains("cccc"));
        assert!(buffer.contents().chars().count() <= 45);
        assert_eq!(buffer.char_count(), buffer.contents().chars().count());
    }

    #[test]
    fn test_window_cap_counts_separators() {
        // Two 12-char entries joined by "\n\n" make 26 chars
        let mut buffer = RawTextBuffer::new(RawTextPolicy::Window { max_chars: 25 });
        buffer.push("1", "aa");
        assert_eq!(buffer.char_count(), 12);

        buffer.push("2", "bb");
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.contents(), "Source: 2\nbb");

        let mut buffer = RawTextBuffer::new(RawTextPolicy::Window { max_chars: 26 });
        buffer.push("1", "aa");
        buffer.push("2", "bb");
        buffer.push("3", "cc");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.contents().chars().count(), 26);
        assert_eq!(buffer.char_count(), 26);
    }

    #[test]
    fn test_current_round_char_count_matches_contents() {
        let mut buffer = RawTextBuffer::new(RawTextPolicy::CurrentRound);
        buffer.push("https://a.example", "alpha");
        buffer.push("https://b.example", "beta");
        buffer.push("https://c.example", "gamma");
        assert_eq!(buffer.char_count(), buffer.contents().chars().count());
    }

    #[test]
    fn test_window_keeps_oversized_newest_page() {
        let mut buffer = RawTextBuffer::new(RawTextPolicy::Window { max_chars: 5 });
        buffer.push("1", "small");
        buffer.push("2", "much larger than the cap");
        assert_eq!(buffer.len(), 1);
        assert!(buffer.contents().contains("much larger"));
    }
}
