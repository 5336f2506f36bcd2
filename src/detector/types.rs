//! Candidate detector core types

use std::collections::HashMap;

use serde::Serialize;

// ============================================================
// Constants
// ============================================================

/// Pages scanned from the start of the document
pub const DEFAULT_MAX_PAGES: usize = 5;

/// Blocks with this many characters or fewer are ignored
pub const DEFAULT_MIN_BLOCK_CHARS: usize = 3;

/// Lowest repetition count that can ever qualify
pub const DEFAULT_MIN_THRESHOLD: usize = 2;

// ============================================================
// Candidate Counting
// ============================================================

/// One distinct block text and how often it was seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateCount {
    pub text: String,
    pub count: usize,
}

/// Occurrence counts keyed by exact text, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: Vec<CandidateCount>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `text`
    pub fn record(&mut self, text: &str) {
        match self.index.get(text) {
            Some(&slot) => self.entries[slot].count += 1,
            None => {
                self.index.insert(text.to_string(), self.entries.len());
                self.entries.push(CandidateCount {
                    text: text.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.index
            .get(text)
            .map(|&slot| self.entries[slot].count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Texts seen at least `threshold` times, first-seen order
    pub fn at_least(&self, threshold: usize) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.count >= threshold)
            .map(|entry| entry.text.clone())
            .collect()
    }
}

impl Serialize for CandidateSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Full outcome of one detection run
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    /// Pages in the document
    pub page_count: usize,
    /// Pages actually scanned
    pub pages_scanned: usize,
    /// Minimum count for a candidate
    pub threshold: usize,
    /// Every counted block text
    pub counts: CandidateSet,
    /// Qualifying texts
    pub candidates: Vec<String>,
}

// ============================================================
// Options
// ============================================================

/// Candidate detection options
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Maximum number of leading pages to scan
    pub max_pages: usize,
    /// Blocks must have more trimmed characters than this
    pub min_block_chars: usize,
    /// Floor for the repetition threshold
    pub min_threshold: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_block_chars: DEFAULT_MIN_BLOCK_CHARS,
            min_threshold: DEFAULT_MIN_THRESHOLD,
        }
    }
}

impl DetectorOptions {
    /// Create a new options builder
    pub fn builder() -> DetectorOptionsBuilder {
        DetectorOptionsBuilder::default()
    }

    /// Repetition threshold for a scan of `pages_scanned` pages
    pub fn threshold_for(&self, pages_scanned: usize) -> usize {
        self.min_threshold.max(pages_scanned.saturating_sub(1))
    }
}

/// Builder for DetectorOptions
#[derive(Debug, Default)]
pub struct DetectorOptionsBuilder {
    options: DetectorOptions,
}

impl DetectorOptionsBuilder {
    /// Set the page scan limit (at least 1)
    #[must_use]
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.options.max_pages = pages.max(1);
        self
    }

    /// Set the minimum block length
    #[must_use]
    pub fn min_block_chars(mut self, chars: usize) -> Self {
        self.options.min_block_chars = chars;
        self
    }

    /// Set the threshold floor (at least 1)
    #[must_use]
    pub fn min_threshold(mut self, threshold: usize) -> Self {
        self.options.min_threshold = threshold.max(1);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> DetectorOptions {
        self.options
    }
}
