//! Page cleaner core types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Color, DocumentError};

// ============================================================
// Constants
// ============================================================

/// Default header band height (PDF units)
pub const DEFAULT_HEADER_HEIGHT: f32 = 0.0;

/// Default footer band height (PDF units)
pub const DEFAULT_FOOTER_HEIGHT: f32 = 25.0;

// ============================================================
// Error Types
// ============================================================

/// Page cleaning error types
#[derive(Debug, Error)]
pub enum CleanError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Background sample returned no pixel")]
    EmptySample,
}

pub type Result<T> = std::result::Result<T, CleanError>;

// ============================================================
// Parameters
// ============================================================

/// Cleaning parameters, shared read-only by every page of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanParams {
    /// Literal strings to redact, in order
    pub keywords: Vec<String>,
    /// Height of the top band to mask (0 disables)
    pub header_height: f32,
    /// Height of the bottom band to mask (0 disables)
    pub footer_height: f32,
    /// Only accept matches whose text has the keyword's exact case
    pub match_case: bool,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            header_height: DEFAULT_HEADER_HEIGHT,
            footer_height: DEFAULT_FOOTER_HEIGHT,
            match_case: false,
        }
    }
}

impl CleanParams {
    /// Create a new params builder
    pub fn builder() -> CleanParamsBuilder {
        CleanParamsBuilder::default()
    }

    /// Params that only mask bands, never redact
    pub fn masking_only(header_height: f32, footer_height: f32) -> Self {
        Self::builder()
            .header_height(header_height)
            .footer_height(footer_height)
            .build()
    }

    /// Copy with empty keywords removed and heights made non-negative
    pub fn normalized(&self) -> Self {
        Self {
            keywords: self
                .keywords
                .iter()
                .filter(|k| !k.is_empty())
                .cloned()
                .collect(),
            header_height: non_negative(self.header_height),
            footer_height: non_negative(self.footer_height),
            match_case: self.match_case,
        }
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Builder for CleanParams
#[derive(Debug, Default)]
pub struct CleanParamsBuilder {
    params: CleanParams,
}

impl CleanParamsBuilder {
    /// Replace the keyword list (empty strings are skipped)
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.is_empty())
            .collect();
        self
    }

    /// Append one keyword
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !keyword.is_empty() {
            self.params.keywords.push(keyword);
        }
        self
    }

    /// Set header band height (negative values become 0)
    #[must_use]
    pub fn header_height(mut self, height: f32) -> Self {
        self.params.header_height = non_negative(height);
        self
    }

    /// Set footer band height (negative values become 0)
    #[must_use]
    pub fn footer_height(mut self, height: f32) -> Self {
        self.params.footer_height = non_negative(height);
        self
    }

    /// Set case-sensitive matching
    #[must_use]
    pub fn match_case(mut self, match_case: bool) -> Self {
        self.params.match_case = match_case;
        self
    }

    /// Build the params
    #[must_use]
    pub fn build(self) -> CleanParams {
        self.params
    }
}

// ============================================================
// Results
// ============================================================

/// What cleaning did to one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    /// Page index (0-indexed)
    pub page_index: usize,
    /// Keyword occurrences accepted for redaction
    pub redactions: usize,
    /// Glyphs removed from the content stream
    pub glyphs_removed: usize,
    /// Header/footer rectangles drawn
    pub masks_drawn: usize,
    /// Sampled background color
    pub background: Color,
}
