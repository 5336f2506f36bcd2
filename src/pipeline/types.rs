//! Pipeline result and error types

use thiserror::Error;

use crate::cleaner::PageReport;
use crate::document::DocumentError;

/// Resolution of preview images
pub const PREVIEW_DPI: f32 = 150.0;

// ============================================================
// Error Types
// ============================================================

/// Whole-document failures; per-page problems are reported in [`PageOutcome`]
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),

    #[error("Failed to render preview: {0}")]
    Render(String),
}

impl From<DocumentError> for PipelineError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Parse(msg) => PipelineError::Parse(msg),
            DocumentError::Serialize(msg) => PipelineError::Serialize(msg),
            other => PipelineError::Render(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Results
// ============================================================

/// Result of cleaning one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Cleaned(PageReport),
    /// The page was left in whatever state it reached
    Failed { page: usize, reason: String },
}

impl PageOutcome {
    pub fn page_index(&self) -> usize {
        match self {
            PageOutcome::Cleaned(report) => report.page_index,
            PageOutcome::Failed { page, .. } => *page,
        }
    }

    pub fn is_cleaned(&self) -> bool {
        matches!(self, PageOutcome::Cleaned(_))
    }
}

/// Rewritten document plus per-page outcomes, in page order
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub bytes: Vec<u8>,
    pub pages: Vec<PageOutcome>,
}

impl CleanOutput {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| !p.is_cleaned())
            .map(PageOutcome::page_index)
            .collect()
    }

    /// Total keyword matches removed across all pages
    pub fn redactions(&self) -> usize {
        self.pages
            .iter()
            .map(|p| match p {
                PageOutcome::Cleaned(report) => report.redactions,
                PageOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Outcome of a preview request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// PNG bytes of the cleaned first page
    Image(Vec<u8>),
    /// The document has no pages
    Unavailable,
}

impl Preview {
    pub fn into_png(self) -> Option<Vec<u8>> {
        match self {
            Preview::Image(png) => Some(png),
            Preview::Unavailable => None,
        }
    }
}

// ============================================================
// Progress
// ============================================================

/// Progress notifications for long-running document processing
pub trait ProgressCallback {
    /// Called when a processing step starts
    fn on_step_start(&self, _step: &str) {}

    /// Called after each unit of work within a step
    fn on_step_progress(&self, _current: usize, _total: usize) {}

    /// Called when a step finishes
    fn on_step_complete(&self, _step: &str, _message: &str) {}

    /// Diagnostic detail
    fn on_debug(&self, _message: &str) {}
}

/// Progress callback that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {}
