//! pdf-watermark-remover - Remove repeated watermark text from PDF documents
//!
//! Finds text blocks that repeat across the first pages of a document and
//! produces a cleaned copy with those strings redacted from the page content
//! and the header/footer margins painted over in the page's own background
//! color.
//!
//! # Features
//!
//! - **Candidate detection** ([`detector`]) - Repeated text blocks over a bounded page prefix
//! - **Page cleaning** ([`cleaner`]) - True content redaction plus background-colored band masks
//! - **Pipeline** ([`pipeline`]) - Whole-document processing and 150 dpi PNG preview
//! - **Document model** ([`document`]) - lopdf-based pages with text search, drawing and rendering
//! - **Web service** (feature `web`) - `/analyze`, `/preview`, `/process` and usage analytics
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_watermark_remover::{clean_document, detect_candidates, CleanParams};
//!
//! let bytes = std::fs::read("report.pdf").unwrap();
//! let keywords = detect_candidates(&bytes);
//! let params = CleanParams::builder().keywords(keywords).build();
//! let cleaned = clean_document(&bytes, &params).unwrap();
//! std::fs::write("Clean_report.pdf", cleaned).unwrap();
//! ```

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod detector;
pub mod document;
pub mod pipeline;
pub mod progress;

#[cfg(feature = "web")]
pub mod web;

// Re-export public API
pub use cleaner::{parse_keyword_list, CleanError, CleanParams, CleanParamsBuilder, PageCleaner, PageReport};
pub use cli::{exit_codes, Cli, Commands};
pub use config::{CliOverrides, Config, ConfigError};
pub use detector::{CandidateDetector, CandidateReport, CandidateSet, DetectorOptions};
pub use document::{Color, DocumentError, Page, PdfDocument, Rect};
pub use pipeline::{
    CleanOutput, DocumentPipeline, NoopProgress, PageOutcome, PipelineError, Preview,
    ProgressCallback, PREVIEW_DPI,
};
pub use progress::{CliProgress, OutputMode};

#[cfg(feature = "web")]
pub use web::{ServerConfig, WebServer};

// ============================================================
// Entry Points
// ============================================================

/// Watermark candidates for a document; empty on any failure
pub fn detect_candidates(document_bytes: &[u8]) -> Vec<String> {
    CandidateDetector::default().detect(document_bytes)
}

/// Cleaned copy of a document.
///
/// Fails only when the input cannot be parsed or the output cannot be
/// written; pages that fail to clean are left as they are.
pub fn clean_document(document_bytes: &[u8], params: &CleanParams) -> Result<Vec<u8>, PipelineError> {
    let output = DocumentPipeline::new(params.clone()).process(document_bytes)?;
    Ok(output.bytes)
}

/// PNG of the cleaned first page, or `None` for empty or unreadable documents
pub fn render_preview(document_bytes: &[u8], params: &CleanParams) -> Option<Vec<u8>> {
    match DocumentPipeline::new(params.clone()).preview(document_bytes) {
        Ok(preview) => preview.into_png(),
        Err(e) => {
            tracing::warn!(error = %e, "Preview failed");
            None
        }
    }
}
